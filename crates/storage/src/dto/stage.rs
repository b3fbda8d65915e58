use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Stage;

/// Request payload for creating a stage
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateStageRequest {
    #[validate(range(min = 1, message = "Stage number must be greater than zero"))]
    pub stage_number: i32,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_distance"))]
    pub distance_km: Option<Decimal>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Categories racing this stage. At least one is required.
    #[validate(length(min = 1, message = "A stage needs at least one category"))]
    pub category_ids: Vec<i32>,
}

/// Request payload for updating a stage
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateStageRequest {
    #[validate(range(min = 1))]
    pub stage_number: Option<i32>,

    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[validate(custom(function = "validate_distance"))]
    pub distance_km: Option<Decimal>,

    pub is_active: Option<bool>,

    /// Replaces the whole category set when present.
    #[validate(length(min = 1, message = "A stage needs at least one category"))]
    pub category_ids: Option<Vec<i32>>,
}

fn default_active() -> bool {
    true
}

fn validate_distance(distance: &Decimal) -> Result<(), validator::ValidationError> {
    if distance.is_sign_negative() || distance.is_zero() {
        return Err(validator::ValidationError::new("invalid_distance"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StageResponse {
    pub stage_id: i32,
    pub stage_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub distance_km: Option<Decimal>,
    pub is_active: bool,
    pub category_ids: Vec<i32>,
    pub created_at: NaiveDateTime,
}

impl StageResponse {
    pub fn new(stage: Stage, category_ids: Vec<i32>) -> Self {
        Self {
            stage_id: stage.stage_id,
            stage_number: stage.stage_number,
            name: stage.name,
            description: stage.description,
            distance_km: stage.distance_km,
            is_active: stage.is_active,
            category_ids,
            created_at: stage.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn request() -> CreateStageRequest {
        CreateStageRequest {
            stage_number: 1,
            name: "Prologue".to_string(),
            description: None,
            distance_km: Some(Decimal::from_str("12.5").unwrap()),
            is_active: true,
            category_ids: vec![1, 2],
        }
    }

    #[test]
    fn test_valid_stage_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_stage_needs_a_category() {
        let mut req = request();
        req.category_ids.clear();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("category_ids"));
    }

    #[test]
    fn test_stage_number_must_be_positive() {
        let mut req = request();
        req.stage_number = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_distance_must_be_positive() {
        let mut req = request();
        req.distance_km = Some(Decimal::from_str("-1").unwrap());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_active_by_default() {
        let req: CreateStageRequest =
            serde_json::from_str(r#"{"stage_number":2,"name":"Climb","category_ids":[3]}"#).unwrap();
        assert!(req.is_active);
    }
}
