use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Category;
use crate::timing::parse_time_of_day;

/// Request payload for creating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,

    /// Scheduled start, `HH:MM` or `HH:MM:SS`.
    #[validate(custom(function = "validate_time_of_day"))]
    #[schema(example = "08:00")]
    pub start_time: String,
}

/// Request payload for updating a category
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_time_of_day"))]
    pub start_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub category_id: i32,
    pub name: String,
    #[schema(value_type = String, example = "08:10:00")]
    pub start_time: NaiveTime,
    pub created_at: NaiveDateTime,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            category_id: category.category_id,
            name: category.name,
            start_time: category.start_time,
            created_at: category.created_at,
        }
    }
}

/// Earliest scheduled start among all categories; every stagger offset is
/// measured from it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BaseStartResponse {
    #[schema(value_type = Option<String>)]
    pub base_start: Option<NaiveTime>,
    pub category_count: i64,
}

pub(crate) fn validate_time_of_day(value: &str) -> Result<(), validator::ValidationError> {
    parse_time_of_day(value)
        .map(|_| ())
        .map_err(|_| validator::ValidationError::new("invalid_time_of_day"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_category_request() {
        let request = CreateCategoryRequest {
            name: "Elite".to_string(),
            start_time: "08:10".to_string(),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_rejects_malformed_start_time() {
        let request = CreateCategoryRequest {
            name: "Elite".to_string(),
            start_time: "8h10".to_string(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("start_time"));
    }

    #[test]
    fn test_rejects_empty_name() {
        let request = CreateCategoryRequest {
            name: String::new(),
            start_time: "08:00".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
