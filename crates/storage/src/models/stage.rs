use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Stage {
    pub stage_id: i32,
    pub stage_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub distance_km: Option<Decimal>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// Row of the stage/category link table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct StageCategory {
    pub stage_id: i32,
    pub category_id: i32,
}
