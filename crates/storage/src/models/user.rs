use chrono::NaiveDateTime;
use sqlx::FromRow;
use uuid::Uuid;

/// Operator account allowed to manage the event.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}
