use raceday_storage::Database;

/// Whether the database answers a trivial query.
pub async fn database_reachable(db: &Database) -> bool {
    match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(db.pool())
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health check could not reach the database");
            false
        }
    }
}
