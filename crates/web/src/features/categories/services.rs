use raceday_storage::{
    Database,
    dto::category::{BaseStartResponse, CreateCategoryRequest, UpdateCategoryRequest},
    error::Result,
    models::{Category, NormalizedName},
    repository::category::CategoryRepository,
    services::timing::TimingService,
    timing::parse_time_of_day,
};

use crate::features::timings::services::rerank_all_stages;

pub async fn list_categories(db: &Database) -> Result<Vec<Category>> {
    CategoryRepository::new(db.pool()).list().await
}

pub async fn get_category(db: &Database, id: i32) -> Result<Category> {
    CategoryRepository::new(db.pool()).find_by_id(id).await
}

pub async fn base_start(db: &Database) -> Result<BaseStartResponse> {
    let repo = CategoryRepository::new(db.pool());

    Ok(BaseStartResponse {
        base_start: repo.base_start_time().await?,
        category_count: repo.count().await?,
    })
}

/// A new category can move the base start, which shifts every offset.
pub async fn create_category(
    db: &Database,
    timing: &TimingService,
    request: &CreateCategoryRequest,
) -> Result<Category> {
    let name = NormalizedName::new(&request.name);
    let start_time = parse_time_of_day(&request.start_time)?;

    let category = CategoryRepository::new(db.pool())
        .create(&name, start_time)
        .await?;
    tracing::info!(category_id = category.category_id, name = %category.name, "Category created");

    rerank_all_stages(db, timing).await;
    Ok(category)
}

pub async fn update_category(
    db: &Database,
    timing: &TimingService,
    id: i32,
    request: &UpdateCategoryRequest,
) -> Result<Category> {
    let repo = CategoryRepository::new(db.pool());
    let current = repo.find_by_id(id).await?;

    let name = NormalizedName::new(request.name.as_deref().unwrap_or(&current.name));
    let start_time = match &request.start_time {
        Some(text) => parse_time_of_day(text)?,
        None => current.start_time,
    };

    let category = repo.update(id, &name, start_time).await?;

    if category.start_time != current.start_time {
        rerank_all_stages(db, timing).await;
    }

    Ok(category)
}

pub async fn delete_category(db: &Database, timing: &TimingService, id: i32) -> Result<()> {
    CategoryRepository::new(db.pool()).delete(id).await?;
    tracing::info!(category_id = id, "Category deleted");

    rerank_all_stages(db, timing).await;
    Ok(())
}
