use raceday_storage::{
    Database,
    dto::stage::{CreateStageRequest, StageResponse, UpdateStageRequest},
    error::Result,
    models::NormalizedName,
    repository::stage::{StageFields, StageRepository},
    services::timing::TimingService,
};

pub async fn list_stages(db: &Database, active_only: bool) -> Result<Vec<StageResponse>> {
    let repo = StageRepository::new(db.pool());
    let stages = repo.list(active_only).await?;
    let mut links = repo.category_links().await?;

    Ok(stages
        .into_iter()
        .map(|stage| {
            let category_ids = links.remove(&stage.stage_id).unwrap_or_default();
            StageResponse::new(stage, category_ids)
        })
        .collect())
}

pub async fn get_stage(db: &Database, id: i32) -> Result<StageResponse> {
    let repo = StageRepository::new(db.pool());
    let stage = repo.find_by_id(id).await?;
    let category_ids = repo.category_ids(id).await?;

    Ok(StageResponse::new(stage, category_ids))
}

pub async fn create_stage(db: &Database, request: &CreateStageRequest) -> Result<StageResponse> {
    let fields = StageFields {
        stage_number: request.stage_number,
        name: NormalizedName::new(&request.name),
        description: request.description.clone(),
        distance_km: request.distance_km,
        is_active: request.is_active,
    };

    let repo = StageRepository::new(db.pool());
    let stage = repo.create(&fields, &request.category_ids).await?;
    tracing::info!(stage_id = stage.stage_id, stage_number = stage.stage_number, "Stage created");

    let category_ids = repo.category_ids(stage.stage_id).await?;
    Ok(StageResponse::new(stage, category_ids))
}

/// Relinking categories can change who belongs to the stage, so the stage
/// is re-ranked after the update.
pub async fn update_stage(
    db: &Database,
    timing: &TimingService,
    id: i32,
    request: &UpdateStageRequest,
) -> Result<StageResponse> {
    let repo = StageRepository::new(db.pool());
    let current = repo.find_by_id(id).await?;

    let fields = StageFields {
        stage_number: request.stage_number.unwrap_or(current.stage_number),
        name: NormalizedName::new(request.name.as_deref().unwrap_or(&current.name)),
        description: request.description.clone().or(current.description),
        distance_km: request.distance_km.or(current.distance_km),
        is_active: request.is_active.unwrap_or(current.is_active),
    };

    let stage = repo
        .update(id, &fields, request.category_ids.as_deref())
        .await?;

    if request.category_ids.is_some() {
        timing.recalculate_all(&[id]).await;
    }

    let category_ids = repo.category_ids(id).await?;
    Ok(StageResponse::new(stage, category_ids))
}

pub async fn delete_stage(db: &Database, timing: &TimingService, id: i32) -> Result<()> {
    StageRepository::new(db.pool()).delete(id).await?;
    timing.forget_stage(id);
    tracing::info!(stage_id = id, "Stage deleted");

    Ok(())
}
