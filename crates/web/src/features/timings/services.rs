use raceday_storage::{
    Database,
    dto::{
        common::PaginatedResponse,
        timing::{
            CreateTimingRequest, StageRecalculationResponse,
            TimingDeletedResponse, TimingFilter, TimingMutationResponse, TimingResponse,
            UpdateTimingRequest,
        },
    },
    error::{Result, StorageError},
    repository::{stage::StageRepository, timing::TimingRepository},
    services::timing::TimingService,
};

pub async fn list_timings(
    db: &Database,
    filter: &TimingFilter,
) -> Result<PaginatedResponse<TimingResponse>> {
    let pagination = filter.pagination();
    pagination.validate().map_err(StorageError::InvalidInput)?;

    let (records, total_items) = TimingRepository::new(db.pool()).list(filter).await?;
    let data = records.into_iter().map(TimingResponse::from).collect();

    Ok(PaginatedResponse::new(data, pagination, total_items))
}

pub async fn get_timing(db: &Database, id: i64) -> Result<TimingResponse> {
    let record = TimingRepository::new(db.pool()).find_by_id(id).await?;
    Ok(TimingResponse::from(record))
}

pub async fn create_timing(
    timing: &TimingService,
    request: CreateTimingRequest,
) -> Result<TimingMutationResponse> {
    let (record, recalculation) = timing.record(request.into_input()?).await?;

    Ok(TimingMutationResponse {
        timing: TimingResponse::from(record),
        recalculation,
    })
}

pub async fn update_timing(
    timing: &TimingService,
    id: i64,
    request: UpdateTimingRequest,
) -> Result<TimingMutationResponse> {
    let (record, recalculation) = timing.correct(id, request).await?;

    Ok(TimingMutationResponse {
        timing: TimingResponse::from(record),
        recalculation,
    })
}

pub async fn delete_timing(timing: &TimingService, id: i64) -> Result<TimingDeletedResponse> {
    let (record, recalculation) = timing.remove(id).await?;

    Ok(TimingDeletedResponse {
        timing_id: record.timing_id,
        stage_id: record.stage_id,
        recalculation,
    })
}

/// Force a ranking pass, reapplying bonuses across the stage.
pub async fn reapply_bonuses(
    db: &Database,
    timing: &TimingService,
    stage_id: i32,
) -> Result<StageRecalculationResponse> {
    if !StageRepository::new(db.pool()).exists(stage_id).await? {
        return Err(StorageError::NotFound);
    }

    let recalculation = timing.recalculate_reported(stage_id).await;
    tracing::info!(stage_id, ?recalculation, "Bonuses reapplied");

    Ok(StageRecalculationResponse {
        stage_id,
        recalculation,
    })
}

/// Re-rank every stage, e.g. after the start schedule changed.
pub async fn rerank_all_stages(db: &Database, timing: &TimingService) {
    match StageRepository::new(db.pool()).list(false).await {
        Ok(stages) => {
            let ids: Vec<i32> = stages.iter().map(|s| s.stage_id).collect();
            timing.recalculate_all(&ids).await;
        }
        Err(e) => tracing::warn!(error = %e, "Could not list stages for re-ranking"),
    }
}
