//! Timing writes and the stage ranking pass that follows each of them.
//!
//! Every pass of a stage runs under that stage's lock, is bounded by a
//! timeout and persists its results in a single transaction, so two passes
//! never interleave and an abandoned pass leaves nothing half-written.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveTime;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::Database;
use crate::dto::timing::{RecalculationStatus, TimingInput, UpdateTimingRequest};
use crate::error::{Result, StorageError};
use crate::models::TimingRecord;
use crate::repository::category::CategoryRepository;
use crate::repository::stage::StageRepository;
use crate::repository::timing::{ParticipantSlot, TimingRepository};
use crate::timing::start_offset::offset_or_unadjusted;
use crate::timing::{StageEntry, StageResult, rank_stage};

pub const DEFAULT_RECALC_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Store operations the timing service depends on.
#[async_trait]
pub trait TimingStore: Send + Sync {
    async fn stage_exists(&self, stage_id: i32) -> Result<bool>;

    async fn participant_slot(
        &self,
        participant_id: Uuid,
        stage_id: i32,
    ) -> Result<Option<ParticipantSlot>>;

    async fn base_start_time(&self) -> Result<Option<NaiveTime>>;

    async fn find_timing(&self, id: i64) -> Result<TimingRecord>;

    async fn find_by_pair(&self, participant_id: Uuid, stage_id: i32)
    -> Result<Option<TimingRecord>>;

    async fn insert_timing(&self, input: &TimingInput, start_offset_ms: i64) -> Result<TimingRecord>;

    async fn update_timing(
        &self,
        id: i64,
        input: &TimingInput,
        start_offset_ms: i64,
    ) -> Result<TimingRecord>;

    async fn recreate_timing(
        &self,
        id: i64,
        input: &TimingInput,
        start_offset_ms: i64,
    ) -> Result<TimingRecord>;

    async fn delete_timing(&self, id: i64) -> Result<TimingRecord>;

    /// `None` when the stage does not exist (any more).
    async fn stage_entries(&self, stage_id: i32) -> Result<Option<Vec<StageEntry>>>;

    /// `false` when the stage disappeared before the results were written.
    async fn apply_stage_results(&self, stage_id: i32, results: &[StageResult]) -> Result<bool>;
}

/// Postgres-backed [`TimingStore`].
#[derive(Clone)]
pub struct PgTimingStore {
    db: Database,
}

impl PgTimingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TimingStore for PgTimingStore {
    async fn stage_exists(&self, stage_id: i32) -> Result<bool> {
        StageRepository::new(self.db.pool()).exists(stage_id).await
    }

    async fn participant_slot(
        &self,
        participant_id: Uuid,
        stage_id: i32,
    ) -> Result<Option<ParticipantSlot>> {
        TimingRepository::new(self.db.pool())
            .participant_slot(participant_id, stage_id)
            .await
    }

    async fn base_start_time(&self) -> Result<Option<NaiveTime>> {
        CategoryRepository::new(self.db.pool()).base_start_time().await
    }

    async fn find_timing(&self, id: i64) -> Result<TimingRecord> {
        TimingRepository::new(self.db.pool()).find_by_id(id).await
    }

    async fn find_by_pair(
        &self,
        participant_id: Uuid,
        stage_id: i32,
    ) -> Result<Option<TimingRecord>> {
        TimingRepository::new(self.db.pool())
            .find_by_pair(participant_id, stage_id)
            .await
    }

    async fn insert_timing(&self, input: &TimingInput, start_offset_ms: i64) -> Result<TimingRecord> {
        TimingRepository::new(self.db.pool())
            .insert(input, start_offset_ms)
            .await
    }

    async fn update_timing(
        &self,
        id: i64,
        input: &TimingInput,
        start_offset_ms: i64,
    ) -> Result<TimingRecord> {
        TimingRepository::new(self.db.pool())
            .update(id, input, start_offset_ms)
            .await
    }

    async fn recreate_timing(
        &self,
        id: i64,
        input: &TimingInput,
        start_offset_ms: i64,
    ) -> Result<TimingRecord> {
        TimingRepository::new(self.db.pool())
            .recreate(id, input, start_offset_ms)
            .await
    }

    async fn delete_timing(&self, id: i64) -> Result<TimingRecord> {
        TimingRepository::new(self.db.pool()).delete(id).await
    }

    async fn stage_entries(&self, stage_id: i32) -> Result<Option<Vec<StageEntry>>> {
        TimingRepository::new(self.db.pool())
            .stage_entries(stage_id)
            .await
    }

    async fn apply_stage_results(&self, stage_id: i32, results: &[StageResult]) -> Result<bool> {
        TimingRepository::new(self.db.pool())
            .apply_stage_results(stage_id, results)
            .await
    }
}

/// One async mutex per stage id.
#[derive(Default)]
pub struct StageLocks {
    locks: Mutex<HashMap<i32, Arc<AsyncMutex<()>>>>,
}

impl StageLocks {
    pub fn for_stage(&self, stage_id: i32) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(stage_id).or_default().clone()
    }

    pub fn forget(&self, stage_id: i32) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.remove(&stage_id);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcOutcome {
    Ranked(usize),
    Empty,
    StageRemoved,
    TimedOut,
}

#[derive(Clone)]
pub struct TimingService {
    store: Arc<dyn TimingStore>,
    locks: Arc<StageLocks>,
    recalc_timeout: Duration,
}

impl TimingService {
    pub fn new(store: Arc<dyn TimingStore>, recalc_timeout: Duration) -> Self {
        Self {
            store,
            locks: Arc::new(StageLocks::default()),
            recalc_timeout,
        }
    }

    pub fn postgres(db: Database, recalc_timeout: Duration) -> Self {
        Self::new(Arc::new(PgTimingStore::new(db)), recalc_timeout)
    }

    /// Record a new stage time and re-rank its stage.
    pub async fn record(&self, input: TimingInput) -> Result<(TimingRecord, RecalculationStatus)> {
        let start_offset_ms = self.check_references(&input).await?;

        if self
            .store
            .find_by_pair(input.participant_id, input.stage_id)
            .await?
            .is_some()
        {
            return Err(StorageError::ConstraintViolation(
                "Participant already has a time recorded for this stage".to_string(),
            ));
        }

        let record = self.store.insert_timing(&input, start_offset_ms).await?;
        tracing::info!(
            timing_id = record.timing_id,
            stage_id = record.stage_id,
            raw_ms = record.raw_ms,
            "Timing recorded"
        );

        let status = self.recalculate_reported(record.stage_id).await;
        Ok((self.refreshed(record).await, status))
    }

    /// Correct an existing record. A transient store failure on the update is
    /// retried once by recreating the record under the same id.
    pub async fn correct(
        &self,
        id: i64,
        request: UpdateTimingRequest,
    ) -> Result<(TimingRecord, RecalculationStatus)> {
        let current = self.store.find_timing(id).await?;
        let input = request.merge_into(&current)?;
        let start_offset_ms = self.check_references(&input).await?;

        if let Some(other) = self
            .store
            .find_by_pair(input.participant_id, input.stage_id)
            .await?
            && other.timing_id != id
        {
            return Err(StorageError::ConstraintViolation(
                "Participant already has a time recorded for this stage".to_string(),
            ));
        }

        let record = match self.store.update_timing(id, &input, start_offset_ms).await {
            Ok(record) => record,
            Err(e) if e.is_transient() => {
                tracing::warn!(timing_id = id, error = %e, "Update failed, recreating record");
                self.store
                    .recreate_timing(id, &input, start_offset_ms)
                    .await?
            }
            Err(e) => return Err(e),
        };

        let mut status = self.recalculate_reported(record.stage_id).await;
        if current.stage_id != record.stage_id {
            // the stage the record moved out of has a gap to close
            let left = self.recalculate_reported(current.stage_id).await;
            if left.is_failed() {
                status = left;
            }
        }

        Ok((self.refreshed(record).await, status))
    }

    pub async fn remove(&self, id: i64) -> Result<(TimingRecord, RecalculationStatus)> {
        let record = self.store.delete_timing(id).await?;
        tracing::info!(timing_id = id, stage_id = record.stage_id, "Timing deleted");

        let status = self.recalculate_reported(record.stage_id).await;
        Ok((record, status))
    }

    /// Re-derive offsets, bonuses, final times and positions of a stage.
    pub async fn recalculate(&self, stage_id: i32) -> Result<RecalcOutcome> {
        let lock = self.locks.for_stage(stage_id);
        let _guard = lock.lock().await;

        match tokio::time::timeout(self.recalc_timeout, self.rank_locked(stage_id)).await {
            Ok(outcome) => outcome,
            Err(_) => Ok(RecalcOutcome::TimedOut),
        }
    }

    /// [`recalculate`](Self::recalculate) for callers that must not fail
    /// because of it.
    pub async fn recalculate_reported(&self, stage_id: i32) -> RecalculationStatus {
        match self.recalculate(stage_id).await {
            Ok(RecalcOutcome::Ranked(ranked)) => {
                tracing::debug!(stage_id, ranked, "Stage ranked");
                RecalculationStatus::Completed { ranked }
            }
            Ok(RecalcOutcome::Empty) => RecalculationStatus::Skipped {
                reason: "stage has no recorded times".to_string(),
            },
            Ok(RecalcOutcome::StageRemoved) => {
                tracing::info!(stage_id, "Stage removed during recalculation");
                RecalculationStatus::Skipped {
                    reason: "stage no longer exists".to_string(),
                }
            }
            Ok(RecalcOutcome::TimedOut) => {
                let warning = format!(
                    "recalculation of stage {stage_id} abandoned after {}ms",
                    self.recalc_timeout.as_millis()
                );
                tracing::warn!(stage_id, "{warning}");
                RecalculationStatus::Failed { warning }
            }
            Err(e) => {
                tracing::warn!(stage_id, error = %e, "Recalculation failed");
                RecalculationStatus::Failed {
                    warning: format!("recalculation of stage {stage_id} failed: {e}"),
                }
            }
        }
    }

    /// Re-rank stages one after another. A failed pass is logged and the
    /// remaining stages are still ranked.
    pub async fn recalculate_all(&self, stage_ids: &[i32]) {
        let mut failed = Vec::new();
        for &stage_id in stage_ids {
            if self.recalculate_reported(stage_id).await.is_failed() {
                failed.push(stage_id);
            }
        }

        if failed.is_empty() {
            tracing::debug!(stages = stage_ids.len(), "Stages re-ranked");
        } else {
            tracing::warn!(
                stages = stage_ids.len(),
                ?failed,
                "Some stages could not be re-ranked; they are ranked again on their next write"
            );
        }
    }

    /// Drop the lock of a deleted stage.
    pub fn forget_stage(&self, stage_id: i32) {
        self.locks.forget(stage_id);
    }

    async fn rank_locked(&self, stage_id: i32) -> Result<RecalcOutcome> {
        let Some(entries) = self.store.stage_entries(stage_id).await? else {
            return Ok(RecalcOutcome::StageRemoved);
        };

        if entries.is_empty() {
            return Ok(RecalcOutcome::Empty);
        }

        let base_start = self.store.base_start_time().await?;
        let results = rank_stage(&entries, base_start)?;

        if !self.store.apply_stage_results(stage_id, &results).await? {
            return Ok(RecalcOutcome::StageRemoved);
        }

        Ok(RecalcOutcome::Ranked(results.len()))
    }

    /// Validate the stage and participant of a write and return the start
    /// offset of the participant's category.
    async fn check_references(&self, input: &TimingInput) -> Result<i64> {
        if !self.store.stage_exists(input.stage_id).await? {
            return Err(StorageError::InvalidInput(format!(
                "Stage {} does not exist",
                input.stage_id
            )));
        }

        let slot = self
            .store
            .participant_slot(input.participant_id, input.stage_id)
            .await?
            .ok_or_else(|| {
                StorageError::InvalidInput(format!(
                    "Participant {} does not exist",
                    input.participant_id
                ))
            })?;

        if !slot.races_stage {
            return Err(StorageError::InvalidInput(format!(
                "Category {} does not race stage {}",
                slot.category_id, input.stage_id
            )));
        }

        let base_start = self.store.base_start_time().await?;
        Ok(offset_or_unadjusted(slot.category_start, base_start)?)
    }

    async fn refreshed(&self, record: TimingRecord) -> TimingRecord {
        self.store
            .find_timing(record.timing_id)
            .await
            .unwrap_or(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{NaiveDate, NaiveDateTime};

    use crate::timing::DurationInput;

    #[derive(Default)]
    struct MemoryState {
        stages: HashSet<i32>,
        categories: HashMap<i32, NaiveTime>,
        links: HashSet<(i32, i32)>,
        participants: HashMap<Uuid, i32>,
        records: BTreeMap<i64, TimingRecord>,
        next_id: i64,
    }

    #[derive(Default)]
    struct MemoryStore {
        state: Mutex<MemoryState>,
        entries_delay: Option<Duration>,
        transient_update_failures: AtomicUsize,
        recreated: AtomicUsize,
        active_passes: AtomicUsize,
        max_active_passes: AtomicUsize,
        unreadable_stages: Mutex<HashSet<i32>>,
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    impl MemoryStore {
        fn with_delay(delay: Duration) -> Self {
            Self {
                entries_delay: Some(delay),
                ..Self::default()
            }
        }

        fn add_category(&self, category_id: i32, start: NaiveTime) {
            self.state.lock().unwrap().categories.insert(category_id, start);
        }

        fn add_stage(&self, stage_id: i32, category_ids: &[i32]) {
            let mut state = self.state.lock().unwrap();
            state.stages.insert(stage_id);
            for category_id in category_ids {
                state.links.insert((stage_id, *category_id));
            }
        }

        fn remove_stage(&self, stage_id: i32) {
            let mut state = self.state.lock().unwrap();
            state.stages.remove(&stage_id);
            state.records.retain(|_, r| r.stage_id != stage_id);
        }

        fn add_participant(&self, category_id: i32) -> Uuid {
            let id = Uuid::new_v4();
            self.state.lock().unwrap().participants.insert(id, category_id);
            id
        }

        fn record(&self, id: i64) -> TimingRecord {
            self.state.lock().unwrap().records[&id].clone()
        }

        fn stage_records(&self, stage_id: i32) -> Vec<TimingRecord> {
            self.state
                .lock()
                .unwrap()
                .records
                .values()
                .filter(|r| r.stage_id == stage_id)
                .cloned()
                .collect()
        }

        fn write(state: &mut MemoryState, id: i64, input: &TimingInput, offset: i64) -> TimingRecord {
            let duplicate = state
                .records
                .values()
                .any(|r| r.timing_id != id && r.participant_id == input.participant_id && r.stage_id == input.stage_id);
            assert!(!duplicate, "unique index would reject this write");

            let record = TimingRecord {
                timing_id: id,
                participant_id: input.participant_id,
                stage_id: input.stage_id,
                raw_ms: input.raw_ms,
                penalty_ms: input.penalty_ms,
                start_offset_ms: offset,
                bonus_ms: 0,
                final_ms: input.raw_ms + offset + input.penalty_ms,
                position: None,
                note: input.note.clone(),
                created_at: stamp(),
                updated_at: stamp(),
            };
            state.records.insert(id, record.clone());
            record
        }
    }

    #[async_trait]
    impl TimingStore for MemoryStore {
        async fn stage_exists(&self, stage_id: i32) -> Result<bool> {
            Ok(self.state.lock().unwrap().stages.contains(&stage_id))
        }

        async fn participant_slot(
            &self,
            participant_id: Uuid,
            stage_id: i32,
        ) -> Result<Option<ParticipantSlot>> {
            let state = self.state.lock().unwrap();
            Ok(state.participants.get(&participant_id).map(|category_id| ParticipantSlot {
                category_id: *category_id,
                category_start: state.categories[category_id],
                races_stage: state.links.contains(&(stage_id, *category_id)),
            }))
        }

        async fn base_start_time(&self) -> Result<Option<NaiveTime>> {
            Ok(self.state.lock().unwrap().categories.values().min().copied())
        }

        async fn find_timing(&self, id: i64) -> Result<TimingRecord> {
            self.state
                .lock()
                .unwrap()
                .records
                .get(&id)
                .cloned()
                .ok_or(StorageError::NotFound)
        }

        async fn find_by_pair(
            &self,
            participant_id: Uuid,
            stage_id: i32,
        ) -> Result<Option<TimingRecord>> {
            Ok(self
                .state
                .lock()
                .unwrap()
                .records
                .values()
                .find(|r| r.participant_id == participant_id && r.stage_id == stage_id)
                .cloned())
        }

        async fn insert_timing(&self, input: &TimingInput, start_offset_ms: i64) -> Result<TimingRecord> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = state.next_id;
            Ok(Self::write(&mut state, id, input, start_offset_ms))
        }

        async fn update_timing(
            &self,
            id: i64,
            input: &TimingInput,
            start_offset_ms: i64,
        ) -> Result<TimingRecord> {
            let pending = self.transient_update_failures.load(Ordering::SeqCst);
            if pending > 0 {
                self.transient_update_failures.store(pending - 1, Ordering::SeqCst);
                return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
            }

            let mut state = self.state.lock().unwrap();
            if !state.records.contains_key(&id) {
                return Err(StorageError::NotFound);
            }
            Ok(Self::write(&mut state, id, input, start_offset_ms))
        }

        async fn recreate_timing(
            &self,
            id: i64,
            input: &TimingInput,
            start_offset_ms: i64,
        ) -> Result<TimingRecord> {
            self.recreated.fetch_add(1, Ordering::SeqCst);
            let mut state = self.state.lock().unwrap();
            state.records.remove(&id).ok_or(StorageError::NotFound)?;
            Ok(Self::write(&mut state, id, input, start_offset_ms))
        }

        async fn delete_timing(&self, id: i64) -> Result<TimingRecord> {
            self.state
                .lock()
                .unwrap()
                .records
                .remove(&id)
                .ok_or(StorageError::NotFound)
        }

        async fn stage_entries(&self, stage_id: i32) -> Result<Option<Vec<StageEntry>>> {
            let active = self.active_passes.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active_passes.fetch_max(active, Ordering::SeqCst);

            tokio::time::sleep(self.entries_delay.unwrap_or(Duration::from_millis(2))).await;
            self.active_passes.fetch_sub(1, Ordering::SeqCst);

            if self.unreadable_stages.lock().unwrap().contains(&stage_id) {
                return Err(StorageError::Database(sqlx::Error::PoolTimedOut));
            }

            let state = self.state.lock().unwrap();
            if !state.stages.contains(&stage_id) {
                return Ok(None);
            }

            Ok(Some(
                state
                    .records
                    .values()
                    .filter(|r| r.stage_id == stage_id)
                    .map(|r| StageEntry {
                        timing_id: r.timing_id,
                        raw_ms: r.raw_ms,
                        penalty_ms: r.penalty_ms,
                        category_start: state.categories[&state.participants[&r.participant_id]],
                    })
                    .collect(),
            ))
        }

        async fn apply_stage_results(&self, stage_id: i32, results: &[StageResult]) -> Result<bool> {
            let mut state = self.state.lock().unwrap();
            if !state.stages.contains(&stage_id) {
                return Ok(false);
            }

            for result in results {
                if let Some(record) = state.records.get_mut(&result.timing_id) {
                    record.start_offset_ms = result.start_offset_ms;
                    record.bonus_ms = result.bonus_ms;
                    record.final_ms = result.final_ms;
                    record.position = Some(result.position);
                }
            }
            Ok(true)
        }
    }

    fn input(participant_id: Uuid, stage_id: i32, raw_ms: i64) -> TimingInput {
        TimingInput {
            participant_id,
            stage_id,
            raw_ms,
            penalty_ms: 0,
            note: None,
        }
    }

    /// Categories A (08:00) and B (08:10), stage 1 raced by both.
    fn setup() -> (Arc<MemoryStore>, TimingService) {
        let store = Arc::new(MemoryStore::default());
        store.add_category(1, at(8, 0));
        store.add_category(2, at(8, 10));
        store.add_stage(1, &[1, 2]);
        let service = TimingService::new(store.clone(), DEFAULT_RECALC_TIMEOUT);
        (store, service)
    }

    fn assert_dense(records: &[TimingRecord]) {
        let mut ranked = records.to_vec();
        ranked.sort_by_key(|r| r.position);
        let positions: Vec<Option<i32>> = ranked.iter().map(|r| r.position).collect();
        let expected: Vec<Option<i32>> = (1..=records.len() as i32).map(Some).collect();
        assert_eq!(positions, expected);
        assert!(ranked.windows(2).all(|w| w[0].final_ms <= w[1].final_ms));
    }

    #[tokio::test]
    async fn test_record_applies_stagger_and_ranks() {
        let (store, service) = setup();
        let rider = store.add_participant(2);

        let (record, status) = service.record(input(rider, 1, 3_600_000)).await.unwrap();

        assert_eq!(status, RecalculationStatus::Completed { ranked: 1 });
        assert_eq!(record.start_offset_ms, 600_000);
        assert_eq!(record.final_ms + record.bonus_ms, 4_200_000);
        assert_eq!(record.position, Some(1));
        assert_eq!(record.raw_ms, 3_600_000);
    }

    #[tokio::test]
    async fn test_duplicate_pair_is_conflict_and_first_unchanged() {
        let (store, service) = setup();
        let rider = store.add_participant(1);

        let (first, _) = service.record(input(rider, 1, 100_000)).await.unwrap();
        let second = service.record(input(rider, 1, 90_000)).await;

        assert!(matches!(second, Err(StorageError::ConstraintViolation(_))));
        assert_eq!(store.record(first.timing_id).raw_ms, 100_000);
        assert_eq!(store.stage_records(1).len(), 1);
    }

    #[tokio::test]
    async fn test_positions_stay_dense_through_writes() {
        let (store, service) = setup();
        let mut ids = Vec::new();
        for (i, raw) in [120_000, 95_000, 101_000, 99_000, 130_000, 97_000, 110_000]
            .into_iter()
            .enumerate()
        {
            let rider = store.add_participant(if i % 2 == 0 { 1 } else { 2 });
            let (record, _) = service.record(input(rider, 1, raw)).await.unwrap();
            ids.push(record.timing_id);
            assert_dense(&store.stage_records(1));
        }

        service.remove(ids[1]).await.unwrap();
        service.remove(ids[4]).await.unwrap();
        let remaining = store.stage_records(1);
        assert_eq!(remaining.len(), 5);
        assert_dense(&remaining);
    }

    #[tokio::test]
    async fn test_recalculate_is_idempotent() {
        let (store, service) = setup();
        for raw in [95_000, 91_000, 99_000, 91_000, 120_000, 101_000] {
            let rider = store.add_participant(1);
            service.record(input(rider, 1, raw)).await.unwrap();
        }

        service.recalculate(1).await.unwrap();
        let first = store.stage_records(1);
        assert_eq!(service.recalculate(1).await.unwrap(), RecalcOutcome::Ranked(6));
        assert_eq!(store.stage_records(1), first);
    }

    #[tokio::test]
    async fn test_faster_time_takes_bonus_away() {
        let (store, service) = setup();
        let mut fifth = None;
        for raw in [200_000, 201_000, 202_000, 203_000, 204_000] {
            let rider = store.add_participant(1);
            let (record, _) = service.record(input(rider, 1, raw)).await.unwrap();
            fifth = Some(record.timing_id);
        }
        let fifth = fifth.unwrap();
        assert_eq!(store.record(fifth).bonus_ms, 1_000);

        let rider = store.add_participant(1);
        service.record(input(rider, 1, 150_000)).await.unwrap();

        let bumped = store.record(fifth);
        assert_eq!(bumped.bonus_ms, 0);
        assert_eq!(bumped.final_ms, 204_000);
        assert_eq!(bumped.position, Some(6));
    }

    #[tokio::test]
    async fn test_empty_stage_is_noop() {
        let (store, service) = setup();
        let rider = store.add_participant(1);
        let (record, _) = service.record(input(rider, 1, 80_000)).await.unwrap();

        let (_, status) = service.remove(record.timing_id).await.unwrap();
        assert!(matches!(status, RecalculationStatus::Skipped { .. }));
        assert_eq!(service.recalculate(1).await.unwrap(), RecalcOutcome::Empty);
    }

    #[tokio::test]
    async fn test_removed_stage_aborts_without_error() {
        let (store, service) = setup();
        store.remove_stage(1);

        assert_eq!(service.recalculate(1).await.unwrap(), RecalcOutcome::StageRemoved);
        assert!(matches!(
            service.recalculate_reported(1).await,
            RecalculationStatus::Skipped { .. }
        ));
    }

    #[tokio::test]
    async fn test_slow_pass_times_out_but_write_stands() {
        let store = Arc::new(MemoryStore::with_delay(Duration::from_millis(200)));
        store.add_category(1, at(8, 0));
        store.add_stage(1, &[1]);
        let service = TimingService::new(store.clone(), Duration::from_millis(20));
        let rider = store.add_participant(1);

        let (record, status) = service.record(input(rider, 1, 61_000)).await.unwrap();

        assert!(status.is_failed());
        assert_eq!(store.record(record.timing_id).raw_ms, 61_000);
        assert_eq!(store.record(record.timing_id).position, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_passes_on_one_stage_never_overlap() {
        let (store, service) = setup();
        for raw in [100_000, 90_000, 95_000] {
            let rider = store.add_participant(1);
            service.record(input(rider, 1, raw)).await.unwrap();
        }

        let passes: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.recalculate(1).await })
            })
            .collect();
        for pass in passes {
            assert_eq!(pass.await.unwrap().unwrap(), RecalcOutcome::Ranked(3));
        }

        assert_eq!(store.max_active_passes.load(Ordering::SeqCst), 1);
        assert_dense(&store.stage_records(1));
    }

    #[tokio::test]
    async fn test_failed_stage_does_not_stop_the_rest() {
        let (store, service) = setup();
        store.add_stage(2, &[1]);
        store.add_stage(3, &[2]);
        let early = store.add_participant(1);
        let late = store.add_participant(2);
        for stage_id in [1, 2] {
            service.record(input(early, stage_id, 70_000)).await.unwrap();
        }
        service.record(input(late, 3, 70_000)).await.unwrap();
        store.add_category(2, at(8, 20));
        store.unreadable_stages.lock().unwrap().insert(2);

        service.recalculate_all(&[1, 2, 3]).await;

        let stage_one = store.stage_records(1);
        let stage_three = store.stage_records(3);
        assert_eq!(stage_one[0].start_offset_ms, 0);
        assert_eq!(stage_three[0].start_offset_ms, 1_200_000);
        assert_eq!(stage_three[0].final_ms, 1_260_000);
        assert_eq!(stage_three[0].position, Some(1));
    }

    #[tokio::test]
    async fn test_transient_update_failure_recreates_once() {
        let (store, service) = setup();
        let rider = store.add_participant(1);
        let (record, _) = service.record(input(rider, 1, 100_000)).await.unwrap();

        store.transient_update_failures.store(1, Ordering::SeqCst);
        let request = UpdateTimingRequest {
            participant_id: None,
            stage_id: None,
            raw_time: Some(DurationInput::Millis(98_000)),
            penalty: Some(DurationInput::Millis(3_000)),
            note: None,
        };
        let (updated, _) = service.correct(record.timing_id, request).await.unwrap();

        assert_eq!(store.recreated.load(Ordering::SeqCst), 1);
        assert_eq!(updated.timing_id, record.timing_id);
        assert_eq!(updated.raw_ms, 98_000);
        assert_eq!(updated.penalty_ms, 3_000);
    }

    #[tokio::test]
    async fn test_update_into_taken_pair_is_conflict() {
        let (store, service) = setup();
        store.add_stage(2, &[1]);
        let rider = store.add_participant(1);
        service.record(input(rider, 1, 100_000)).await.unwrap();
        let (second, _) = service.record(input(rider, 2, 100_000)).await.unwrap();

        let request = UpdateTimingRequest {
            participant_id: None,
            stage_id: Some(1),
            raw_time: None,
            penalty: None,
            note: None,
        };
        let result = service.correct(second.timing_id, request).await;
        assert!(matches!(result, Err(StorageError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_moving_record_reranks_both_stages() {
        let (store, service) = setup();
        store.add_stage(2, &[1]);
        let a = store.add_participant(1);
        let b = store.add_participant(1);
        service.record(input(a, 1, 100_000)).await.unwrap();
        let (moving, _) = service.record(input(b, 1, 90_000)).await.unwrap();

        let request = UpdateTimingRequest {
            participant_id: None,
            stage_id: Some(2),
            raw_time: None,
            penalty: None,
            note: None,
        };
        let (moved, status) = service.correct(moving.timing_id, request).await.unwrap();

        assert_eq!(status, RecalculationStatus::Completed { ranked: 1 });
        assert_eq!(moved.stage_id, 2);
        assert_eq!(moved.position, Some(1));
        let left_behind = store.stage_records(1);
        assert_eq!(left_behind.len(), 1);
        assert_eq!(left_behind[0].position, Some(1));
    }

    #[tokio::test]
    async fn test_category_must_race_stage() {
        let (store, service) = setup();
        store.add_category(3, at(9, 0));
        let outsider = store.add_participant(3);

        let result = service.record(input(outsider, 1, 100_000)).await;
        assert!(matches!(result, Err(StorageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_unknown_stage_rejected() {
        let (store, service) = setup();
        let rider = store.add_participant(1);

        let result = service.record(input(rider, 42, 100_000)).await;
        assert!(matches!(result, Err(StorageError::InvalidInput(_))));
    }
}
