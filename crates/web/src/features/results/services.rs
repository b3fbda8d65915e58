use std::collections::HashMap;

use raceday_storage::{
    Database,
    dto::results::{
        ClassificationEntry, ClassificationResponse, ResultsSummary, StageResultEntry, StageStats,
    },
    error::{Result, StorageError},
    repository::{
        category::CategoryRepository,
        results::{ParticipantLabel, ResultsRepository},
        stage::StageRepository,
    },
    timing::{Standing, classify, format_time},
};
use uuid::Uuid;

pub async fn stage_leaderboard(db: &Database, stage_id: i32) -> Result<Vec<StageResultEntry>> {
    ensure_stage(db, stage_id).await?;
    ResultsRepository::new(db.pool())
        .stage_leaderboard(stage_id)
        .await
}

pub async fn stage_stats(db: &Database, stage_id: i32) -> Result<StageStats> {
    ensure_stage(db, stage_id).await?;
    let times = ResultsRepository::new(db.pool())
        .stage_final_times(stage_id)
        .await?;

    Ok(StageStats::from_final_times(stage_id, &times))
}

/// Overall classification of one category
pub async fn classification(db: &Database, category_id: i32) -> Result<ClassificationResponse> {
    let category = CategoryRepository::new(db.pool())
        .find_by_id(category_id)
        .await?;

    let repo = ResultsRepository::new(db.pool());
    let times = repo.category_stage_times(category_id).await?;
    let labels = repo.category_participants(category_id).await?;

    Ok(ClassificationResponse {
        category_id: category.category_id,
        category_name: category.name,
        standings: label_standings(classify(&times), labels),
    })
}

pub async fn summary(db: &Database) -> Result<ResultsSummary> {
    ResultsRepository::new(db.pool()).summary().await
}

fn label_standings(standings: Vec<Standing>, labels: Vec<ParticipantLabel>) -> Vec<ClassificationEntry> {
    let mut labels: HashMap<Uuid, ParticipantLabel> = labels
        .into_iter()
        .map(|label| (label.participant_id, label))
        .collect();

    standings
        .into_iter()
        .filter_map(|standing| {
            // Skip anyone who moved category between the two reads
            let label = labels.remove(&standing.participant_id)?;
            Some(ClassificationEntry {
                position: standing.position,
                participant_id: standing.participant_id,
                bib: label.bib,
                first_name: label.first_name,
                last_name: label.last_name,
                team: label.team,
                total_ms: standing.total_ms,
                total_time: format_time(standing.total_ms),
                stages_completed: standing.stages_completed,
            })
        })
        .collect()
}

async fn ensure_stage(db: &Database, stage_id: i32) -> Result<()> {
    if StageRepository::new(db.pool()).exists(stage_id).await? {
        Ok(())
    } else {
        Err(StorageError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(participant_id: Uuid, bib: &str) -> ParticipantLabel {
        ParticipantLabel {
            participant_id,
            bib: Some(bib.to_string()),
            first_name: "Rider".to_string(),
            last_name: bib.to_string(),
            team: None,
        }
    }

    #[test]
    fn test_standings_get_labels_and_formatted_totals() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let standings = vec![
            Standing { participant_id: x, total_ms: 220_000, stages_completed: 2, position: 1 },
            Standing { participant_id: y, total_ms: 230_000, stages_completed: 2, position: 2 },
        ];

        let entries = label_standings(standings, vec![label(y, "12"), label(x, "7")]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].participant_id, x);
        assert_eq!(entries[0].bib.as_deref(), Some("7"));
        assert_eq!(entries[0].total_time, "03:40.00");
        assert_eq!(entries[1].position, 2);
    }

    #[test]
    fn test_unlabelled_standing_dropped() {
        let standings = vec![Standing {
            participant_id: Uuid::new_v4(),
            total_ms: 1_000,
            stages_completed: 1,
            position: 1,
        }];

        assert!(label_standings(standings, Vec::new()).is_empty());
    }
}
