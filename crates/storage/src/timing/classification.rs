use std::collections::HashMap;

use uuid::Uuid;

/// One completed stage of one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTime {
    pub participant_id: Uuid,
    pub bib: Option<String>,
    pub final_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    pub participant_id: Uuid,
    pub total_ms: i64,
    pub stages_completed: i32,
    pub position: i32,
}

/// Overall classification: per-participant sum of final times, ascending.
///
/// Participants who skipped stages are ranked on the sum of the stages they
/// completed. Equal totals are ordered by bib (unassigned last), then by
/// participant id.
pub fn classify(times: &[StageTime]) -> Vec<Standing> {
    let mut totals: HashMap<Uuid, (Option<&str>, i64, i32)> = HashMap::new();

    for time in times {
        let slot = totals
            .entry(time.participant_id)
            .or_insert((time.bib.as_deref(), 0, 0));
        slot.1 = slot.1.saturating_add(time.final_ms);
        slot.2 += 1;
    }

    let mut rows: Vec<(Uuid, Option<&str>, i64, i32)> = totals
        .into_iter()
        .map(|(id, (bib, total, count))| (id, bib, total, count))
        .collect();

    rows.sort_by(|a, b| {
        a.2.cmp(&b.2)
            .then_with(|| match (a.1, b.1) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.0.cmp(&b.0))
    });

    rows.into_iter()
        .enumerate()
        .map(|(idx, (participant_id, _, total_ms, stages_completed))| Standing {
            participant_id,
            total_ms,
            stages_completed,
            position: idx as i32 + 1,
        })
        .collect()
}
