use shared::{
    Achievement, IntoEnumIterator, LeaderboardPeriod, LeaderboardScope, TriggerEvent, UserId,
};
use tracing::instrument;

use crate::db::DB;

pub mod awarder;
pub mod evaluator;
pub mod ranker;

/// Full pipeline for one triggering event: evaluate which achievements the
/// event newly unlocks, award each one, then refresh the boards the new
/// points feed. Duplicate triggers fall out as no-ops in the awarder; any
/// persistence failure aborts the remainder of the batch.
#[instrument(skip(db))]
pub async fn check_and_award(
    db: &DB,
    user_id: UserId,
    event: &TriggerEvent,
) -> anyhow::Result<Vec<Achievement>> {
    let candidates = evaluator::newly_satisfied(db, user_id, event).await?;

    let mut awarded = Vec::new();
    for achievement in candidates {
        if awarder::award(db, user_id, &achievement, event.course_id()).await? {
            awarded.push(achievement);
        }
    }

    if !awarded.is_empty() {
        for period in LeaderboardPeriod::iter() {
            ranker::recompute(db, &LeaderboardScope::global(period)).await?;
        }
        if let Some(course_id) = event.course_id() {
            ranker::recompute(db, &LeaderboardScope::course(course_id)).await?;
        }
    }

    Ok(awarded)
}
