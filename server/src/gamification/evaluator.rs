use std::collections::HashSet;

use shared::{satisfied_achievements, Achievement, TriggerEvent, UserId};
use tracing::instrument;

use crate::db::DB;

/// Loads the catalog and the user's history, then selects the achievements
/// newly unlocked by this event. Read-only; side effects belong to the
/// awarder.
#[instrument(skip(db))]
pub async fn newly_satisfied(
    db: &DB,
    user_id: UserId,
    event: &TriggerEvent,
) -> anyhow::Result<Vec<Achievement>> {
    let catalog = db.get_active_achievements().await?;
    let held: HashSet<_> = db.get_user_achievement_ids(user_id).await?;
    let snapshot = db.load_activity_snapshot(user_id).await?;

    Ok(satisfied_achievements(&catalog, &held, event, &snapshot)
        .into_iter()
        .cloned()
        .collect())
}
