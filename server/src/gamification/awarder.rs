use anyhow::Context;
use shared::{Achievement, CourseId, UserId};
use tracing::{info, instrument};

use crate::db::DB;

/// Records the award and its point bookkeeping in one transaction. Returns
/// false for the benign cases: the user already holds the achievement, or
/// the user does not exist.
#[instrument(skip(db, achievement), fields(achievement_id = achievement.id))]
pub async fn award(
    db: &DB,
    user_id: UserId,
    achievement: &Achievement,
    course_id: Option<CourseId>,
) -> anyhow::Result<bool> {
    let mut tx = db.begin().await?;

    if !DB::user_exists(&mut tx, user_id).await? {
        info!(user_id, "skipping award for unknown user");
        return Ok(false);
    }

    let awarded = DB::award_achievement(&mut tx, user_id, achievement.id, achievement.points, course_id)
        .await
        .with_context(|| {
            format!(
                "failed to award achievement {} to user {user_id}",
                achievement.id
            )
        })?;
    tx.commit().await?;

    if awarded {
        // The only outward notification signal the core emits.
        info!(
            user_id,
            achievement_id = achievement.id,
            points = achievement.points,
            "achievement earned: {}",
            achievement.name
        );
    }

    Ok(awarded)
}
