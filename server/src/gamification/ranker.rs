use anyhow::Context;
use chrono::Utc;
use shared::{merge_score, rank_scores, CourseId, LeaderboardKind, LeaderboardScope, UserId};
use tracing::instrument;

use crate::db::DB;

/// Recomputes one leaderboard scope: gathers fresh scores, ranks them, and
/// replaces the whole entry set. Delete and insert share a transaction, so
/// a failure leaves the previous entries untouched and a board is never
/// observable half-replaced.
#[instrument(skip(db))]
pub async fn recompute(db: &DB, scope: &LeaderboardScope) -> anyhow::Result<()> {
    let mut tx = db.begin().await?;

    let scores = match scope.kind {
        LeaderboardKind::Points => {
            let window_start = scope.period.window_start(Utc::now());
            DB::points_scores(&mut tx, window_start).await?
        }
        LeaderboardKind::CourseCompletion => {
            let course_id = scope
                .course_id
                .with_context(|| format!("course leaderboard {scope} has no course"))?;
            DB::course_scores(&mut tx, course_id).await?
        }
    };

    let leaderboard_id = DB::ensure_leaderboard(&mut tx, scope).await?;
    DB::replace_leaderboard_entries(&mut tx, leaderboard_id, &rank_scores(scores)).await?;
    tx.commit()
        .await
        .with_context(|| format!("failed to commit recompute of {scope}"))?;

    Ok(())
}

/// Applies a reported course score for one user and re-ranks that course's
/// board, creating the board on first use. The rest of the entry set keeps
/// its current scores; the whole set is still replaced atomically.
#[instrument(skip(db))]
pub async fn update_user_score(
    db: &DB,
    user_id: UserId,
    course_id: CourseId,
    score: f64,
) -> anyhow::Result<()> {
    if !db.course_exists(course_id).await? {
        anyhow::bail!("course {course_id} does not exist");
    }

    let scope = LeaderboardScope::course(course_id);
    let mut tx = db.begin().await?;

    let leaderboard_id = DB::ensure_leaderboard(&mut tx, &scope).await?;
    let mut scores = DB::entry_scores(&mut tx, leaderboard_id).await?;
    merge_score(&mut scores, user_id, score);

    DB::replace_leaderboard_entries(&mut tx, leaderboard_id, &rank_scores(scores)).await?;
    tx.commit()
        .await
        .with_context(|| format!("failed to commit score update for {scope}"))?;

    Ok(())
}
