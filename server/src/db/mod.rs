use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use rocket::{
    fairing::{self, AdHoc},
    Build, Rocket,
};
use rocket_db_pools::Database;
use shared::{
    Achievement, AchievementId, ActivitySnapshot, CourseId, IntoEnumIterator, LeaderboardScope,
    RankedEntry, UserId, UserScore,
};
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Database, Clone, Debug)]
#[database("lms_gamification")]
pub struct DB(PgPool);

pub mod types;

use types::{
    AchievementRecord, CriterionRecord, EarnedAchievementRecord, LeaderboardEntryRecord,
    UserProfileRecord, UserRecord,
};

impl DB {
    pub async fn begin(&self) -> anyhow::Result<Transaction<'static, Postgres>> {
        Ok(self.0.begin().await?)
    }

    /// Loads the active catalog with criteria attached. Rows whose stored
    /// kind no longer parses are dropped here instead of failing the batch.
    pub async fn get_active_achievements(&self) -> anyhow::Result<Vec<Achievement>> {
        let achievements: Vec<AchievementRecord> = sqlx::query_as(
            r#"
            SELECT id, name, description, points, badge_color, kind, is_active
            FROM achievements
            WHERE is_active
            ORDER BY id
            "#,
        )
        .fetch_all(&self.0)
        .await?;

        let criteria: Vec<CriterionRecord> = sqlx::query_as(
            r#"
            SELECT c.achievement_id, c.rule, c.course_id, c.assessment_id, c.min_score, c.required_count
            FROM achievement_criteria c
            JOIN achievements a ON a.id = c.achievement_id
            WHERE a.is_active
            ORDER BY c.id
            "#,
        )
        .fetch_all(&self.0)
        .await?;

        let mut grouped = criteria
            .into_iter()
            .into_group_map_by(|criterion| criterion.achievement_id);

        Ok(achievements
            .into_iter()
            .filter_map(|record| {
                let criteria = grouped.remove(&record.id).unwrap_or_default();
                record.into_domain(criteria)
            })
            .collect())
    }

    pub async fn get_achievement_catalog(&self) -> anyhow::Result<Vec<AchievementRecord>> {
        Ok(sqlx::query_as(
            r#"
            SELECT id, name, description, points, badge_color, kind, is_active
            FROM achievements
            WHERE is_active
            ORDER BY points DESC, id
            "#,
        )
        .fetch_all(&self.0)
        .await?)
    }

    pub async fn get_user_achievement_ids(
        &self,
        user_id: UserId,
    ) -> anyhow::Result<HashSet<AchievementId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT achievement_id
            FROM user_achievements
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.0)
        .await?;

        Ok(ids.into_iter().collect())
    }

    /// One pass over the user's history: everything the criterion rules can
    /// ask about.
    pub async fn load_activity_snapshot(
        &self,
        user_id: UserId,
    ) -> anyhow::Result<ActivitySnapshot> {
        let completed_courses: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT course_id
            FROM enrollments
            WHERE user_id = $1 AND completed_at IS NOT NULL
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.0)
        .await?;

        let participation_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM user_activities
            WHERE user_id = $1
            AND kind IN ('lesson_viewed', 'assessment_attempted', 'forum_posted')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.0)
        .await?;

        let social_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM user_activities
            WHERE user_id = $1 AND kind IN ('forum_posted', 'message_sent')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.0)
        .await?;

        let completed_lessons: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM user_activities
            WHERE user_id = $1 AND kind = 'lesson_viewed'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.0)
        .await?;

        let activity_days: Vec<NaiveDate> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT (occurred_at AT TIME ZONE 'UTC')::date AS activity_day
            FROM user_activities
            WHERE user_id = $1
            ORDER BY activity_day DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.0)
        .await?;

        Ok(ActivitySnapshot {
            completed_courses: completed_courses.into_iter().collect(),
            participation_count: participation_count as u32,
            social_count: social_count as u32,
            completed_lessons: completed_lessons as u32,
            activity_days,
        })
    }

    pub async fn user_exists(
        tx: &mut Transaction<'static, Postgres>,
        user_id: UserId,
    ) -> anyhow::Result<bool> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(tx.as_mut())
        .await?;

        Ok(id.is_some())
    }

    /// Inserts the award row and folds the points into the user's running
    /// total and level. Returns false when the pair already exists; the
    /// unique constraint makes the guard hold under concurrent triggers.
    pub async fn award_achievement(
        tx: &mut Transaction<'static, Postgres>,
        user_id: UserId,
        achievement_id: AchievementId,
        points: i32,
        course_id: Option<CourseId>,
    ) -> anyhow::Result<bool> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO user_achievements (user_id, achievement_id, course_id, earned_at)
            VALUES ($1, $2, $3, now())
            ON CONFLICT (user_id, achievement_id) DO NOTHING
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(achievement_id)
        .bind(course_id)
        .fetch_optional(tx.as_mut())
        .await?;

        if inserted.is_none() {
            return Ok(false);
        }

        let total_points: i64 = sqlx::query_scalar(
            r#"
            UPDATE users
            SET total_points = total_points + $2
            WHERE id = $1
            RETURNING total_points
            "#,
        )
        .bind(user_id)
        .bind(points as i64)
        .fetch_one(tx.as_mut())
        .await?;

        sqlx::query(
            r#"
            UPDATE users
            SET level = $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(shared::level_for_points(total_points))
        .execute(tx.as_mut())
        .await?;

        Ok(true)
    }

    pub async fn get_user(&self, username: &str) -> anyhow::Result<Option<UserProfileRecord>> {
        let user: Option<UserRecord> = sqlx::query_as(
            r#"
            SELECT id, username, full_name, total_points, level
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.0)
        .await?;

        let user = match user {
            Some(user) => user,
            None => return Ok(None),
        };

        let achievements: Vec<EarnedAchievementRecord> = sqlx::query_as(
            r#"
            SELECT a.id, a.name, a.description, a.points, a.badge_color, a.kind,
                   ua.course_id, ua.earned_at
            FROM user_achievements ua
            JOIN achievements a ON a.id = ua.achievement_id
            WHERE ua.user_id = $1
            ORDER BY ua.earned_at DESC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.0)
        .await?;

        let mut leaderboard_places = Vec::new();
        for period in shared::LeaderboardPeriod::iter() {
            let scope = LeaderboardScope::global(period);
            if let Some(place) = self.get_leaderboard_place(&scope, user.id).await? {
                leaderboard_places.push((period.to_string(), place));
            }
        }

        Ok(Some(UserProfileRecord {
            user,
            achievements,
            leaderboard_places,
        }))
    }

    pub async fn get_leaderboard(
        &self,
        scope: &LeaderboardScope,
        page: i64,
        limit: i64,
    ) -> anyhow::Result<(Vec<LeaderboardEntryRecord>, i64)> {
        let records: Vec<LeaderboardEntryRecord> = sqlx::query_as(
            r#"
            SELECT le.place, le.user_id, u.username, u.full_name, le.score, le.last_updated
            FROM leaderboard_entries le
            JOIN leaderboards l ON l.id = le.leaderboard_id
            JOIN users u ON u.id = le.user_id
            WHERE l.kind = $1 AND l.period = $2 AND l.course_id IS NOT DISTINCT FROM $3
            ORDER BY le.place
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(scope.kind.to_string())
        .bind(scope.period.to_string())
        .bind(scope.course_id)
        .bind(limit)
        .bind(page * limit)
        .fetch_all(&self.0)
        .await?;

        let total_count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM leaderboard_entries le
            JOIN leaderboards l ON l.id = le.leaderboard_id
            WHERE l.kind = $1 AND l.period = $2 AND l.course_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(scope.kind.to_string())
        .bind(scope.period.to_string())
        .bind(scope.course_id)
        .fetch_one(&self.0)
        .await?;

        Ok((records, total_count))
    }

    pub async fn get_leaderboard_place(
        &self,
        scope: &LeaderboardScope,
        user_id: UserId,
    ) -> anyhow::Result<Option<i64>> {
        let place: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT le.place
            FROM leaderboard_entries le
            JOIN leaderboards l ON l.id = le.leaderboard_id
            WHERE l.kind = $1 AND l.period = $2 AND l.course_id IS NOT DISTINCT FROM $3
            AND le.user_id = $4
            "#,
        )
        .bind(scope.kind.to_string())
        .bind(scope.period.to_string())
        .bind(scope.course_id)
        .bind(user_id)
        .fetch_optional(&self.0)
        .await?;

        Ok(place.map(i64::from))
    }

    pub async fn course_exists(&self, course_id: CourseId) -> anyhow::Result<bool> {
        let id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.0)
        .await?;

        Ok(id.is_some())
    }

    /// Finds the leaderboard row for a scope, creating it on first use.
    pub async fn ensure_leaderboard(
        tx: &mut Transaction<'static, Postgres>,
        scope: &LeaderboardScope,
    ) -> anyhow::Result<i64> {
        // First look the scope up
        let existing: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM leaderboards
            WHERE kind = $1 AND period = $2 AND course_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(scope.kind.to_string())
        .bind(scope.period.to_string())
        .bind(scope.course_id)
        .fetch_optional(tx.as_mut())
        .await?;

        if let Some(id) = existing {
            return Ok(id);
        }

        // If the lookup found nothing, insert the scope
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO leaderboards (kind, period, course_id)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(scope.kind.to_string())
        .bind(scope.period.to_string())
        .bind(scope.course_id)
        .fetch_one(tx.as_mut())
        .await?;

        Ok(id)
    }

    /// Per-user sums of earned-achievement points, optionally limited to
    /// awards inside the period window.
    pub async fn points_scores(
        tx: &mut Transaction<'static, Postgres>,
        window_start: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Vec<UserScore>> {
        let rows: Vec<(i64, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT ua.user_id, SUM(a.points)::bigint AS score
            FROM user_achievements ua
            JOIN achievements a ON a.id = ua.achievement_id
            WHERE $1::timestamptz IS NULL OR ua.earned_at >= $1
            GROUP BY ua.user_id
            "#,
        )
        .bind(window_start)
        .fetch_all(tx.as_mut())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, score)| UserScore {
                user_id,
                score: score.unwrap_or_default() as f64,
            })
            .collect())
    }

    /// Course progress plus achievement points scoped to the course, per
    /// enrolled user.
    pub async fn course_scores(
        tx: &mut Transaction<'static, Postgres>,
        course_id: CourseId,
    ) -> anyhow::Result<Vec<UserScore>> {
        let rows: Vec<(i64, Option<f64>)> = sqlx::query_as(
            r#"
            SELECT e.user_id,
                   e.progress_percentage + COALESCE(SUM(a.points), 0) AS score
            FROM enrollments e
            LEFT JOIN user_achievements ua
                ON ua.user_id = e.user_id AND ua.course_id = e.course_id
            LEFT JOIN achievements a ON a.id = ua.achievement_id
            WHERE e.course_id = $1
            GROUP BY e.user_id, e.progress_percentage
            "#,
        )
        .bind(course_id)
        .fetch_all(tx.as_mut())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, score)| UserScore {
                user_id,
                score: score.unwrap_or_default(),
            })
            .collect())
    }

    /// Current scores of a board's entry set, used when a reported score is
    /// merged over it before re-ranking.
    pub async fn entry_scores(
        tx: &mut Transaction<'static, Postgres>,
        leaderboard_id: i64,
    ) -> anyhow::Result<Vec<UserScore>> {
        let rows: Vec<(i64, f64)> = sqlx::query_as(
            r#"
            SELECT user_id, score
            FROM leaderboard_entries
            WHERE leaderboard_id = $1
            "#,
        )
        .bind(leaderboard_id)
        .fetch_all(tx.as_mut())
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, score)| UserScore { user_id, score })
            .collect())
    }

    /// Swaps in a freshly ranked entry set for one board. Delete and insert
    /// run in the caller's transaction, so a failure leaves the previous
    /// set in place.
    pub async fn replace_leaderboard_entries(
        tx: &mut Transaction<'static, Postgres>,
        leaderboard_id: i64,
        entries: &[RankedEntry],
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM leaderboard_entries
            WHERE leaderboard_id = $1
            "#,
        )
        .bind(leaderboard_id)
        .execute(tx.as_mut())
        .await?;

        if entries.is_empty() {
            return Ok(());
        }

        let user_ids: Vec<i64> = entries.iter().map(|entry| entry.user_id).collect();
        let scores: Vec<f64> = entries.iter().map(|entry| entry.score).collect();
        let places: Vec<i32> = entries.iter().map(|entry| entry.rank).collect();

        sqlx::query(
            r#"
            INSERT INTO leaderboard_entries (leaderboard_id, user_id, score, place, last_updated)
            SELECT $1, e.user_id, e.score, e.place, now()
            FROM unnest($2::bigint[], $3::float8[], $4::int[]) AS e(user_id, score, place)
            "#,
        )
        .bind(leaderboard_id)
        .bind(&user_ids)
        .bind(&scores)
        .bind(&places)
        .execute(tx.as_mut())
        .await?;

        Ok(())
    }
}

async fn run_migrations(rocket: Rocket<Build>) -> fairing::Result {
    match DB::fetch(&rocket) {
        Some(db) => match sqlx::migrate!("./migrations").run(&**db).await {
            Ok(_) => Ok(rocket),
            Err(e) => {
                rocket::error!("Failed to initialize SQLx database: {}", e);
                Err(rocket)
            }
        },
        None => Err(rocket),
    }
}

pub fn stage() -> AdHoc {
    AdHoc::on_ignite("SQLx Stage", |rocket| async {
        rocket
            .attach(DB::init())
            .attach(AdHoc::try_on_ignite("SQLx Migrations", run_migrations))
    })
}
