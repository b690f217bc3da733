use chrono::{DateTime, Utc};
use lms_gamification_server::db::types::{
    AchievementRecord, EarnedAchievementRecord, LeaderboardEntryRecord, UserProfileRecord,
};
use serde::{Deserialize, Serialize};
use shared::{Achievement, CourseId, TriggerEvent, UserId};
use utoipa::ToSchema;

#[derive(Clone, Debug, Serialize, Deserialize, Default, ToSchema)]
#[aliases(PaginatedLeaderboardResponse = PaginatedResponse<LeaderboardEntryResponse>)]
pub struct PaginatedResponse<T: Serialize> {
    pub records: Vec<T>,
    pub page: u64,
    pub total_pages: u64,
    pub limit: u64,
    pub total_records: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(records: Vec<T>, page: u64, limit: u64, total_records: u64) -> Self {
        // A zero limit would divide by zero below; treat it as a page of one.
        let limit = limit.max(1);
        let extra_page = if total_records % limit == 0 { 0 } else { 1 };
        let total_pages = (total_records / limit) + extra_page;
        Self {
            records,
            page,
            total_pages,
            limit,
            total_records,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckRequest {
    pub user_id: UserId,
    #[schema(value_type = Object)]
    pub event: TriggerEvent,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ScoreRequest {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub score: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AchievementResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points: i32,
    pub badge_color: String,
    pub kind: String,
}

impl From<Achievement> for AchievementResponse {
    fn from(achievement: Achievement) -> Self {
        Self {
            id: achievement.id,
            name: achievement.name,
            description: achievement.description,
            points: achievement.points,
            badge_color: achievement.badge_color,
            kind: achievement.kind.to_string(),
        }
    }
}

impl From<AchievementRecord> for AchievementResponse {
    fn from(record: AchievementRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            points: record.points,
            badge_color: record.badge_color,
            kind: record.kind,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EarnedAchievementResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points: i32,
    pub badge_color: String,
    pub kind: String,
    pub course_id: Option<i64>,
    pub earned_at: DateTime<Utc>,
}

impl From<EarnedAchievementRecord> for EarnedAchievementResponse {
    fn from(record: EarnedAchievementRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            points: record.points,
            badge_color: record.badge_color,
            kind: record.kind,
            course_id: record.course_id,
            earned_at: record.earned_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardEntryResponse {
    pub place: i32,
    pub username: String,
    pub full_name: Option<String>,
    pub score: f64,
    pub last_updated: DateTime<Utc>,
}

impl From<LeaderboardEntryRecord> for LeaderboardEntryResponse {
    fn from(record: LeaderboardEntryRecord) -> Self {
        Self {
            place: record.place,
            username: record.username,
            full_name: record.full_name,
            score: record.score,
            last_updated: record.last_updated,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaderboardPlace {
    pub period: String,
    pub place: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct UserProfileResponse {
    pub username: String,
    pub full_name: Option<String>,
    pub total_points: i64,
    pub level: i32,
    pub achievements: Vec<EarnedAchievementResponse>,
    pub leaderboard_places: Vec<LeaderboardPlace>,
}

impl From<UserProfileRecord> for UserProfileResponse {
    fn from(record: UserProfileRecord) -> Self {
        Self {
            username: record.user.username,
            full_name: record.user.full_name,
            total_points: record.user.total_points,
            level: record.user.level,
            achievements: record.achievements.into_iter().map(Into::into).collect(),
            leaderboard_places: record
                .leaderboard_places
                .into_iter()
                .map(|(period, place)| LeaderboardPlace { period, place })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_the_last_page_up() {
        let response = PaginatedResponse::<u32>::new(vec![], 1, 50, 101);
        assert_eq!(3, response.total_pages);

        let response = PaginatedResponse::<u32>::new(vec![], 1, 50, 100);
        assert_eq!(2, response.total_pages);
    }

    #[test]
    fn zero_limit_does_not_panic() {
        let response = PaginatedResponse::<u32>::new(vec![], 1, 0, 10);
        assert_eq!(1, response.limit);
        assert_eq!(10, response.total_pages);
    }
}
