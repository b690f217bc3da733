use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Achievement, AchievementKind, Criterion, CriterionRule};

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AchievementRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points: i32,
    pub badge_color: String,
    pub kind: String,
    pub is_active: bool,
}

impl AchievementRecord {
    /// Rebuilds the domain achievement. Returns `None` when the stored kind
    /// is unknown, so stale catalog rows never reach the evaluator.
    pub fn into_domain(self, criteria: Vec<CriterionRecord>) -> Option<Achievement> {
        let kind = AchievementKind::from_str(&self.kind).ok()?;
        Some(Achievement {
            id: self.id,
            name: self.name,
            description: self.description,
            points: self.points,
            badge_color: self.badge_color,
            kind,
            is_active: self.is_active,
            criteria: criteria
                .into_iter()
                .map(CriterionRecord::into_domain)
                .collect(),
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CriterionRecord {
    pub achievement_id: i64,
    pub rule: String,
    pub course_id: Option<i64>,
    pub assessment_id: Option<i64>,
    pub min_score: Option<f64>,
    pub required_count: Option<i32>,
}

impl CriterionRecord {
    pub fn into_domain(self) -> Criterion {
        Criterion {
            course_id: self.course_id,
            assessment_id: self.assessment_id,
            rule: CriterionRule::parse(&self.rule, self.min_score, self.required_count),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub total_points: i64,
    pub level: i32,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EarnedAchievementRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub points: i32,
    pub badge_color: String,
    pub kind: String,
    pub course_id: Option<i64>,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LeaderboardEntryRecord {
    pub place: i32,
    pub user_id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub score: f64,
    pub last_updated: DateTime<Utc>,
}

/// Everything the profile endpoint returns for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileRecord {
    pub user: UserRecord,
    pub achievements: Vec<EarnedAchievementRecord>,
    pub leaderboard_places: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_drops_the_catalog_row() {
        let record = AchievementRecord {
            id: 1,
            name: "Mystery".to_string(),
            description: String::new(),
            points: 10,
            badge_color: "#fff".to_string(),
            kind: "bogus".to_string(),
            is_active: true,
        };
        assert!(record.into_domain(vec![]).is_none());
    }

    #[test]
    fn criterion_rows_survive_with_unparsable_rules() {
        let record = CriterionRecord {
            achievement_id: 1,
            rule: "no_such_rule".to_string(),
            course_id: Some(4),
            assessment_id: None,
            min_score: None,
            required_count: Some(2),
        };
        let criterion = record.into_domain();
        assert_eq!(Some(4), criterion.course_id);
        assert!(criterion.rule.is_none());
    }
}
