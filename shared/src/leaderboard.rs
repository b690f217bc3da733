use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

pub use strum::IntoEnumIterator;

use crate::{CourseId, UserId};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaderboardKind {
    Points,
    CourseCompletion,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaderboardPeriod {
    AllTime,
    Weekly,
    Monthly,
}

impl LeaderboardPeriod {
    /// Start of the scoring window, or `None` for the unbounded board.
    pub fn window_start(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::AllTime => None,
            Self::Weekly => Some(now - Duration::days(7)),
            Self::Monthly => Some(now - Duration::days(30)),
        }
    }
}

/// The (kind, period, optional course) tuple identifying one ranked list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardScope {
    pub kind: LeaderboardKind,
    pub period: LeaderboardPeriod,
    pub course_id: Option<CourseId>,
}

impl LeaderboardScope {
    pub const fn global(period: LeaderboardPeriod) -> Self {
        Self {
            kind: LeaderboardKind::Points,
            period,
            course_id: None,
        }
    }

    pub const fn course(course_id: CourseId) -> Self {
        Self {
            kind: LeaderboardKind::CourseCompletion,
            period: LeaderboardPeriod::AllTime,
            course_id: Some(course_id),
        }
    }
}

impl fmt::Display for LeaderboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.course_id {
            Some(course) => write!(f, "{}/{}/course-{}", self.kind, self.period, course),
            None => write!(f, "{}/{}", self.kind, self.period),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserScore {
    pub user_id: UserId,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedEntry {
    pub rank: i32,
    pub user_id: UserId,
    pub score: f64,
}

/// Merges one reported score over an entry set: overwrites the user's
/// existing score, or appends a new entry for a first report.
pub fn merge_score(scores: &mut Vec<UserScore>, user_id: UserId, score: f64) {
    match scores.iter_mut().find(|entry| entry.user_id == user_id) {
        Some(existing) => existing.score = score,
        None => scores.push(UserScore { user_id, score }),
    }
}

/// Sorts descending by score and assigns sequential 1-based ranks. Tied
/// scores keep distinct sequential ranks, ordered by user id ascending so a
/// recompute of the same facts always produces the same entry set.
pub fn rank_scores(mut scores: Vec<UserScore>) -> Vec<RankedEntry> {
    scores.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.user_id.cmp(&b.user_id))
    });
    scores
        .into_iter()
        .enumerate()
        .map(|(position, entry)| RankedEntry {
            rank: position as i32 + 1,
            user_id: entry.user_id,
            score: entry.score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(user_id: UserId, score: f64) -> UserScore {
        UserScore { user_id, score }
    }

    #[test]
    fn ranks_are_contiguous_and_descending() {
        let ranked = rank_scores(vec![score(1, 10.0), score(2, 300.0), score(3, 40.0)]);

        assert_eq!(vec![1, 2, 3], ranked.iter().map(|e| e.rank).collect::<Vec<_>>());
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(2, ranked[0].user_id);
    }

    #[test]
    fn ties_break_on_lower_user_id() {
        let ranked = rank_scores(vec![score(9, 300.0), score(4, 300.0), score(7, 100.0)]);

        assert_eq!(4, ranked[0].user_id);
        assert_eq!(9, ranked[1].user_id);
        assert_eq!(7, ranked[2].user_id);
        assert_eq!(vec![1, 2, 3], ranked.iter().map(|e| e.rank).collect::<Vec<_>>());
    }

    #[test]
    fn empty_population_ranks_to_nothing() {
        assert!(rank_scores(vec![]).is_empty());
    }

    #[test]
    fn first_report_appends_exactly_one_entry() {
        let mut scores = Vec::new();
        merge_score(&mut scores, 5, 72.5);

        let ranked = rank_scores(scores);
        assert_eq!(1, ranked.len());
        assert_eq!(
            RankedEntry {
                rank: 1,
                user_id: 5,
                score: 72.5
            },
            ranked[0]
        );
    }

    #[test]
    fn repeated_report_overwrites_instead_of_duplicating() {
        let mut scores = vec![score(5, 40.0), score(8, 60.0)];
        merge_score(&mut scores, 5, 95.0);

        assert_eq!(2, scores.len());
        let ranked = rank_scores(scores);
        assert_eq!((1, 5, 95.0), (ranked[0].rank, ranked[0].user_id, ranked[0].score));
        assert_eq!((2, 8, 60.0), (ranked[1].rank, ranked[1].user_id, ranked[1].score));
    }

    #[test]
    fn weekly_and_monthly_windows() {
        let now = DateTime::parse_from_rfc3339("2024-03-31T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(None, LeaderboardPeriod::AllTime.window_start(now));
        assert_eq!(
            Some(now - Duration::days(7)),
            LeaderboardPeriod::Weekly.window_start(now)
        );
        assert_eq!(
            Some(now - Duration::days(30)),
            LeaderboardPeriod::Monthly.window_start(now)
        );
    }

    #[test]
    fn scope_strings_identify_the_board() {
        assert_eq!(
            "points/weekly",
            LeaderboardScope::global(LeaderboardPeriod::Weekly).to_string()
        );
        assert_eq!("course_completion/all_time/course-7", LeaderboardScope::course(7).to_string());
    }

    #[test]
    fn period_round_trips_through_strings() {
        use std::str::FromStr;

        for period in LeaderboardPeriod::iter() {
            assert_eq!(Ok(period), LeaderboardPeriod::from_str(&period.to_string()));
        }
    }
}
