use std::collections::HashSet;

use chrono::NaiveDate;

use crate::CourseId;

/// Minutes of study credited per completed lesson. Time spent is estimated
/// from lesson completions, not measured wall-clock time.
pub const ESTIMATED_MINUTES_PER_LESSON: u32 = 30;

/// Everything the criterion rules need to know about a user's history,
/// loaded in one pass before evaluation.
#[derive(Debug, Clone, Default)]
pub struct ActivitySnapshot {
    pub completed_courses: HashSet<CourseId>,
    pub participation_count: u32,
    pub social_count: u32,
    pub completed_lessons: u32,
    /// Distinct calendar days with at least one activity row.
    pub activity_days: Vec<NaiveDate>,
}

impl ActivitySnapshot {
    pub fn estimated_hours(&self) -> u32 {
        self.completed_lessons * ESTIMATED_MINUTES_PER_LESSON / 60
    }

    pub fn current_streak_days(&self) -> u32 {
        consecutive_days(&self.activity_days)
    }
}

/// Length of the run of consecutive calendar days ending at the most recent
/// activity day. Days are compared by date, not by 24h window.
pub fn consecutive_days(days: &[NaiveDate]) -> u32 {
    let mut days = days.to_vec();
    days.sort_unstable();
    days.dedup();

    let mut streak = 0;
    let mut expected = None;
    for day in days.into_iter().rev() {
        if let Some(next) = expected {
            if day != next {
                break;
            }
        }
        streak += 1;
        expected = day.pred_opt();
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn unbroken_run_counts_every_day() {
        assert_eq!(3, consecutive_days(&[day(10), day(9), day(8)]));
    }

    #[test]
    fn gap_breaks_the_streak() {
        assert_eq!(1, consecutive_days(&[day(10), day(8)]));
    }

    #[test]
    fn duplicate_days_count_once() {
        assert_eq!(2, consecutive_days(&[day(10), day(10), day(9)]));
    }

    #[test]
    fn no_activity_means_no_streak() {
        assert_eq!(0, consecutive_days(&[]));
    }

    #[test]
    fn streak_is_anchored_at_most_recent_day() {
        // The older unbroken pair does not extend the current streak.
        assert_eq!(1, consecutive_days(&[day(20), day(12), day(11)]));
    }

    #[test]
    fn estimated_hours_round_down() {
        let snapshot = ActivitySnapshot {
            completed_lessons: 5,
            ..Default::default()
        };
        assert_eq!(2, snapshot.estimated_hours());
    }
}
