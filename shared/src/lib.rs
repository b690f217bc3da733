mod achievement;
mod activity;
mod event;
mod leaderboard;

pub use achievement::*;
pub use activity::*;
pub use event::*;
pub use leaderboard::*;

pub type UserId = i64;
pub type CourseId = i64;
pub type AssessmentId = i64;
pub type AchievementId = i64;

/// Points required to advance one level.
pub const LEVEL_DIVISOR: i64 = 100;

pub fn level_for_points(total_points: i64) -> i32 {
    (total_points / LEVEL_DIVISOR + 1) as i32
}

/// Point bookkeeping for a single award: returns the new running total and
/// the level derived from it.
pub fn apply_award(total_points: i64, achievement_points: i32) -> (i64, i32) {
    let total = total_points + achievement_points as i64;
    (total, level_for_points(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_starts_at_one() {
        assert_eq!(1, level_for_points(0));
        assert_eq!(1, level_for_points(99));
        assert_eq!(2, level_for_points(100));
        assert_eq!(6, level_for_points(550));
    }

    #[test]
    fn award_totals_are_additive() {
        let (total, level) = apply_award(0, 50);
        assert_eq!((50, 1), (total, level));

        let (total, level) = apply_award(total, 75);
        assert_eq!((125, 2), (total, level));

        let (total, level) = apply_award(total, 30);
        assert_eq!((155, 2), (total, level));
    }
}
