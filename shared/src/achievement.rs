use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{AchievementId, ActivitySnapshot, AssessmentId, CourseId, TriggerEvent};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AchievementKind {
    Course,
    Assessment,
    Participation,
    Time,
    Streak,
    Social,
}

/// Catalog entry. Rows are admin-authored and deactivated rather than
/// deleted, so earned history always resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub points: i32,
    pub badge_color: String,
    pub kind: AchievementKind,
    pub is_active: bool,
    pub criteria: Vec<Criterion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CriterionRule {
    CourseCompletion,
    AssessmentScore { min_score: f64 },
    Participation { required_count: u32 },
    TimeSpent { required_hours: u32 },
    Streak { required_days: u32 },
    Social { required_count: u32 },
}

impl CriterionRule {
    /// Reassembles a rule from its storage columns. Unknown rule names and
    /// missing or non-positive parameters yield `None`, which evaluates as
    /// "not met" rather than an error.
    pub fn parse(rule: &str, min_score: Option<f64>, required_count: Option<i32>) -> Option<Self> {
        let required = required_count.filter(|count| *count > 0).map(|c| c as u32);
        match rule {
            "course_completion" => Some(Self::CourseCompletion),
            "assessment_score" => min_score.map(|min_score| Self::AssessmentScore { min_score }),
            "participation" => required.map(|required_count| Self::Participation { required_count }),
            "time_spent" => required.map(|required_hours| Self::TimeSpent { required_hours }),
            "streak" => required.map(|required_days| Self::Streak { required_days }),
            "social" => required.map(|required_count| Self::Social { required_count }),
            _ => None,
        }
    }

    pub fn is_satisfied(
        &self,
        scoped_course: Option<CourseId>,
        event: &TriggerEvent,
        snapshot: &ActivitySnapshot,
    ) -> bool {
        match self {
            Self::CourseCompletion => scoped_course
                .or(event.course_id())
                .is_some_and(|course| snapshot.completed_courses.contains(&course)),
            Self::AssessmentScore { min_score } => {
                event.score().is_some_and(|score| score >= *min_score)
            }
            Self::Participation { required_count } => {
                snapshot.participation_count >= *required_count
            }
            Self::TimeSpent { required_hours } => snapshot.estimated_hours() >= *required_hours,
            Self::Streak { required_days } => snapshot.current_streak_days() >= *required_days,
            Self::Social { required_count } => snapshot.social_count >= *required_count,
        }
    }
}

/// A single testable rule attached to an achievement, optionally scoped to
/// one course or assessment. `rule` is `None` when the stored row could not
/// be parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Criterion {
    pub course_id: Option<CourseId>,
    pub assessment_id: Option<AssessmentId>,
    pub rule: Option<CriterionRule>,
}

impl Criterion {
    /// A criterion applies when its scope is unset or matches the event
    /// exactly.
    pub fn matches_scope(&self, event: &TriggerEvent) -> bool {
        let course_ok = match self.course_id {
            Some(course) => event.course_id() == Some(course),
            None => true,
        };
        let assessment_ok = match self.assessment_id {
            Some(assessment) => event.assessment_id() == Some(assessment),
            None => true,
        };
        course_ok && assessment_ok
    }

    pub fn is_satisfied(&self, event: &TriggerEvent, snapshot: &ActivitySnapshot) -> bool {
        if !self.matches_scope(event) {
            return false;
        }
        match &self.rule {
            Some(rule) => rule.is_satisfied(self.course_id, event, snapshot),
            None => false,
        }
    }
}

impl Achievement {
    /// True when the event is in scope for this achievement and every
    /// applicable criterion holds.
    pub fn is_satisfied(&self, event: &TriggerEvent, snapshot: &ActivitySnapshot) -> bool {
        if !self.is_active {
            return false;
        }
        let applicable: Vec<&Criterion> = self
            .criteria
            .iter()
            .filter(|criterion| criterion.matches_scope(event))
            .collect();
        !applicable.is_empty()
            && applicable
                .iter()
                .all(|criterion| criterion.is_satisfied(event, snapshot))
    }
}

/// Selects the achievements newly unlocked by `event`: active catalog rows
/// the user does not already hold whose criteria are satisfied. Re-running
/// with the same inputs after an award never re-selects the same
/// achievement, since it is in the held set.
pub fn satisfied_achievements<'a>(
    catalog: &'a [Achievement],
    held: &HashSet<AchievementId>,
    event: &TriggerEvent,
    snapshot: &ActivitySnapshot,
) -> Vec<&'a Achievement> {
    catalog
        .iter()
        .filter(|achievement| !held.contains(&achievement.id))
        .filter(|achievement| achievement.is_satisfied(event, snapshot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_finisher(id: AchievementId, course_id: Option<CourseId>) -> Achievement {
        Achievement {
            id,
            name: "Course Finisher".to_string(),
            description: "Complete a course".to_string(),
            points: 50,
            badge_color: "#2d9cdb".to_string(),
            kind: AchievementKind::Course,
            is_active: true,
            criteria: vec![Criterion {
                course_id,
                assessment_id: None,
                rule: Some(CriterionRule::CourseCompletion),
            }],
        }
    }

    fn snapshot_with_completed(course: CourseId) -> ActivitySnapshot {
        ActivitySnapshot {
            completed_courses: [course].into_iter().collect(),
            ..Default::default()
        }
    }

    #[test]
    fn completion_criterion_follows_the_event_course() {
        let achievement = course_finisher(1, None);
        let event = TriggerEvent::CourseCompleted { course_id: 7 };

        assert!(achievement.is_satisfied(&event, &snapshot_with_completed(7)));
        assert!(!achievement.is_satisfied(&event, &snapshot_with_completed(8)));
    }

    #[test]
    fn scoped_criterion_ignores_other_courses() {
        let achievement = course_finisher(1, Some(7));
        let snapshot = snapshot_with_completed(9);

        // Event for a different course is out of scope entirely.
        let other = TriggerEvent::CourseCompleted { course_id: 9 };
        assert!(!achievement.is_satisfied(&other, &snapshot));
    }

    #[test]
    fn assessment_score_compares_against_minimum() {
        let rule = CriterionRule::AssessmentScore { min_score: 80.0 };
        let snapshot = ActivitySnapshot::default();

        let passing = TriggerEvent::AssessmentGraded {
            assessment_id: 3,
            score: 80.0,
        };
        let failing = TriggerEvent::AssessmentGraded {
            assessment_id: 3,
            score: 79.5,
        };
        assert!(rule.is_satisfied(None, &passing, &snapshot));
        assert!(!rule.is_satisfied(None, &failing, &snapshot));
        assert!(!rule.is_satisfied(None, &TriggerEvent::ForumPosted, &snapshot));
    }

    #[test]
    fn participation_and_social_use_running_counts() {
        let snapshot = ActivitySnapshot {
            participation_count: 10,
            social_count: 4,
            ..Default::default()
        };
        let event = TriggerEvent::ForumPosted;

        let participation = CriterionRule::Participation { required_count: 10 };
        let social = CriterionRule::Social { required_count: 5 };
        assert!(participation.is_satisfied(None, &event, &snapshot));
        assert!(!social.is_satisfied(None, &event, &snapshot));
    }

    #[test]
    fn malformed_rules_parse_to_none() {
        assert!(CriterionRule::parse("unknown_rule", None, Some(3)).is_none());
        assert!(CriterionRule::parse("assessment_score", None, None).is_none());
        assert!(CriterionRule::parse("streak", None, Some(0)).is_none());
        assert!(CriterionRule::parse("streak", None, Some(3)).is_some());
    }

    #[test]
    fn unparsed_criterion_is_never_met() {
        let criterion = Criterion {
            course_id: None,
            assessment_id: None,
            rule: None,
        };
        assert!(!criterion.is_satisfied(&TriggerEvent::ForumPosted, &ActivitySnapshot::default()));
    }

    #[test]
    fn held_achievements_are_never_reselected() {
        let catalog = vec![course_finisher(1, None)];
        let event = TriggerEvent::CourseCompleted { course_id: 7 };
        let snapshot = snapshot_with_completed(7);

        let first = satisfied_achievements(&catalog, &HashSet::new(), &event, &snapshot);
        assert_eq!(1, first.len());

        let held: HashSet<AchievementId> = first.iter().map(|a| a.id).collect();
        let second = satisfied_achievements(&catalog, &held, &event, &snapshot);
        assert!(second.is_empty());
    }

    #[test]
    fn inactive_achievements_are_skipped() {
        let mut achievement = course_finisher(1, None);
        achievement.is_active = false;
        let event = TriggerEvent::CourseCompleted { course_id: 7 };
        assert!(!achievement.is_satisfied(&event, &snapshot_with_completed(7)));
    }
}
