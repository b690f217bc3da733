use serde::{Deserialize, Serialize};

use crate::{AssessmentId, CourseId};

/// A single user action that can unlock achievements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerEvent {
    CourseCompleted {
        course_id: CourseId,
    },
    AssessmentGraded {
        assessment_id: AssessmentId,
        score: f64,
    },
    LessonViewed {
        course_id: CourseId,
    },
    ForumPosted,
    LoginRecorded,
}

impl TriggerEvent {
    pub fn course_id(&self) -> Option<CourseId> {
        match self {
            Self::CourseCompleted { course_id } | Self::LessonViewed { course_id } => {
                Some(*course_id)
            }
            _ => None,
        }
    }

    pub fn assessment_id(&self) -> Option<AssessmentId> {
        match self {
            Self::AssessmentGraded { assessment_id, .. } => Some(*assessment_id),
            _ => None,
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Self::AssessmentGraded { score, .. } => Some(*score),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event: TriggerEvent =
            serde_json::from_str(r#"{"type": "assessment_graded", "assessment_id": 3, "score": 88.5}"#)
                .unwrap();
        assert_eq!(
            TriggerEvent::AssessmentGraded {
                assessment_id: 3,
                score: 88.5
            },
            event
        );

        let json = serde_json::to_value(TriggerEvent::CourseCompleted { course_id: 7 }).unwrap();
        assert_eq!("course_completed", json["type"]);
        assert_eq!(7, json["course_id"]);
    }

    #[test]
    fn accessors_expose_only_the_relevant_fields() {
        let event = TriggerEvent::CourseCompleted { course_id: 7 };
        assert_eq!(Some(7), event.course_id());
        assert_eq!(None, event.assessment_id());
        assert_eq!(None, event.score());

        assert_eq!(None, TriggerEvent::LoginRecorded.course_id());
    }
}
