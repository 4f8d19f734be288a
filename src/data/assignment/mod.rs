use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::course::Course;
use crate::error::RuleError;

pub mod db;

pub static ASSIGNMENT_COLLECTION_NAME: &str = "assignment";

/// How an assignment is handed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SubmissionMode {
    Individual,
    Group,
}

/// Stored submission type. Older documents may hold values other than the
/// two known modes (the former default was "online"); those are kept as read
/// and rejected whenever a mode is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubmissionType {
    Known(SubmissionMode),
    Unrecognized(String),
}

impl SubmissionType {
    pub fn mode(&self) -> Result<SubmissionMode, RuleError> {
        match self {
            SubmissionType::Known(mode) => Ok(*mode),
            SubmissionType::Unrecognized(other) => {
                tracing::warn!("assignment stores unknown submission type '{}'", other);
                Err(RuleError::InvalidSubmissionType(other.clone()))
            }
        }
    }
}

impl From<SubmissionMode> for SubmissionType {
    fn from(mode: SubmissionMode) -> Self {
        SubmissionType::Known(mode)
    }
}

impl std::fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionType::Known(SubmissionMode::Individual) => write!(f, "Individual"),
            SubmissionType::Known(SubmissionMode::Group) => write!(f, "Group"),
            SubmissionType::Unrecognized(other) => write!(f, "{}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "_id", with = "bson::serde_helpers::uuid_1_as_binary")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub course_id: Uuid,
    #[serde(default)]
    pub drive_link: Option<String>,
    pub submission_type: SubmissionType,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentCreateData {
    pub assignment_name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub course_id: Uuid,
    #[serde(default)]
    pub drive_link: Option<String>,
    pub submission_type: SubmissionMode,
}

impl AssignmentCreateData {
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.assignment_name.trim().is_empty() || self.description.trim().is_empty() {
            return Err(RuleError::validation(
                "Assignment name and description are required.",
            ));
        }
        Ok(())
    }
}

/// Checks that `professor` may attach a new assignment to `course`.
pub fn ensure_can_attach(course: &Course, professor: Uuid) -> Result<(), RuleError> {
    if course.professor_id != professor {
        return Err(RuleError::not_authorized(
            "You are not authorized to add assignments for this course.",
        ));
    }
    if course.assignment_id.is_some() {
        return Err(RuleError::AssignmentAlreadyExists);
    }
    Ok(())
}

impl Assignment {
    pub fn for_course(data: AssignmentCreateData) -> Assignment {
        Assignment {
            id: Uuid::new_v4(),
            name: data.assignment_name.trim().to_string(),
            description: data.description.trim().to_string(),
            deadline: data.deadline,
            course_id: data.course_id,
            drive_link: data.drive_link.filter(|it| !it.trim().is_empty()),
            submission_type: data.submission_type.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub id: Uuid,
    pub assignment_name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub course_id: Uuid,
    pub drive_link: Option<String>,
    pub submission_type: String,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        AssignmentResponse {
            id: assignment.id,
            assignment_name: assignment.name,
            description: assignment.description,
            deadline: assignment.deadline,
            course_id: assignment.course_id,
            drive_link: assignment.drive_link,
            submission_type: assignment.submission_type.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_assignment(course: &Course, mode: SubmissionMode) -> Assignment {
    Assignment {
        id: Uuid::new_v4(),
        name: "Project".to_string(),
        description: "Build it".to_string(),
        deadline: Utc::now() + chrono::Duration::days(7),
        course_id: course.id,
        drive_link: None,
        submission_type: mode.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_submission_types_are_kept_but_rejected() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let mut document =
            bson::to_document(&test_assignment(&course, SubmissionMode::Group)).unwrap();
        assert_eq!(document.get_str("submission_type").unwrap(), "Group");

        document.insert("submission_type", "online");
        let legacy: Assignment = bson::from_document(document).unwrap();

        assert_eq!(
            legacy.submission_type,
            SubmissionType::Unrecognized("online".to_string())
        );
        assert_eq!(
            legacy.submission_type.mode(),
            Err(RuleError::InvalidSubmissionType("online".to_string()))
        );
    }

    #[test]
    fn known_modes_dispatch() {
        let stored: SubmissionType = bson::from_bson(bson::Bson::from("Individual")).unwrap();
        assert_eq!(stored.mode(), Ok(SubmissionMode::Individual));
    }

    #[test]
    fn request_rejects_unknown_modes() {
        let body = serde_json::json!({
            "assignmentName": "Project",
            "description": "Build it",
            "deadline": "2030-01-01T00:00:00Z",
            "courseId": Uuid::new_v4(),
            "submissionType": "online",
        });
        assert!(serde_json::from_value::<AssignmentCreateData>(body).is_err());
    }

    #[test]
    fn attaching_requires_owner_and_free_slot() {
        let owner = Uuid::new_v4();
        let mut course = Course::new("Compilers", "Parsing", owner);

        assert!(ensure_can_attach(&course, owner).is_ok());
        assert!(matches!(
            ensure_can_attach(&course, Uuid::new_v4()),
            Err(RuleError::NotAuthorized(_))
        ));

        course.assignment_id = Some(Uuid::new_v4());
        assert_eq!(
            ensure_can_attach(&course, owner),
            Err(RuleError::AssignmentAlreadyExists)
        );
    }

    #[test]
    fn blank_drive_links_are_dropped() {
        let data = AssignmentCreateData {
            assignment_name: " Project ".to_string(),
            description: "Build it".to_string(),
            deadline: Utc::now(),
            course_id: Uuid::new_v4(),
            drive_link: Some("  ".to_string()),
            submission_type: SubmissionMode::Individual,
        };
        let assignment = Assignment::for_course(data);

        assert_eq!(assignment.name, "Project");
        assert_eq!(assignment.drive_link, None);
        assert_eq!(assignment.submission_type.to_string(), "Individual");
    }
}
