use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::assignment::{Assignment, AssignmentResponse};
use crate::data::ids::{option_uuid_as_binary, uuid_list_as_binary};
use crate::data::user::{User, UserSummary};
use crate::error::RuleError;

pub mod db;

pub static COURSE_COLLECTION_NAME: &str = "course";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id", with = "bson::serde_helpers::uuid_1_as_binary")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub professor_id: Uuid,
    #[serde(default, with = "uuid_list_as_binary")]
    pub students_enrolled: Vec<Uuid>,
    #[serde(default, with = "option_uuid_as_binary")]
    pub assignment_id: Option<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn new(name: impl ToString, description: impl ToString, professor_id: Uuid) -> Course {
        Course {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            professor_id,
            students_enrolled: vec![],
            assignment_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_enrolled(&self, student: Uuid) -> bool {
        self.students_enrolled.contains(&student)
    }

    pub fn ensure_owner(&self, professor: Uuid) -> Result<(), RuleError> {
        if self.professor_id != professor {
            return Err(RuleError::not_authorized(
                "You are not authorized to manage this course.",
            ));
        }
        Ok(())
    }

    pub fn ensure_can_enroll(&self, student: Uuid) -> Result<(), RuleError> {
        if self.is_enrolled(student) {
            return Err(RuleError::AlreadyEnrolled);
        }
        Ok(())
    }

    /// Applies an update and detaches the linked assignment, returning its id.
    ///
    /// Every update deletes and unlinks the attached assignment, whichever
    /// fields changed.
    pub fn apply_update(&mut self, update: &CourseUpdateData) -> Option<Uuid> {
        if let Some(name) = update.course_name.as_deref().filter(|it| !it.trim().is_empty()) {
            self.name = name.trim().to_string();
        }
        if let Some(description) = update
            .course_description
            .as_deref()
            .filter(|it| !it.trim().is_empty())
        {
            self.description = description.trim().to_string();
        }

        self.assignment_id.take()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseCreateData {
    pub course_name: String,
    pub course_description: String,
    pub instructor_id: Uuid,
}

impl CourseCreateData {
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.course_name.trim().is_empty() || self.course_description.trim().is_empty() {
            return Err(RuleError::validation("All fields are required."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdateData {
    pub course_id: Uuid,
    #[serde(default)]
    pub course_name: Option<String>,
    #[serde(default)]
    pub course_description: Option<String>,
    pub instructor_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollData {
    pub course_id: Uuid,
    pub student_id: Uuid,
}

/// Course with its owner, assignment and roster expanded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub id: Uuid,
    pub course_name: String,
    pub course_description: String,
    pub professor_id: Uuid,
    pub professor: Option<UserSummary>,
    pub assignment: Option<AssignmentResponse>,
    pub students_enrolled: Vec<UserSummary>,
    pub created_at: DateTime<Utc>,
}

impl CourseResponse {
    pub fn build(
        course: Course,
        users: &HashMap<Uuid, User>,
        assignment: Option<Assignment>,
    ) -> CourseResponse {
        CourseResponse {
            id: course.id,
            course_name: course.name,
            course_description: course.description,
            professor_id: course.professor_id,
            professor: users.get(&course.professor_id).map(UserSummary::from),
            assignment: assignment.map(AssignmentResponse::from),
            students_enrolled: course
                .students_enrolled
                .iter()
                .filter_map(|id| users.get(id))
                .map(UserSummary::from)
                .collect(),
            created_at: course.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user::test_user;
    use crate::role::Role;

    fn update(name: Option<&str>, description: Option<&str>) -> CourseUpdateData {
        CourseUpdateData {
            course_id: Uuid::new_v4(),
            course_name: name.map(str::to_string),
            course_description: description.map(str::to_string),
            instructor_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn update_detaches_assignment() {
        let mut course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = Uuid::new_v4();
        course.assignment_id = Some(assignment);

        let detached = course.apply_update(&update(None, Some("Parsing and codegen")));

        assert_eq!(detached, Some(assignment));
        assert_eq!(course.assignment_id, None);
        assert_eq!(course.description, "Parsing and codegen");
        assert_eq!(course.name, "Compilers");
    }

    #[test]
    fn blank_update_fields_are_ignored() {
        let mut course = Course::new("Compilers", "Parsing", Uuid::new_v4());

        assert_eq!(course.apply_update(&update(Some(" "), None)), None);
        assert_eq!(course.name, "Compilers");
        assert_eq!(course.description, "Parsing");
    }

    #[test]
    fn enrollment_is_unique() {
        let mut course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let student = Uuid::new_v4();

        assert!(course.ensure_can_enroll(student).is_ok());
        course.students_enrolled.push(student);
        assert_eq!(
            course.ensure_can_enroll(student),
            Err(RuleError::AlreadyEnrolled)
        );
    }

    #[test]
    fn only_owner_manages_course() {
        let owner = Uuid::new_v4();
        let course = Course::new("Compilers", "Parsing", owner);

        assert!(course.ensure_owner(owner).is_ok());
        assert!(matches!(
            course.ensure_owner(Uuid::new_v4()),
            Err(RuleError::NotAuthorized(_))
        ));
    }

    #[test]
    fn response_expands_known_users_in_roster_order() {
        let professor = test_user("Prof", Role::Professor);
        let first = test_user("First", Role::Student);
        let second = test_user("Second", Role::Student);

        let mut course = Course::new("Compilers", "Parsing", professor.id);
        course.students_enrolled = vec![second.id, Uuid::new_v4(), first.id];

        let users: HashMap<Uuid, User> = [professor.clone(), first.clone(), second.clone()]
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let response = CourseResponse::build(course, &users, None);

        assert_eq!(response.professor.map(|p| p.id), Some(professor.id));
        let roster: Vec<Uuid> = response.students_enrolled.iter().map(|s| s.id).collect();
        assert_eq!(roster, vec![second.id, first.id]);
        assert!(response.assignment.is_none());
    }
}
