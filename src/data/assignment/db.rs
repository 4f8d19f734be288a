use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::course::db::CourseDbExt;
use crate::data::filter;
use crate::error::{DataResult, Entity, RuleError};

use super::{ensure_can_attach, Assignment, AssignmentCreateData, ASSIGNMENT_COLLECTION_NAME};

pub trait AssignmentDbExt {
    /// Creates the single assignment of a course owned by `professor`.
    async fn create_assignment(
        &self,
        data: AssignmentCreateData,
        professor: Uuid,
    ) -> DataResult<Assignment>;

    async fn get_assignment(&self, id: Uuid) -> DataResult<Option<Assignment>>;

    async fn require_assignment(&self, id: Uuid) -> DataResult<Assignment>;

    async fn assignments_for_course(&self, course: Uuid) -> DataResult<Vec<Assignment>>;

    async fn delete_assignment(&self, id: Uuid) -> DataResult<Option<Assignment>>;
}

impl AssignmentDbExt for Database {
    async fn create_assignment(
        &self,
        data: AssignmentCreateData,
        professor: Uuid,
    ) -> DataResult<Assignment> {
        let course = self.require_course(data.course_id).await?;
        ensure_can_attach(&course, professor)?;

        let assignment = Assignment::for_course(data);

        self.collection::<Assignment>(ASSIGNMENT_COLLECTION_NAME)
            .insert_one(&assignment, None)
            .await?;

        // Not transactional: a failure here leaves an unlinked assignment behind.
        self.set_course_assignment(course.id, Some(assignment.id))
            .await?;

        tracing::info!(
            "Assignment {} attached to course {}",
            assignment.id,
            course.id
        );

        Ok(assignment)
    }

    async fn get_assignment(&self, id: Uuid) -> DataResult<Option<Assignment>> {
        Ok(self
            .collection::<Assignment>(ASSIGNMENT_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn require_assignment(&self, id: Uuid) -> DataResult<Assignment> {
        self.get_assignment(id)
            .await?
            .ok_or_else(|| RuleError::NotFound(Entity::Assignment, id).into())
    }

    async fn assignments_for_course(&self, course: Uuid) -> DataResult<Vec<Assignment>> {
        Ok(self
            .collection::<Assignment>(ASSIGNMENT_COLLECTION_NAME)
            .find(filter::by_field("course_id", course), None)
            .await?
            .try_collect()
            .await?)
    }

    async fn delete_assignment(&self, id: Uuid) -> DataResult<Option<Assignment>> {
        Ok(self
            .collection::<Assignment>(ASSIGNMENT_COLLECTION_NAME)
            .find_one_and_delete(filter::by_id(id), None)
            .await?)
    }
}
