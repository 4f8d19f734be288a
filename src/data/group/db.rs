use bson::doc;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::assignment::db::AssignmentDbExt;
use crate::data::course::db::CourseDbExt;
use crate::data::filter;
use crate::data::user::db::UserDbExt;
use crate::data::user::UserSummary;
use crate::error::DataResult;

use super::{eligible_students, form_group, Group, GroupCreateData, GroupResponse, GROUP_COLLECTION_NAME};

pub trait GroupDbExt {
    /// Forms a new group for an assignment, led by `creator`.
    async fn create_group(&self, data: GroupCreateData, creator: Uuid) -> DataResult<Group>;

    async fn groups_for_assignment(&self, assignment: Uuid) -> DataResult<Vec<Group>>;

    /// Group of an assignment which `user` leads or belongs to.
    async fn group_of_user(&self, assignment: Uuid, user: Uuid) -> DataResult<Option<Group>>;

    async fn mark_group_submitted(&self, group: Uuid) -> DataResult<()>;

    /// Enrolled students of the assignment's course not yet in any of its groups.
    async fn eligible_for_group(&self, assignment: Uuid) -> DataResult<Vec<UserSummary>>;

    async fn expand_group(&self, group: Group) -> DataResult<GroupResponse>;
}

impl GroupDbExt for Database {
    async fn create_group(&self, data: GroupCreateData, creator: Uuid) -> DataResult<Group> {
        let assignment = self.require_assignment(data.assignment_id).await?;
        let course = self.require_course(assignment.course_id).await?;
        let existing = self.groups_for_assignment(assignment.id).await?;

        let group = form_group(&assignment, &course, &existing, &data, creator)?;

        self.collection::<Group>(GROUP_COLLECTION_NAME)
            .insert_one(&group, None)
            .await?;

        tracing::info!(
            "Group {} formed for assignment {} with {} members",
            group.id,
            assignment.id,
            group.member_ids.len()
        );
        Ok(group)
    }

    async fn groups_for_assignment(&self, assignment: Uuid) -> DataResult<Vec<Group>> {
        Ok(self
            .collection::<Group>(GROUP_COLLECTION_NAME)
            .find(filter::by_field("assignment_id", assignment), None)
            .await?
            .try_collect()
            .await?)
    }

    async fn group_of_user(&self, assignment: Uuid, user: Uuid) -> DataResult<Option<Group>> {
        Ok(self
            .collection::<Group>(GROUP_COLLECTION_NAME)
            .find_one(filter::group_of(assignment, user), None)
            .await?)
    }

    async fn mark_group_submitted(&self, group: Uuid) -> DataResult<()> {
        self.collection::<Group>(GROUP_COLLECTION_NAME)
            .update_one(
                filter::by_id(group),
                doc! { "$set": { "submitted": true } },
                None,
            )
            .await?;
        Ok(())
    }

    async fn eligible_for_group(&self, assignment: Uuid) -> DataResult<Vec<UserSummary>> {
        let assignment = self.require_assignment(assignment).await?;
        let course = self.require_course(assignment.course_id).await?;
        let groups = self.groups_for_assignment(assignment.id).await?;

        let eligible = eligible_students(&course, &groups);
        let users = self.get_users(&eligible).await?;

        Ok(eligible
            .iter()
            .filter_map(|id| users.get(id))
            .map(UserSummary::from)
            .collect())
    }

    async fn expand_group(&self, group: Group) -> DataResult<GroupResponse> {
        let ids: Vec<Uuid> = group.students().collect();
        let users = self.get_users(&ids).await?;
        Ok(GroupResponse::build(group, &users))
    }
}
