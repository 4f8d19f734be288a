use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::assignment::{Assignment, SubmissionMode};
use crate::data::course::Course;
use crate::data::ids::uuid_list_as_binary;
use crate::data::user::{User, UserSummary};
use crate::error::RuleError;
use crate::util::dedup_preserving_order;

pub mod db;

pub static GROUP_COLLECTION_NAME: &str = "group";

/// Team of students working on one group assignment. The creator leads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id", with = "bson::serde_helpers::uuid_1_as_binary")]
    pub id: Uuid,
    pub name: String,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub assignment_id: Uuid,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub leader_id: Uuid,
    #[serde(with = "uuid_list_as_binary")]
    pub member_ids: Vec<Uuid>,
    #[serde(default)]
    pub submitted: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn includes(&self, user: Uuid) -> bool {
        self.leader_id == user || self.member_ids.contains(&user)
    }

    /// Every student placed in this group, leader included.
    pub fn students(&self) -> impl Iterator<Item = Uuid> + '_ {
        std::iter::once(self.leader_id).chain(
            self.member_ids
                .iter()
                .copied()
                .filter(move |id| *id != self.leader_id),
        )
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupCreateData {
    pub group_name: String,
    pub member_ids: Vec<Uuid>,
    pub assignment_id: Uuid,
}

/// Checks the formation rules and builds the new group led by `creator`.
///
/// `existing` must hold every group already formed for the assignment.
pub fn form_group(
    assignment: &Assignment,
    course: &Course,
    existing: &[Group],
    data: &GroupCreateData,
    creator: Uuid,
) -> Result<Group, RuleError> {
    let name = data.group_name.trim();
    if name.is_empty() {
        return Err(RuleError::validation("Group name is required."));
    }

    if assignment.submission_type.mode()? != SubmissionMode::Group {
        return Err(RuleError::WrongSubmissionMode);
    }

    let mut members = dedup_preserving_order(data.member_ids.iter().copied());
    if !members.contains(&creator) {
        members.push(creator);
    }

    let not_enrolled: Vec<Uuid> = members
        .iter()
        .copied()
        .filter(|id| !course.is_enrolled(*id))
        .collect();
    if !not_enrolled.is_empty() {
        return Err(RuleError::MemberNotEnrolled(not_enrolled));
    }

    let grouped: Vec<Uuid> = members
        .iter()
        .copied()
        .filter(|id| existing.iter().any(|group| group.includes(*id)))
        .collect();
    if !grouped.is_empty() {
        return Err(RuleError::MemberAlreadyGrouped(grouped));
    }

    Ok(Group {
        id: Uuid::new_v4(),
        name: name.to_string(),
        assignment_id: assignment.id,
        leader_id: creator,
        member_ids: members,
        submitted: false,
        created_at: Utc::now(),
    })
}

/// Enrolled students of `course` not yet placed in any of `groups`, in enrollment order.
pub fn eligible_students(course: &Course, groups: &[Group]) -> Vec<Uuid> {
    course
        .students_enrolled
        .iter()
        .copied()
        .filter(|id| !groups.iter().any(|group| group.includes(*id)))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: Uuid,
    pub group_name: String,
    pub assignment_id: Uuid,
    pub leader: Option<UserSummary>,
    pub members: Vec<UserSummary>,
    pub submitted: bool,
    pub created_at: DateTime<Utc>,
}

impl GroupResponse {
    pub fn build(group: Group, users: &HashMap<Uuid, User>) -> GroupResponse {
        GroupResponse {
            id: group.id,
            group_name: group.name.clone(),
            assignment_id: group.assignment_id,
            leader: users.get(&group.leader_id).map(UserSummary::from),
            members: group
                .member_ids
                .iter()
                .filter_map(|id| users.get(id))
                .map(UserSummary::from)
                .collect(),
            submitted: group.submitted,
            created_at: group.created_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_group(assignment: &Assignment, leader: Uuid, members: &[Uuid]) -> Group {
    let mut member_ids = members.to_vec();
    if !member_ids.contains(&leader) {
        member_ids.push(leader);
    }
    Group {
        id: Uuid::new_v4(),
        name: "Team".to_string(),
        assignment_id: assignment.id,
        leader_id: leader,
        member_ids,
        submitted: false,
        created_at: Utc::now(),
    }
}
