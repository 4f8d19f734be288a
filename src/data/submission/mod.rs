use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::assignment::{Assignment, SubmissionMode};
use crate::data::group::{Group, GroupResponse};
use crate::data::user::{User, UserSummary};
use crate::error::RuleError;

pub mod db;

pub static ACKNOWLEDGMENT_COLLECTION_NAME: &str = "acknowledgment";

/// Record of a student handing in an assignment.
///
/// Group submissions also store one for the leader, next to the group's own
/// `submitted` flag. Nothing ties the two writes together, so readers check
/// both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acknowledgment {
    #[serde(rename = "_id", with = "bson::serde_helpers::uuid_1_as_binary")]
    pub id: Uuid,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub assignment_id: Uuid,
    #[serde(with = "bson::serde_helpers::uuid_1_as_binary")]
    pub student_id: Uuid,
    #[serde(default)]
    pub acknowledged: bool,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Acknowledgment {
    pub fn submitted_now(assignment: Uuid, student: Uuid) -> Acknowledgment {
        Acknowledgment {
            id: Uuid::new_v4(),
            assignment_id: assignment,
            student_id: student,
            acknowledged: true,
            timestamp: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgmentResponse {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub acknowledged: bool,
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<Acknowledgment> for AcknowledgmentResponse {
    fn from(ack: Acknowledgment) -> Self {
        AcknowledgmentResponse {
            id: ack.id,
            assignment_id: ack.assignment_id,
            student_id: ack.student_id,
            acknowledged: ack.acknowledged,
            timestamp: ack.timestamp,
        }
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone)]
pub enum Submission {
    Individual(Acknowledgment),
    Group(Group),
}

pub fn authorize_individual_submission(existing: Option<&Acknowledgment>) -> Result<(), RuleError> {
    match existing {
        Some(ack) if ack.acknowledged => Err(RuleError::AlreadySubmitted),
        _ => Ok(()),
    }
}

/// Checks that `user` may hand in for `group`, returning the group.
pub fn authorize_group_submission(group: Option<Group>, user: Uuid) -> Result<Group, RuleError> {
    let group = group.ok_or(RuleError::NotInGroup)?;
    if group.leader_id != user {
        return Err(RuleError::NotGroupLeader);
    }
    if group.submitted {
        return Err(RuleError::AlreadySubmitted);
    }
    Ok(group)
}

/// Either marker counts: the group flag or an acknowledgment from its leader.
#[inline]
pub fn group_submitted(group: &Group, leader_acknowledged: bool) -> bool {
    group.submitted || leader_acknowledged
}

/// Percentage of `submitted` out of `total`, rounded half up. Zero when there
/// is nothing to submit.
pub fn completion_rate(submitted: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let submitted = submitted.min(total) as u64;
    let total = total as u64;
    ((200 * submitted + total) / (2 * total)) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmittedStudent {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedGroup {
    pub group_name: String,
    pub leader: String,
    /// Members as "First Last (email)".
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SubmittedEntry {
    Student(SubmittedStudent),
    Group(SubmittedGroup),
}

/// Professor facing submission statistics of one assignment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub assignment_id: Uuid,
    pub assignment_name: String,
    pub description: String,
    pub submission_type: String,
    pub deadline: DateTime<Utc>,
    pub drive_link: Option<String>,
    pub total_entities: usize,
    pub submitted_entities: usize,
    pub completion_rate: u32,
    pub submitted_list: Vec<SubmittedEntry>,
}

impl AssignmentSummary {
    fn new(
        assignment: &Assignment,
        total: usize,
        submitted: usize,
        submitted_list: Vec<SubmittedEntry>,
    ) -> AssignmentSummary {
        AssignmentSummary {
            assignment_id: assignment.id,
            assignment_name: assignment.name.clone(),
            description: assignment.description.clone(),
            submission_type: assignment.submission_type.to_string(),
            deadline: assignment.deadline,
            drive_link: assignment.drive_link.clone(),
            total_entities: total,
            submitted_entities: submitted,
            completion_rate: completion_rate(submitted, total),
            submitted_list,
        }
    }

    /// Summary of an assignment whose stored mode is not understood.
    pub fn unsupported(assignment: &Assignment) -> AssignmentSummary {
        AssignmentSummary::new(assignment, 0, 0, vec![])
    }

    /// Counts acknowledgments of an individual assignment.
    pub fn individual(
        assignment: &Assignment,
        acknowledgments: &[Acknowledgment],
        users: &HashMap<Uuid, User>,
    ) -> AssignmentSummary {
        let submitted: Vec<&Acknowledgment> =
            acknowledgments.iter().filter(|ack| ack.acknowledged).collect();

        let list = submitted
            .iter()
            .filter_map(|ack| users.get(&ack.student_id))
            .map(|student| {
                SubmittedEntry::Student(SubmittedStudent {
                    name: student.name(),
                    email: student.email.clone(),
                })
            })
            .collect();

        AssignmentSummary::new(assignment, acknowledgments.len(), submitted.len(), list)
    }

    /// Counts groups of a group assignment.
    pub fn groups(
        assignment: &Assignment,
        groups: &[Group],
        users: &HashMap<Uuid, User>,
    ) -> AssignmentSummary {
        let submitted: Vec<&Group> = groups.iter().filter(|group| group.submitted).collect();

        let list = submitted
            .iter()
            .map(|group| {
                SubmittedEntry::Group(SubmittedGroup {
                    group_name: group.name.clone(),
                    leader: users
                        .get(&group.leader_id)
                        .map(User::name)
                        .unwrap_or_default(),
                    members: group
                        .member_ids
                        .iter()
                        .filter_map(|id| users.get(id))
                        .map(|member| format!("{} ({})", member.name(), member.email))
                        .collect(),
                })
            })
            .collect();

        AssignmentSummary::new(assignment, groups.len(), submitted.len(), list)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseSubmissionStatus {
    pub course_name: String,
    pub assignments: Vec<AssignmentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum SubmissionDetails {
    Acknowledgment(AcknowledgmentResponse),
    Group(GroupResponse),
}

/// Whether the caller has handed in an assignment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionCheck {
    pub assignment_id: Uuid,
    pub is_submitted: bool,
    pub submission_details: Option<SubmissionDetails>,
}

impl SubmissionCheck {
    pub fn message(&self) -> &'static str {
        if self.is_submitted {
            "Assignment already submitted."
        } else {
            "Assignment not yet submitted."
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgmentStatus {
    pub acknowledged: bool,
    pub timestamp: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<UserSummary>,
}

/// One assignment of a course as a student sees it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentAssignment {
    pub assignment_id: Uuid,
    pub assignment_name: String,
    pub description: String,
    pub deadline: DateTime<Utc>,
    pub drive_link: Option<String>,
    pub submission_type: String,
    pub acknowledgment_status: AcknowledgmentStatus,
    pub group_info: Option<GroupResponse>,
    pub message: String,
}

pub static NO_GROUP_HINT: &str =
    "You are not part of any group. Form or join one to submit this assignment.";

impl StudentAssignment {
    /// `ack` is the student's own acknowledgment for individual assignments
    /// and the group leader's for group assignments.
    pub fn build(
        assignment: &Assignment,
        ack: Option<&Acknowledgment>,
        group: Option<GroupResponse>,
    ) -> StudentAssignment {
        let acknowledged = ack.map(|it| it.acknowledged).unwrap_or(false);
        let timestamp = ack.and_then(|it| it.timestamp);

        let (acknowledgment_status, message) = match assignment.submission_type.mode() {
            Ok(SubmissionMode::Group) => match &group {
                Some(group) => (
                    AcknowledgmentStatus {
                        acknowledged: group.submitted || acknowledged,
                        timestamp,
                        acknowledged_by: group.leader.clone(),
                    },
                    String::new(),
                ),
                None => (
                    AcknowledgmentStatus {
                        acknowledged: false,
                        timestamp: None,
                        acknowledged_by: None,
                    },
                    NO_GROUP_HINT.to_string(),
                ),
            },
            Ok(SubmissionMode::Individual) => (
                AcknowledgmentStatus {
                    acknowledged,
                    timestamp,
                    acknowledged_by: None,
                },
                String::new(),
            ),
            Err(e) => (
                AcknowledgmentStatus {
                    acknowledged: false,
                    timestamp: None,
                    acknowledged_by: None,
                },
                e.to_string(),
            ),
        };

        StudentAssignment {
            assignment_id: assignment.id,
            assignment_name: assignment.name.clone(),
            description: assignment.description.clone(),
            deadline: assignment.deadline,
            drive_link: assignment.drive_link.clone(),
            submission_type: assignment.submission_type.to_string(),
            acknowledgment_status,
            group_info: group,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::assignment::{test_assignment, SubmissionType};
    use crate::data::course::Course;
    use crate::data::group::test_group;
    use crate::data::user::test_user;
    use crate::role::Role;

    fn users(list: &[&User]) -> HashMap<Uuid, User> {
        list.iter().map(|u| (u.id, (*u).clone())).collect()
    }

    #[test]
    fn completion_rate_rounds_half_up() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(0, 4), 0);
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(1, 8), 13);
        assert_eq!(completion_rate(1, 2), 50);
        assert_eq!(completion_rate(5, 5), 100);
    }

    #[test]
    fn completion_rate_stays_in_range() {
        for total in 0..40 {
            for submitted in 0..=total {
                assert!(completion_rate(submitted, total) <= 100);
            }
        }
        assert_eq!(completion_rate(7, 3), 100);
    }

    #[test]
    fn individual_submit_twice_is_rejected() {
        let (assignment, student) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(authorize_individual_submission(None).is_ok());

        let ack = Acknowledgment::submitted_now(assignment, student);
        assert!(ack.acknowledged);
        assert_eq!(
            authorize_individual_submission(Some(&ack)),
            Err(RuleError::AlreadySubmitted)
        );

        let pending = Acknowledgment {
            acknowledged: false,
            ..ack
        };
        assert!(authorize_individual_submission(Some(&pending)).is_ok());
    }

    #[test]
    fn only_the_leader_submits_once() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = test_assignment(&course, SubmissionMode::Group);
        let (leader, member) = (Uuid::new_v4(), Uuid::new_v4());
        let group = test_group(&assignment, leader, &[member]);

        assert_eq!(
            authorize_group_submission(None, leader).unwrap_err(),
            RuleError::NotInGroup
        );
        assert_eq!(
            authorize_group_submission(Some(group.clone()), member).unwrap_err(),
            RuleError::NotGroupLeader
        );

        let mut accepted = authorize_group_submission(Some(group), leader).unwrap();
        accepted.submitted = true;
        assert_eq!(
            authorize_group_submission(Some(accepted), leader).unwrap_err(),
            RuleError::AlreadySubmitted
        );
    }

    #[test]
    fn either_marker_means_group_submitted() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = test_assignment(&course, SubmissionMode::Group);
        let mut group = test_group(&assignment, Uuid::new_v4(), &[]);

        assert!(!group_submitted(&group, false));
        assert!(group_submitted(&group, true));
        group.submitted = true;
        assert!(group_submitted(&group, false));
    }

    #[test]
    fn individual_summary_lists_submitters() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = test_assignment(&course, SubmissionMode::Individual);
        let ada = test_user("Ada", Role::Student);
        let bob = test_user("Bob", Role::Student);
        let cy = test_user("Cy", Role::Student);

        let acks = vec![
            Acknowledgment::submitted_now(assignment.id, ada.id),
            Acknowledgment {
                acknowledged: false,
                ..Acknowledgment::submitted_now(assignment.id, bob.id)
            },
            Acknowledgment::submitted_now(assignment.id, cy.id),
        ];

        let summary = AssignmentSummary::individual(&assignment, &acks, &users(&[&ada, &bob, &cy]));

        assert_eq!(summary.total_entities, 3);
        assert_eq!(summary.submitted_entities, 2);
        assert_eq!(summary.completion_rate, 67);
        assert_eq!(summary.submission_type, "Individual");
        assert_eq!(
            summary.submitted_list,
            vec![
                SubmittedEntry::Student(SubmittedStudent {
                    name: "Ada Tester".to_string(),
                    email: "ada@example.com".to_string(),
                }),
                SubmittedEntry::Student(SubmittedStudent {
                    name: "Cy Tester".to_string(),
                    email: "cy@example.com".to_string(),
                }),
            ]
        );
    }

    #[test]
    fn group_summary_lists_submitted_groups() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = test_assignment(&course, SubmissionMode::Group);
        let ada = test_user("Ada", Role::Student);
        let bob = test_user("Bob", Role::Student);
        let cy = test_user("Cy", Role::Student);

        let mut done = test_group(&assignment, ada.id, &[bob.id]);
        done.submitted = true;
        let pending = test_group(&assignment, cy.id, &[]);

        let summary =
            AssignmentSummary::groups(&assignment, &[done, pending], &users(&[&ada, &bob, &cy]));

        assert_eq!(summary.total_entities, 2);
        assert_eq!(summary.submitted_entities, 1);
        assert_eq!(summary.completion_rate, 50);
        assert_eq!(
            summary.submitted_list,
            vec![SubmittedEntry::Group(SubmittedGroup {
                group_name: "Team".to_string(),
                leader: "Ada Tester".to_string(),
                members: vec![
                    "Bob Tester (bob@example.com)".to_string(),
                    "Ada Tester (ada@example.com)".to_string(),
                ],
            })]
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["submittedList"][0]["groupName"], "Team");
        assert_eq!(json["completionRate"], 50);
    }

    #[test]
    fn empty_assignments_have_zero_rate() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = test_assignment(&course, SubmissionMode::Group);

        let summary = AssignmentSummary::groups(&assignment, &[], &HashMap::new());
        assert_eq!(summary.completion_rate, 0);
        assert!(summary.submitted_list.is_empty());
    }

    #[test]
    fn student_view_hints_missing_group() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = test_assignment(&course, SubmissionMode::Group);

        let view = StudentAssignment::build(&assignment, None, None);
        assert!(!view.acknowledgment_status.acknowledged);
        assert_eq!(view.message, NO_GROUP_HINT);
        assert!(view.group_info.is_none());
    }

    #[test]
    fn student_view_reports_individual_acknowledgment() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let assignment = test_assignment(&course, SubmissionMode::Individual);
        let ack = Acknowledgment::submitted_now(assignment.id, Uuid::new_v4());

        let view = StudentAssignment::build(&assignment, Some(&ack), None);
        assert!(view.acknowledgment_status.acknowledged);
        assert_eq!(view.acknowledgment_status.timestamp, ack.timestamp);
        assert!(view.message.is_empty());
    }

    #[test]
    fn student_view_flags_unknown_modes() {
        let course = Course::new("Compilers", "Parsing", Uuid::new_v4());
        let mut assignment = test_assignment(&course, SubmissionMode::Individual);
        assignment.submission_type = SubmissionType::Unrecognized("online".to_string());

        let view = StudentAssignment::build(&assignment, None, None);
        assert_eq!(view.submission_type, "online");
        assert!(!view.message.is_empty());
    }
}
