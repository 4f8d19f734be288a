use mongodb::Database;
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use crate::data::assignment::db::AssignmentDbExt;
use crate::data::assignment::{Assignment, SubmissionMode};
use crate::data::course::db::CourseDbExt;
use crate::data::filter;
use crate::data::group::db::GroupDbExt;
use crate::data::user::db::UserDbExt;
use crate::error::DataResult;

use super::{
    authorize_group_submission, authorize_individual_submission, group_submitted,
    Acknowledgment, AssignmentSummary, CourseSubmissionStatus, StudentAssignment, Submission,
    SubmissionCheck, SubmissionDetails, ACKNOWLEDGMENT_COLLECTION_NAME,
};

pub trait SubmissionDbExt {
    /// Hands in an assignment for `user`, alone or on behalf of their group.
    async fn submit_assignment(&self, assignment: Uuid, user: Uuid) -> DataResult<Submission>;

    async fn find_acknowledgment(
        &self,
        assignment: Uuid,
        student: Uuid,
    ) -> DataResult<Option<Acknowledgment>>;

    async fn acknowledgments_for_assignment(
        &self,
        assignment: Uuid,
    ) -> DataResult<Vec<Acknowledgment>>;

    /// Submission statistics of every assignment of a course.
    async fn course_submission_status(&self, course: Uuid) -> DataResult<CourseSubmissionStatus>;

    async fn check_submitted(&self, assignment: Uuid, user: Uuid) -> DataResult<SubmissionCheck>;

    /// Assignments of a course with the submission state of `student`.
    async fn student_assignments(
        &self,
        course: Uuid,
        student: Uuid,
    ) -> DataResult<Vec<StudentAssignment>>;
}

impl SubmissionDbExt for Database {
    async fn submit_assignment(&self, assignment: Uuid, user: Uuid) -> DataResult<Submission> {
        let assignment = self.require_assignment(assignment).await?;
        let acknowledgments = self.collection::<Acknowledgment>(ACKNOWLEDGMENT_COLLECTION_NAME);

        match assignment.submission_type.mode()? {
            SubmissionMode::Individual => {
                let existing = self.find_acknowledgment(assignment.id, user).await?;
                authorize_individual_submission(existing.as_ref())?;

                let ack = Acknowledgment::submitted_now(assignment.id, user);
                acknowledgments.insert_one(&ack, None).await?;

                tracing::info!("Student {} submitted assignment {}", user, assignment.id);
                Ok(Submission::Individual(ack))
            }
            SubmissionMode::Group => {
                let group = self.group_of_user(assignment.id, user).await?;
                let mut group = authorize_group_submission(group, user)?;

                self.mark_group_submitted(group.id).await?;
                group.submitted = true;

                acknowledgments
                    .insert_one(&Acknowledgment::submitted_now(assignment.id, user), None)
                    .await?;

                tracing::info!(
                    "Group {} submitted assignment {} through leader {}",
                    group.id,
                    assignment.id,
                    user
                );
                Ok(Submission::Group(group))
            }
        }
    }

    async fn find_acknowledgment(
        &self,
        assignment: Uuid,
        student: Uuid,
    ) -> DataResult<Option<Acknowledgment>> {
        Ok(self
            .collection::<Acknowledgment>(ACKNOWLEDGMENT_COLLECTION_NAME)
            .find_one(filter::acknowledged(assignment, student), None)
            .await?)
    }

    async fn acknowledgments_for_assignment(
        &self,
        assignment: Uuid,
    ) -> DataResult<Vec<Acknowledgment>> {
        Ok(self
            .collection::<Acknowledgment>(ACKNOWLEDGMENT_COLLECTION_NAME)
            .find(filter::by_field("assignment_id", assignment), None)
            .await?
            .try_collect()
            .await?)
    }

    async fn course_submission_status(&self, course: Uuid) -> DataResult<CourseSubmissionStatus> {
        let course = self.require_course(course).await?;
        let assignments = self.assignments_for_course(course.id).await?;

        let mut summaries = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            summaries.push(self.summarize_assignment(assignment).await?);
        }

        Ok(CourseSubmissionStatus {
            course_name: course.name,
            assignments: summaries,
        })
    }

    async fn check_submitted(&self, assignment: Uuid, user: Uuid) -> DataResult<SubmissionCheck> {
        let assignment = self.require_assignment(assignment).await?;

        let (is_submitted, details) = match assignment.submission_type.mode()? {
            SubmissionMode::Individual => match self.find_acknowledgment(assignment.id, user).await? {
                Some(ack) => (
                    true,
                    Some(SubmissionDetails::Acknowledgment(ack.into())),
                ),
                None => (false, None),
            },
            SubmissionMode::Group => match self.group_of_user(assignment.id, user).await? {
                Some(group) => {
                    let leader_acknowledged = !group.submitted
                        && self
                            .find_acknowledgment(assignment.id, group.leader_id)
                            .await?
                            .is_some();

                    if group_submitted(&group, leader_acknowledged) {
                        let group = self.expand_group(group).await?;
                        (true, Some(SubmissionDetails::Group(group)))
                    } else {
                        (false, None)
                    }
                }
                None => (false, None),
            },
        };

        Ok(SubmissionCheck {
            assignment_id: assignment.id,
            is_submitted,
            submission_details: details,
        })
    }

    async fn student_assignments(
        &self,
        course: Uuid,
        student: Uuid,
    ) -> DataResult<Vec<StudentAssignment>> {
        let course = self.require_course(course).await?;
        let assignments = self.assignments_for_course(course.id).await?;

        let mut views = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let view = match assignment.submission_type.mode() {
                Ok(SubmissionMode::Group) => {
                    match self.group_of_user(assignment.id, student).await? {
                        Some(group) => {
                            let ack = self
                                .find_acknowledgment(assignment.id, group.leader_id)
                                .await?;
                            let group = self.expand_group(group).await?;
                            StudentAssignment::build(assignment, ack.as_ref(), Some(group))
                        }
                        None => StudentAssignment::build(assignment, None, None),
                    }
                }
                Ok(SubmissionMode::Individual) => {
                    let ack = self.find_acknowledgment(assignment.id, student).await?;
                    StudentAssignment::build(assignment, ack.as_ref(), None)
                }
                Err(_) => StudentAssignment::build(assignment, None, None),
            };
            views.push(view);
        }

        Ok(views)
    }
}

trait SummaryExt {
    async fn summarize_assignment(&self, assignment: &Assignment) -> DataResult<AssignmentSummary>;
}

impl SummaryExt for Database {
    async fn summarize_assignment(&self, assignment: &Assignment) -> DataResult<AssignmentSummary> {
        match assignment.submission_type.mode() {
            Ok(SubmissionMode::Individual) => {
                let acks = self.acknowledgments_for_assignment(assignment.id).await?;
                let ids: Vec<Uuid> = acks.iter().map(|ack| ack.student_id).collect();
                let users = self.get_users(&ids).await?;
                Ok(AssignmentSummary::individual(assignment, &acks, &users))
            }
            Ok(SubmissionMode::Group) => {
                let groups = self.groups_for_assignment(assignment.id).await?;
                let ids: Vec<Uuid> = groups.iter().flat_map(|group| group.students()).collect();
                let users = self.get_users(&ids).await?;
                Ok(AssignmentSummary::groups(assignment, &groups, &users))
            }
            Err(_) => Ok(AssignmentSummary::unsupported(assignment)),
        }
    }
}
