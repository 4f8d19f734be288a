use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::assignment::db::AssignmentDbExt;
use crate::data::assignment::{AssignmentCreateData, AssignmentResponse};
use crate::data::group::db::GroupDbExt;
use crate::data::group::GroupResponse;
use crate::data::submission::db::SubmissionDbExt;
use crate::data::submission::{
    AcknowledgmentResponse, CourseSubmissionStatus, StudentAssignment, Submission, SubmissionCheck,
};
use crate::resp::jwt::{ProfessorToken, StudentToken};
use crate::resp::problem::Problem;
use crate::resp::ApiResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentPayload {
    pub assignment: AssignmentResponse,
}

/// Either the acknowledgment of an individual submission or the submitted group.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledgment: Option<AcknowledgmentResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StudentAssignmentsPayload {
    pub assignments: Vec<StudentAssignment>,
}

/// Attach the assignment of a course
#[utoipa::path(
    request_body = AssignmentCreateData,
    responses(
        (status = 201, description = "Assignment created", body = AssignmentPayload),
        (status = 400, description = "Course already has an assignment", body = Problem),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 403, description = "Caller doesn't own the course", body = Problem),
        (status = 404, description = "Course doesn't exist", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[post("/assignment", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn assignment_create(
    data: Json<AssignmentCreateData>,
    auth: ProfessorToken,
    db: &State<Database>,
) -> Result<(Status, Json<ApiResponse<AssignmentPayload>>), Problem> {
    data.validate()?;

    let assignment = db.create_assignment(data.into_inner(), auth.0.user).await?;

    Ok((
        Status::Created,
        ApiResponse::ok(
            "Assignment created successfully.",
            AssignmentPayload {
                assignment: assignment.into(),
            },
        ),
    ))
}

/// Hand in an assignment
///
/// Individual assignments are acknowledged per student. Group assignments
/// can only be handed in by the group leader.
#[utoipa::path(
    params(
        ("assignment_id", description = "assignment ID")
    ),
    responses(
        (status = 200, description = "Assignment submitted", body = SubmitPayload),
        (status = 400, description = "Already submitted or not in a group", body = Problem),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 403, description = "Caller is not a student or not the group leader", body = Problem),
        (status = 404, description = "Assignment doesn't exist", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[post("/assignment/submit/<assignment_id>")]
#[tracing::instrument(skip(db))]
pub async fn assignment_submit(
    assignment_id: Uuid,
    auth: StudentToken,
    db: &State<Database>,
) -> Result<Json<ApiResponse<SubmitPayload>>, Problem> {
    let response = match db.submit_assignment(assignment_id, auth.0.user).await? {
        Submission::Individual(ack) => ApiResponse::ok(
            "Assignment submitted successfully (Individual).",
            SubmitPayload {
                acknowledgment: Some(ack.into()),
                group: None,
            },
        ),
        Submission::Group(group) => ApiResponse::ok(
            "Group assignment submitted successfully by leader.",
            SubmitPayload {
                acknowledgment: None,
                group: Some(db.expand_group(group).await?),
            },
        ),
    };

    Ok(response)
}

/// Submission statistics of a course's assignments
#[utoipa::path(
    params(
        ("course_id", description = "course ID")
    ),
    responses(
        (status = 200, description = "Completion of every assignment", body = CourseSubmissionStatus),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 403, description = "Caller is not a professor", body = Problem),
        (status = 404, description = "Course doesn't exist", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[get("/assignment/forCourse/<course_id>")]
#[tracing::instrument(skip(db))]
pub async fn assignment_course_status(
    course_id: Uuid,
    _auth: ProfessorToken,
    db: &State<Database>,
) -> Result<Json<ApiResponse<CourseSubmissionStatus>>, Problem> {
    let status = db.course_submission_status(course_id).await?;

    Ok(ApiResponse::ok("Assignments fetched successfully.", status))
}

/// Whether the caller has handed in an assignment
#[utoipa::path(
    params(
        ("assignment_id", description = "assignment ID")
    ),
    responses(
        (status = 200, description = "Submission state of the caller", body = SubmissionCheck),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 403, description = "Caller is not a student", body = Problem),
        (status = 404, description = "Assignment doesn't exist", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[get("/assignment/submitted/<assignment_id>")]
#[tracing::instrument(skip(db))]
pub async fn assignment_submitted(
    assignment_id: Uuid,
    auth: StudentToken,
    db: &State<Database>,
) -> Result<Json<ApiResponse<SubmissionCheck>>, Problem> {
    let check = db.check_submitted(assignment_id, auth.0.user).await?;

    Ok(ApiResponse::ok(check.message(), check))
}

/// Assignments of a course with the caller's submission state
#[utoipa::path(
    params(
        ("course_id", description = "course ID")
    ),
    responses(
        (status = 200, description = "Assignments as the caller sees them", body = StudentAssignmentsPayload),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 403, description = "Caller is not a student", body = Problem),
        (status = 404, description = "Course doesn't exist", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[get("/assignment/forStudent/<course_id>")]
#[tracing::instrument(skip(db))]
pub async fn assignment_student_list(
    course_id: Uuid,
    auth: StudentToken,
    db: &State<Database>,
) -> Result<Json<ApiResponse<StudentAssignmentsPayload>>, Problem> {
    let assignments = db.student_assignments(course_id, auth.0.user).await?;

    Ok(ApiResponse::ok(
        "Assignments fetched successfully.",
        StudentAssignmentsPayload { assignments },
    ))
}

#[cfg(test)]
mod assignment_endpoints {
    use rocket::http::{ContentType, Status};
    use serde_json::json;
    use uuid::Uuid;

    use crate::role::Role;
    use crate::route::testing;

    fn assignment_body(course_id: impl serde::Serialize, mode: &str) -> String {
        json!({
            "assignmentName": "Parser",
            "description": "Write a parser",
            "deadline": "2030-01-01T00:00:00Z",
            "courseId": course_id,
            "submissionType": mode,
        })
        .to_string()
    }

    #[rocket::async_test]
    async fn create_requires_token() {
        let client = testing::client().await;

        let response = client
            .post("/api/v1/assignment")
            .header(ContentType::JSON)
            .body(assignment_body(Uuid::new_v4(), "Individual"))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Unauthorized).await;

        assert_eq!(body["success"], false);
    }

    #[rocket::async_test]
    async fn create_is_for_professors_only() {
        let client = testing::client().await;

        let response = client
            .post("/api/v1/assignment")
            .header(ContentType::JSON)
            .header(testing::bearer(Uuid::new_v4(), Role::Student))
            .body(assignment_body(Uuid::new_v4(), "Individual"))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Forbidden).await;

        assert_eq!(body["type"], "/problems/wrong-role");
        assert_eq!(body["required"], "Professor");
    }

    #[rocket::async_test]
    async fn create_rejects_unknown_modes() {
        let client = testing::client().await;

        let response = client
            .post("/api/v1/assignment")
            .header(ContentType::JSON)
            .header(testing::bearer(Uuid::new_v4(), Role::Professor))
            .body(assignment_body(Uuid::new_v4(), "online"))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    #[rocket::async_test]
    async fn submit_is_for_students_only() {
        let client = testing::client().await;

        let response = client
            .post(format!("/api/v1/assignment/submit/{}", Uuid::new_v4()))
            .header(testing::bearer(Uuid::new_v4(), Role::Professor))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Forbidden).await;

        assert_eq!(body["required"], "Student");
    }

    #[rocket::async_test]
    async fn course_status_is_for_professors_only() {
        let client = testing::client().await;

        let response = client
            .get(format!("/api/v1/assignment/forCourse/{}", Uuid::new_v4()))
            .header(testing::bearer(Uuid::new_v4(), Role::Student))
            .dispatch()
            .await;

        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn individual_submission_happens_once() {
        let client = testing::client().await;
        let db = testing::db(&client);
        let professor = testing::create_user(db, "Prof", Role::Professor).await;
        let other = testing::create_user(db, "Other", Role::Professor).await;
        let student = testing::create_user(db, "Stu", Role::Student).await;

        let response = client
            .post("/api/v1/course")
            .header(ContentType::JSON)
            .body(
                json!({
                    "courseName": "Compilers",
                    "courseDescription": "Parsing",
                    "instructorId": professor.id,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Created).await;
        let course_id = body["course"]["id"].as_str().unwrap().to_string();

        let response = client
            .post("/api/v1/course/enroll")
            .header(ContentType::JSON)
            .body(json!({ "courseId": course_id, "studentId": student.id }).to_string())
            .dispatch()
            .await;
        testing::expect_json(response, Status::Ok).await;

        // Only the owner attaches assignments.
        let response = client
            .post("/api/v1/assignment")
            .header(ContentType::JSON)
            .header(testing::bearer_for(&other))
            .body(assignment_body(&course_id, "Individual"))
            .dispatch()
            .await;
        testing::expect_json(response, Status::Forbidden).await;

        let response = client
            .post("/api/v1/assignment")
            .header(ContentType::JSON)
            .header(testing::bearer_for(&professor))
            .body(assignment_body(&course_id, "Individual"))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Created).await;
        let assignment_id = body["assignment"]["id"].as_str().unwrap().to_string();

        let response = client
            .post("/api/v1/assignment")
            .header(ContentType::JSON)
            .header(testing::bearer_for(&professor))
            .body(assignment_body(&course_id, "Individual"))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::BadRequest).await;
        assert_eq!(body["type"], "/problems/assignment-already-exists");

        let response = client
            .get(format!("/api/v1/assignment/submitted/{}", assignment_id))
            .header(testing::bearer_for(&student))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["isSubmitted"], false);

        let submit = format!("/api/v1/assignment/submit/{}", assignment_id);
        let response = client
            .post(&submit)
            .header(testing::bearer_for(&student))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["acknowledgment"]["acknowledged"], true);

        let response = client
            .post(&submit)
            .header(testing::bearer_for(&student))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::BadRequest).await;
        assert_eq!(body["type"], "/problems/already-submitted");

        let response = client
            .get(format!("/api/v1/assignment/submitted/{}", assignment_id))
            .header(testing::bearer_for(&student))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["isSubmitted"], true);

        let response = client
            .get(format!("/api/v1/assignment/forCourse/{}", course_id))
            .header(testing::bearer_for(&professor))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["courseName"], "Compilers");
        assert_eq!(body["assignments"][0]["completionRate"], 100);
        assert_eq!(body["assignments"][0]["submittedList"][0]["email"], student.email);

        let response = client
            .get(format!("/api/v1/assignment/forStudent/{}", course_id))
            .header(testing::bearer_for(&student))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["assignments"][0]["acknowledgmentStatus"]["acknowledged"], true);

        testing::drop_db(&client).await;
    }
}
