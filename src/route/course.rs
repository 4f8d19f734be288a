use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::course::db::CourseDbExt;
use crate::data::course::{Course, CourseCreateData, CourseResponse, CourseUpdateData, EnrollData};
use crate::resp::problem::{problems, Problem};
use crate::resp::ApiResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct CoursePayload {
    pub course: CourseResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CourseListPayload {
    pub courses: Vec<CourseResponse>,
}

async fn expand(db: &Database, course: Course) -> Result<CourseResponse, Problem> {
    db.expand_courses(vec![course])
        .await?
        .pop()
        .ok_or_else(problems::server_problem)
}

/// Create a course owned by a professor
#[utoipa::path(
    request_body = CourseCreateData,
    responses(
        (status = 201, description = "Course created", body = CoursePayload),
        (status = 400, description = "Missing fields", body = Problem),
        (status = 403, description = "Instructor is not a professor", body = Problem),
        (status = 404, description = "Instructor doesn't exist", body = Problem),
    )
)]
#[post("/course", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn course_create(
    data: Json<CourseCreateData>,
    db: &State<Database>,
) -> Result<(Status, Json<ApiResponse<CoursePayload>>), Problem> {
    let course = db.create_course(data.into_inner()).await?;
    let course = expand(db, course).await?;

    Ok((
        Status::Created,
        ApiResponse::ok("Course created successfully.", CoursePayload { course }),
    ))
}

/// Enroll a student in a course
#[utoipa::path(
    request_body = EnrollData,
    responses(
        (status = 200, description = "Updated course", body = CoursePayload),
        (status = 400, description = "Student already enrolled", body = Problem),
        (status = 403, description = "User is not a student", body = Problem),
        (status = 404, description = "Course or student doesn't exist", body = Problem),
    )
)]
#[post("/course/enroll", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn course_enroll(
    data: Json<EnrollData>,
    db: &State<Database>,
) -> Result<Json<ApiResponse<CoursePayload>>, Problem> {
    let course = db.enroll_student(data.into_inner()).await?;
    let course = expand(db, course).await?;

    Ok(ApiResponse::ok(
        "Student enrolled successfully.",
        CoursePayload { course },
    ))
}

/// Update course details
///
/// Any assignment attached to the course is deleted and unlinked.
#[utoipa::path(
    request_body = CourseUpdateData,
    responses(
        (status = 200, description = "Updated course", body = CoursePayload),
        (status = 403, description = "Instructor doesn't own the course", body = Problem),
        (status = 404, description = "Course or instructor doesn't exist", body = Problem),
    )
)]
#[post("/course/update", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn course_update(
    data: Json<CourseUpdateData>,
    db: &State<Database>,
) -> Result<Json<ApiResponse<CoursePayload>>, Problem> {
    let course = db.update_course(data.into_inner()).await?;
    let course = expand(db, course).await?;

    Ok(ApiResponse::ok(
        "Course updated successfully.",
        CoursePayload { course },
    ))
}

/// Get course details
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    responses(
        (status = 200, description = "Course with owner, assignment and roster", body = CoursePayload),
        (status = 404, description = "Course doesn't exist", body = Problem),
    )
)]
#[get("/course/<id>")]
#[tracing::instrument(skip(db))]
pub async fn course_get(
    id: Uuid,
    db: &State<Database>,
) -> Result<Json<ApiResponse<CoursePayload>>, Problem> {
    let course = db.require_course(id).await?;
    let course = expand(db, course).await?;

    Ok(ApiResponse::ok(
        "Course details fetched successfully.",
        CoursePayload { course },
    ))
}

/// List all courses
#[utoipa::path(
    responses(
        (status = 200, description = "Every course", body = CourseListPayload),
    )
)]
#[get("/course")]
#[tracing::instrument(skip(db))]
pub async fn course_list(db: &State<Database>) -> Result<Json<ApiResponse<CourseListPayload>>, Problem> {
    let courses = db.list_courses().await?;
    let courses = db.expand_courses(courses).await?;

    Ok(ApiResponse::ok(
        "Courses fetched successfully.",
        CourseListPayload { courses },
    ))
}

/// List the courses of a professor, newest first
#[utoipa::path(
    params(
        ("professor_id", description = "professor's user ID")
    ),
    responses(
        (status = 200, description = "Courses owned by the professor", body = CourseListPayload),
        (status = 403, description = "User is not a professor", body = Problem),
        (status = 404, description = "Professor doesn't exist", body = Problem),
    )
)]
#[get("/course/professor/<professor_id>")]
#[tracing::instrument(skip(db))]
pub async fn course_professor_list(
    professor_id: Uuid,
    db: &State<Database>,
) -> Result<Json<ApiResponse<CourseListPayload>>, Problem> {
    let courses = db.professor_courses(professor_id).await?;
    let courses = db.expand_courses(courses).await?;

    Ok(ApiResponse::ok(
        "Professor courses fetched successfully.",
        CourseListPayload { courses },
    ))
}
