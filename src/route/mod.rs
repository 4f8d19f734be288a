use std::collections::BTreeMap;

use rocket::serde::json::Json;
use rocket::{Build, Rocket, Route};
use utoipa::OpenApi;

pub mod assignment;
pub mod auth;
pub mod catchers;
pub mod course;
pub mod group;
#[cfg(test)]
pub(crate) mod testing;

use assignment::*;
use auth::*;
use course::*;
use group::*;

use crate::{
    data::{
        assignment::{AssignmentCreateData, AssignmentResponse, SubmissionMode},
        course::{CourseCreateData, CourseResponse, CourseUpdateData, EnrollData},
        group::{GroupCreateData, GroupResponse},
        submission::{
            AcknowledgmentResponse, AcknowledgmentStatus, AssignmentSummary,
            CourseSubmissionStatus, StudentAssignment, SubmissionCheck, SubmissionDetails,
            SubmittedEntry, SubmittedGroup, SubmittedStudent,
        },
        user::db::{UserLoginData, UserSignupData},
        user::{UserResponse, UserSummary},
    },
    resp::{jwt::doc::JWTAuth, problem::Problem},
    role::Role,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        signup,
        login,
        logout,
        me,
        course_create,
        course_enroll,
        course_update,
        course_get,
        course_list,
        course_professor_list,
        assignment_create,
        assignment_submit,
        assignment_course_status,
        assignment_submitted,
        assignment_student_list,
        group_create,
        group_eligible,
        group_status
    ),
    components(schemas(
        Role,
        UserResponse,
        UserSummary,
        UserSignupData,
        UserLoginData,
        UserPayload,
        LoginPayload,
        CourseCreateData,
        CourseUpdateData,
        EnrollData,
        CourseResponse,
        CoursePayload,
        CourseListPayload,
        SubmissionMode,
        AssignmentCreateData,
        AssignmentResponse,
        AssignmentPayload,
        SubmitPayload,
        AcknowledgmentResponse,
        AcknowledgmentStatus,
        AssignmentSummary,
        SubmittedEntry,
        SubmittedStudent,
        SubmittedGroup,
        CourseSubmissionStatus,
        SubmissionCheck,
        SubmissionDetails,
        StudentAssignment,
        StudentAssignmentsPayload,
        GroupCreateData,
        GroupResponse,
        GroupPayload,
        EligiblePayload,
        GroupStatusPayload,
        Problem
    )),
    modifiers(&JWTAuth, &V1_PREFIX)
)]
pub struct ApiDocV1;

pub struct PathPrefix(pub &'static str);
static V1_PREFIX: PathPrefix = PathPrefix("/api/v1");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

#[get("/openapi.json")]
pub fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

pub fn api_v1() -> Vec<Route> {
    routes![
        signup,
        login,
        logout,
        me,
        course_create,
        course_enroll,
        course_update,
        course_get,
        course_list,
        course_professor_list,
        assignment_create,
        assignment_submit,
        assignment_course_status,
        assignment_submitted,
        assignment_student_list,
        group_create,
        group_eligible,
        group_status,
        openapi_json
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/v1", api_v1())
        .register("/", catchers::catchers())
}
