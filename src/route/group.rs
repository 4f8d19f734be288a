use mongodb::Database;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::group::db::GroupDbExt;
use crate::data::group::{GroupCreateData, GroupResponse};
use crate::data::user::UserSummary;
use crate::resp::jwt::StudentToken;
use crate::resp::problem::Problem;
use crate::resp::ApiResponse;

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupPayload {
    pub group: GroupResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EligiblePayload {
    pub eligible_students: Vec<UserSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatusPayload {
    pub already_in_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupResponse>,
}

/// Form a group for a group assignment, led by the caller
#[utoipa::path(
    request_body = GroupCreateData,
    responses(
        (status = 201, description = "Group created", body = GroupPayload),
        (status = 400, description = "Wrong mode, member not enrolled or already grouped", body = Problem),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 403, description = "Caller is not a student", body = Problem),
        (status = 404, description = "Assignment or course doesn't exist", body = Problem),
        (status = 422, description = "Malformed request body", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[post("/group", data = "<data>")]
#[tracing::instrument(skip(db))]
pub async fn group_create(
    data: Json<GroupCreateData>,
    auth: StudentToken,
    db: &State<Database>,
) -> Result<(Status, Json<ApiResponse<GroupPayload>>), Problem> {
    let group = db.create_group(data.into_inner(), auth.0.user).await?;
    let group = db.expand_group(group).await?;

    Ok((
        Status::Created,
        ApiResponse::ok("Group created successfully.", GroupPayload { group }),
    ))
}

/// Enrolled students not yet in a group for an assignment
#[utoipa::path(
    params(
        ("assignment_id", description = "assignment ID")
    ),
    responses(
        (status = 200, description = "Students still free to group", body = EligiblePayload),
        (status = 404, description = "Assignment or course doesn't exist", body = Problem),
    )
)]
#[get("/group/eligible/<assignment_id>")]
#[tracing::instrument(skip(db))]
pub async fn group_eligible(
    assignment_id: Uuid,
    db: &State<Database>,
) -> Result<Json<ApiResponse<EligiblePayload>>, Problem> {
    let eligible_students = db.eligible_for_group(assignment_id).await?;

    Ok(ApiResponse::ok(
        "Eligible students fetched successfully.",
        EligiblePayload { eligible_students },
    ))
}

/// Group of the caller for an assignment, if any
#[utoipa::path(
    params(
        ("assignment_id", description = "assignment ID")
    ),
    responses(
        (status = 200, description = "Group membership of the caller", body = GroupStatusPayload),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 403, description = "Caller is not a student", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[get("/group/status/<assignment_id>")]
#[tracing::instrument(skip(db))]
pub async fn group_status(
    assignment_id: Uuid,
    auth: StudentToken,
    db: &State<Database>,
) -> Result<Json<ApiResponse<GroupStatusPayload>>, Problem> {
    let response = match db.group_of_user(assignment_id, auth.0.user).await? {
        Some(group) => ApiResponse::ok(
            "User is already part of a group for this assignment.",
            GroupStatusPayload {
                already_in_group: true,
                group: Some(db.expand_group(group).await?),
            },
        ),
        None => ApiResponse::ok(
            "User is not part of any group for this assignment.",
            GroupStatusPayload {
                already_in_group: false,
                group: None,
            },
        ),
    };

    Ok(response)
}

#[cfg(test)]
mod group_endpoints {
    use rocket::http::{ContentType, Status};
    use serde_json::json;
    use uuid::Uuid;

    use crate::data::submission::{Acknowledgment, ACKNOWLEDGMENT_COLLECTION_NAME};
    use crate::role::Role;
    use crate::route::testing;

    #[rocket::async_test]
    async fn create_requires_student_token() {
        let client = testing::client().await;
        let body = json!({
            "groupName": "Team",
            "memberIds": [],
            "assignmentId": Uuid::new_v4(),
        })
        .to_string();

        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .body(body.clone())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);

        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .header(testing::bearer(Uuid::new_v4(), Role::Professor))
            .body(body)
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Forbidden);
    }

    #[rocket::async_test]
    async fn create_rejects_malformed_bodies() {
        let client = testing::client().await;

        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .header(testing::bearer(Uuid::new_v4(), Role::Student))
            .body(json!({ "groupName": "Team", "memberIds": "everyone" }).to_string())
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::UnprocessableEntity).await;
        assert_eq!(body["success"], false);

        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .header(testing::bearer(Uuid::new_v4(), Role::Student))
            .body("{ not json")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[rocket::async_test]
    #[ignore = "requires a running MongoDB instance"]
    async fn group_formation_and_leader_submission() {
        let client = testing::client().await;
        let db = testing::db(&client);
        let professor = testing::create_user(db, "Prof", Role::Professor).await;
        let s1 = testing::create_user(db, "First", Role::Student).await;
        let s2 = testing::create_user(db, "Second", Role::Student).await;
        let s3 = testing::create_user(db, "Third", Role::Student).await;

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

        for student in [&s1, &s2, &s3] {
            let response = client
                .post("/api/v1/course/enroll")
                .header(ContentType::JSON)
                .body(json!({ "courseId": course_id, "studentId": student.id }).to_string())
                .dispatch()
                .await;
            testing::expect_json(response, Status::Ok).await;
        }

        let response = client
            .post("/api/v1/assignment")
            .header(ContentType::JSON)
            .header(testing::bearer_for(&professor))
            .body(
                json!({
                    "assignmentName": "Compiler",
                    "description": "Build a compiler",
                    "deadline": "2030-01-01T00:00:00Z",
                    "courseId": course_id,
                    "submissionType": "Group",
                })
                .to_string(),
            )
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Created).await;
        let assignment_id = body["assignment"]["id"].as_str().unwrap().to_string();

        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .header(testing::bearer_for(&s1))
            .body(
                json!({
                    "groupName": "Team Rocket",
                    "memberIds": [s2.id],
                    "assignmentId": assignment_id,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Created).await;
        assert_eq!(body["group"]["leader"]["id"], s1.id.to_string());
        assert_eq!(body["group"]["members"].as_array().map(Vec::len), Some(2));

        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .header(testing::bearer_for(&s3))
            .body(
                json!({
                    "groupName": "Second Team",
                    "memberIds": [s2.id],
                    "assignmentId": assignment_id,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::BadRequest).await;
        assert_eq!(body["type"], "/problems/member-already-grouped");
        assert_eq!(body["alreadyGrouped"], json!([s2.id.to_string()]));

        let response = client
            .get(format!("/api/v1/group/eligible/{}", assignment_id))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["eligibleStudents"][0]["id"], s3.id.to_string());
        assert_eq!(body["eligibleStudents"].as_array().map(Vec::len), Some(1));

        let response = client
            .get(format!("/api/v1/group/status/{}", assignment_id))
            .header(testing::bearer_for(&s2))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["alreadyInGroup"], true);

        let submit = format!("/api/v1/assignment/submit/{}", assignment_id);
        let response = client
            .post(&submit)
            .header(testing::bearer_for(&s2))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Forbidden).await;
        assert_eq!(body["type"], "/problems/not-group-leader");

        let response = client
            .post(&submit)
            .header(testing::bearer_for(&s3))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::BadRequest).await;
        assert_eq!(body["type"], "/problems/not-in-group");

        let response = client
            .post(&submit)
            .header(testing::bearer_for(&s1))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["group"]["submitted"], true);

        let response = client
            .post(&submit)
            .header(testing::bearer_for(&s1))
            .dispatch()
            .await;
        testing::expect_json(response, Status::BadRequest).await;

        let response = client
            .get(format!("/api/v1/assignment/submitted/{}", assignment_id))
            .header(testing::bearer_for(&s2))
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
        assert_eq!(body["assignments"][0]["totalEntities"], 1);
        assert_eq!(body["assignments"][0]["completionRate"], 100);
        assert_eq!(body["assignments"][0]["submittedList"][0]["groupName"], "Team Rocket");

        // A leader acknowledgment alone marks the group as submitted.
        let response = client
            .post("/api/v1/group")
            .header(ContentType::JSON)
            .header(testing::bearer_for(&s3))
            .body(
                json!({
                    "groupName": "Solo",
                    "memberIds": [],
                    "assignmentId": assignment_id,
                })
                .to_string(),
            )
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Created).await;
        assert_eq!(body["group"]["submitted"], false);

        let assignment: Uuid = assignment_id.parse().unwrap();
        db.collection::<Acknowledgment>(ACKNOWLEDGMENT_COLLECTION_NAME)
            .insert_one(Acknowledgment::submitted_now(assignment, s3.id), None)
            .await
            .unwrap();

        let response = client
            .get(format!("/api/v1/assignment/submitted/{}", assignment_id))
            .header(testing::bearer_for(&s3))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        assert_eq!(body["isSubmitted"], true);
        assert_eq!(body["submissionDetails"]["groupName"], "Solo");

        let response = client
            .get(format!("/api/v1/assignment/forStudent/{}", course_id))
            .header(testing::bearer_for(&s3))
            .dispatch()
            .await;
        let body = testing::expect_json(response, Status::Ok).await;
        let view = &body["assignments"][0];
        assert_eq!(view["acknowledgmentStatus"]["acknowledged"], true);
        assert_eq!(view["acknowledgmentStatus"]["acknowledgedBy"]["id"], s3.id.to_string());
        assert_eq!(view["groupInfo"]["groupName"], "Solo");

        testing::drop_db(&client).await;
    }
}
