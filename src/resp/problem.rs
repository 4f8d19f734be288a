use std::io::Cursor;

use rocket::http::hyper::header::CONTENT_LANGUAGE;
use rocket::http::ContentType;
use rocket::http::Status;
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};
use utoipa::ToSchema;

use crate::error::{DataError, RuleError};

/// Implements [RFC7807](https://tools.ietf.org/html/rfc7807).
///
/// Rendered bodies also carry `success: false` and a `message` so clients can
/// treat every response of the API the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Problem {
    #[serde(skip)]
    pub status: Status,
    pub type_uri: String,
    pub title: String,

    pub detail: Option<String>,

    #[schema(value_type = Object)]
    pub body: Map<String, Value>,
}

impl Default for Problem {
    fn default() -> Self {
        Problem {
            status: Status::InternalServerError,
            type_uri: "about:blank".to_string(),
            title: "Problem".to_string(),
            detail: None,
            body: Map::new(),
        }
    }
}

impl Problem {
    pub fn new(status: Status, type_uri: impl ToString, title: impl ToString) -> Problem {
        Problem {
            status,
            type_uri: type_uri.to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn new_untyped(status: Status, title: impl ToString) -> Problem {
        Problem {
            status,
            type_uri: "about:blank".to_string(),
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn detail(&mut self, value: impl ToString) -> &mut Problem {
        self.detail = Some(value.to_string());
        self
    }

    pub fn insert_json_value(&mut self, key: impl ToString, value: Value) -> &mut Problem {
        self.body.insert(key.to_string(), value);
        self
    }

    pub fn insert_str(&mut self, key: impl ToString, value: impl ToString) -> &mut Problem {
        self.body
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }

    /// Human readable summary, preferring the detail over the title.
    pub fn message(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self.title)
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut body = self.body.clone();

        body.insert("success".to_string(), Value::Bool(false));
        body.insert("message".to_string(), Value::from(self.message()));

        // Following are required by rfc7807
        body.insert("type".to_string(), Value::from(self.type_uri.clone()));
        body.insert("title".to_string(), Value::from(self.title.clone()));

        // Optional parameters as specified by rfc7807
        if let Some(detail) = &self.detail {
            body.insert("detail".to_string(), Value::from(detail.clone()));
        }
        body.insert("status".to_string(), Value::from(self.status.code));

        body
    }
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message())
    }
}

impl std::error::Error for Problem {}

impl<'r> Responder<'r, 'static> for Problem {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body_string = Value::Object(self.to_json()).to_string();

        Response::build()
            .status(self.status)
            .header(ContentType::new("application", "problem+json"))
            .raw_header(CONTENT_LANGUAGE.as_str(), "en")
            .sized_body(body_string.len(), Cursor::new(body_string))
            .ok()
    }
}

pub mod problems {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn parse_problem() -> Problem {
        Problem::new(
            Status::BadRequest,
            "/problems/validation",
            "There was a problem parsing part of the request.",
        )
    }

    #[inline]
    pub fn unprocessable_problem() -> Problem {
        Problem::new(
            Status::UnprocessableEntity,
            "/problems/validation",
            "Request body is missing required fields or has fields of the wrong type.",
        )
    }

    #[inline]
    pub fn route_not_found(path: impl ToString) -> Problem {
        Problem::new_untyped(Status::NotFound, "Resource not found.")
            .insert_str("path", path)
            .to_owned()
    }

    #[inline]
    pub fn server_problem() -> Problem {
        Problem::new_untyped(Status::InternalServerError, "Server error.")
    }
}

fn id_list(ids: &[uuid::Uuid]) -> Value {
    Value::Array(ids.iter().map(|id| Value::from(id.to_string())).collect())
}

impl From<RuleError> for Problem {
    fn from(e: RuleError) -> Self {
        let message = e.to_string();

        match e {
            RuleError::NotFound(entity, id) => Problem::new(
                Status::NotFound,
                "/problems/not-found",
                format!("The requested {} doesn't exist.", entity),
            )
            .detail(message)
            .insert_str("id", id)
            .to_owned(),
            RuleError::Validation(_) => {
                Problem::new(Status::BadRequest, "/problems/validation", "Invalid request.")
                    .detail(message)
                    .to_owned()
            }
            RuleError::NotAuthorized(_) => Problem::new(
                Status::Forbidden,
                "/problems/not-authorized",
                "Not authorized for this action.",
            )
            .detail(message)
            .to_owned(),
            RuleError::WrongRole(role) => Problem::new(
                Status::Forbidden,
                "/problems/wrong-role",
                "Account type not allowed for this action.",
            )
            .detail(message)
            .insert_str("required", role)
            .to_owned(),
            RuleError::EmailTaken(email) => {
                Problem::new(Status::Conflict, "/problems/email-taken", "Bad email.")
                    .detail(message)
                    .insert_str("email", email)
                    .to_owned()
            }
            RuleError::AssignmentAlreadyExists => Problem::new(
                Status::BadRequest,
                "/problems/assignment-already-exists",
                "Assignment already exists.",
            )
            .detail(message)
            .to_owned(),
            RuleError::AlreadyEnrolled => Problem::new(
                Status::BadRequest,
                "/problems/already-enrolled",
                "Already enrolled.",
            )
            .detail(message)
            .to_owned(),
            RuleError::WrongSubmissionMode => Problem::new(
                Status::BadRequest,
                "/problems/wrong-submission-mode",
                "Wrong submission mode.",
            )
            .detail(message)
            .to_owned(),
            RuleError::InvalidSubmissionType(_) => Problem::new(
                Status::BadRequest,
                "/problems/invalid-submission-type",
                "Invalid submission type.",
            )
            .detail(message)
            .to_owned(),
            RuleError::MemberNotEnrolled(ids) => Problem::new(
                Status::BadRequest,
                "/problems/member-not-enrolled",
                "Member not enrolled.",
            )
            .detail(message)
            .insert_json_value("notEnrolled", id_list(&ids))
            .to_owned(),
            RuleError::MemberAlreadyGrouped(ids) => Problem::new(
                Status::BadRequest,
                "/problems/member-already-grouped",
                "Member already grouped.",
            )
            .detail(message)
            .insert_json_value("alreadyGrouped", id_list(&ids))
            .to_owned(),
            RuleError::AlreadySubmitted => Problem::new(
                Status::BadRequest,
                "/problems/already-submitted",
                "Already submitted.",
            )
            .detail(message)
            .to_owned(),
            RuleError::NotInGroup => {
                Problem::new(Status::BadRequest, "/problems/not-in-group", "Not in a group.")
                    .detail(message)
                    .to_owned()
            }
            RuleError::NotGroupLeader => Problem::new(
                Status::Forbidden,
                "/problems/not-group-leader",
                "Not the group leader.",
            )
            .detail(message)
            .to_owned(),
        }
    }
}

impl From<DataError> for Problem {
    fn from(e: DataError) -> Self {
        match e {
            DataError::Rule(rule) => rule.into(),
            DataError::Database(db) => db.into(),
        }
    }
}

impl From<mongodb::error::Error> for Problem {
    fn from(e: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        tracing::error!("MongoDB error: {}", e);

        fn mongodb_problem() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "MongoDB failed while processing request.",
            )
        }

        fn access_problem() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "Server was unable to access MongoDB.",
            )
        }

        fn bad_db_request() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "MongoDB was unable to process bad server request.",
            )
        }

        fn bson_problem() -> Problem {
            Problem::new_untyped(
                Status::InternalServerError,
                "There was a problem with handling MongoDB bson.",
            )
        }

        let mut problem = match e.kind.as_ref() {
            ErrorKind::InvalidArgument { .. } => bad_db_request(),
            ErrorKind::Authentication { .. } => access_problem(),
            ErrorKind::BsonDeserialization(_) => bson_problem(),
            ErrorKind::BsonSerialization(_) => bson_problem(),
            ErrorKind::BulkWrite(_) => bad_db_request(),
            ErrorKind::Command(_) => bad_db_request(),
            ErrorKind::DnsResolve { .. } => access_problem(),
            ErrorKind::ServerSelection { .. } => access_problem(),
            ErrorKind::InvalidTlsConfig { .. } => access_problem(),
            ErrorKind::IncompatibleServer { .. } => access_problem(),
            ErrorKind::Io(_) => mongodb_problem()
                .detail("An IO error occurred. Submitted data might not be properly stored.")
                .clone(),
            ErrorKind::Write(_) => mongodb_problem()
                .detail("A write error occurred. Submitted data might not be properly stored.")
                .clone(),
            _ => mongodb_problem(),
        };

        // Internal tool: the driver message is surfaced to the client.
        problem.insert_str("error", e);
        problem
    }
}

impl From<jsonwebtoken::errors::Error> for Problem {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match e.into_kind() {
            ErrorKind::ExpiredSignature => {
                Problem::new_untyped(Status::Unauthorized, "Expired JWT signature.")
            }
            _ => Problem::new_untyped(Status::Unauthorized, "Error while handling JWT."),
        }
    }
}
