use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, CookieJar, Status};
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};
use rocket::time::OffsetDateTime;
use serde::{Deserialize, Serialize};

use super::util::date_time_as_unix_seconds;
use crate::data::user::User;
use crate::resp::problem::Problem;
use crate::role::Role;
use crate::security::Security;
use uuid::Uuid;

pub static AUTH_COOKIE_NAME: &str = "token";

/// Claims of a session token: who the caller is and which account type they have.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRoleToken {
    #[serde(with = "date_time_as_unix_seconds")]
    iat: DateTime<Utc>,
    #[serde(with = "date_time_as_unix_seconds")]
    exp: DateTime<Utc>,
    pub user: Uuid,
    pub role: Role,
}

impl UserRoleToken {
    pub fn new(user: &User, lifetime: Duration) -> UserRoleToken {
        UserRoleToken::for_user(user.id, user.account_type, lifetime)
    }

    pub fn for_user(user: Uuid, role: Role, lifetime: Duration) -> UserRoleToken {
        let now = Utc::now();
        UserRoleToken {
            iat: now,
            exp: now + lifetime,
            user,
            role,
        }
    }

    pub fn encode_jwt(
        &self,
        private_key: impl AsRef<[u8]>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let header = Header::new(Algorithm::PS256);
        let key = EncodingKey::from_rsa_pem(private_key.as_ref())?;

        encode(&header, &self, &key)
    }

    pub fn cookie(
        &self,
        private_key: impl AsRef<[u8]>,
    ) -> Result<Cookie<'static>, jsonwebtoken::errors::Error> {
        Ok(Cookie::build((AUTH_COOKIE_NAME, self.encode_jwt(private_key)?))
            .secure(true)
            .expires(OffsetDateTime::from_unix_timestamp(self.exp.timestamp()).ok())
            .path("/")
            .http_only(true)
            .build())
    }
}

pub fn auth_problem(detail: impl ToString) -> Problem {
    Problem::new(
        Status::Unauthorized,
        "/problems/unauthorized",
        "Unable to authorize user.",
    )
    .detail(detail)
    .clone()
}

pub fn role_problem(required: Role) -> Problem {
    Problem::new(
        Status::Forbidden,
        "/problems/wrong-role",
        "Account type not allowed for this action.",
    )
    .detail(format!("This is a protected route for {}s only.", required))
    .insert_str("required", required)
    .clone()
}

pub fn decode_claims(token: &str, public_key: impl AsRef<[u8]>) -> Result<UserRoleToken, Problem> {
    let key = DecodingKey::from_rsa_pem(public_key.as_ref()).map_err(|e| {
        tracing::error!("user_auth public key isn't valid: {}", e);
        Problem::new_untyped(Status::InternalServerError, "Unable to check session token.")
    })?;

    match decode::<UserRoleToken>(token, &key, &Validation::new(Algorithm::PS256))
        .map(|data| data.claims)
    {
        Ok(it) => {
            tracing::debug!("decoded user roles token for user: {}", it.user);
            Ok(it)
        }
        Err(e) => {
            tracing::debug!("rejected session token: {}", e);
            Err(auth_problem("Invalid token."))
        }
    }
}

/// Reads the raw token from the `Authorization` header, falling back to the cookie.
pub fn extract_token(req: &Request<'_>) -> Option<String> {
    let bearer = req
        .headers()
        .get_one("Authorization")
        .and_then(|it| it.strip_prefix("Bearer "))
        .map(|it| it.trim().to_string());

    bearer.or_else(|| cookie_token(req.cookies()))
}

fn cookie_token(cookies: &CookieJar<'_>) -> Option<String> {
    cookies.get(AUTH_COOKIE_NAME).map(|it| it.value().to_owned())
}

/// Guard failure carried over to the error catchers.
#[derive(Debug, Clone, Default)]
pub struct GuardProblem(pub Option<Problem>);

fn fail<T>(req: &Request<'_>, problem: Problem) -> request::Outcome<T, Problem> {
    let status = problem.status;
    req.local_cache(|| GuardProblem(Some(problem.clone())));
    Outcome::Error((status, problem))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for UserRoleToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let security: &Security = match req.rocket().state() {
            Some(it) => it,
            None => {
                tracing::error!("security material isn't managed by rocket");
                return fail(
                    req,
                    Problem::new_untyped(Status::InternalServerError, "Server misconfigured."),
                );
            }
        };

        tracing::trace!("extracting user roles token from request");
        let token = match extract_token(req) {
            Some(it) => it,
            None => return fail(req, auth_problem("Token is missing.")),
        };

        match decode_claims(&token, &security.jwt_keys.public) {
            Ok(claims) => Outcome::Success(claims),
            Err(e) => fail(req, e),
        }
    }
}

async fn require_role<'r>(
    req: &'r Request<'_>,
    role: Role,
) -> request::Outcome<UserRoleToken, Problem> {
    match req.guard::<UserRoleToken>().await {
        Outcome::Success(token) if token.role == role => Outcome::Success(token),
        Outcome::Success(token) => {
            tracing::debug!("user {} with role {} rejected", token.user, token.role);
            fail(req, role_problem(role))
        }
        Outcome::Error(e) => Outcome::Error(e),
        Outcome::Forward(s) => Outcome::Forward(s),
    }
}

/// Session of a caller holding the `Student` account type.
#[derive(Debug, Clone)]
pub struct StudentToken(pub UserRoleToken);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StudentToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        require_role(req, Role::Student).await.map(StudentToken)
    }
}

/// Session of a caller holding the `Professor` account type.
#[derive(Debug, Clone)]
pub struct ProfessorToken(pub UserRoleToken);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for ProfessorToken {
    type Error = Problem;

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        require_role(req, Role::Professor).await.map(ProfessorToken)
    }
}

pub mod doc {
    use utoipa::openapi::security::*;

    #[derive(Clone, Copy)]
    pub struct JWTAuth;

    impl From<JWTAuth> for SecurityScheme {
        fn from(_: JWTAuth) -> Self {
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            )
        }
    }

    impl utoipa::Modify for JWTAuth {
        fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
            if let Some(c) = openapi.components.as_mut() {
                c.add_security_scheme("jwt", *self)
            }
        }
    }
}
