use mongodb::Database;
use rocket::http::{Cookie, CookieJar, Status};
use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::Config;
use crate::data::user::db::problem as user_problem;
use crate::data::user::db::{UserDbExt, UserLoginData, UserSignupData};
use crate::data::user::UserResponse;
use crate::error::{Entity, RuleError};
use crate::resp::jwt::{UserRoleToken, AUTH_COOKIE_NAME};
use crate::resp::problem::Problem;
use crate::resp::{ApiResponse, Empty};
use crate::security::Security;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserPayload {
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginPayload {
    /// Session token, also set as the `token` cookie.
    pub token: String,
    pub user: UserResponse,
}

/// Register a new student or professor account
#[utoipa::path(
    request_body = UserSignupData,
    responses(
        (status = 201, description = "Account created", body = UserPayload),
        (status = 400, description = "Missing or malformed fields", body = Problem),
        (status = 409, description = "Email already registered", body = Problem),
    )
)]
#[post("/auth/signup", data = "<signup>")]
#[tracing::instrument(skip(db, security, config))]
pub async fn signup(
    signup: Json<UserSignupData>,
    db: &State<Database>,
    security: &State<Security>,
    config: &State<Config>,
) -> Result<(Status, Json<ApiResponse<UserPayload>>), Problem> {
    signup.validate()?;

    let user = signup
        .into_inner()
        .into_user(&security.salt, config.password_cost);
    db.create_user(&user).await?;

    Ok((
        Status::Created,
        ApiResponse::ok(
            "User registered successfully.",
            UserPayload { user: user.into() },
        ),
    ))
}

/// Log in with email and password
#[utoipa::path(
    request_body = UserLoginData,
    responses(
        (status = 200, description = "Session token and user", body = LoginPayload),
        (status = 400, description = "Missing fields", body = Problem),
        (status = 401, description = "Unknown email or wrong password", body = Problem),
    )
)]
#[post("/auth/login", data = "<login>")]
#[tracing::instrument(skip(cookies, db, security, config))]
pub async fn login(
    login: Json<UserLoginData>,
    cookies: &CookieJar<'_>,
    db: &State<Database>,
    security: &State<Security>,
    config: &State<Config>,
) -> Result<Json<ApiResponse<LoginPayload>>, Problem> {
    login.validate()?;

    let user = db
        .find_user_by_email(login.email.trim())
        .await?
        .ok_or_else(|| user_problem::bad_login("User is not registered, please sign up first."))?;

    if !user.pw_hash.verify(&login.password, &security.salt) {
        tracing::debug!("wrong password for user {}", user.id);
        return Err(user_problem::bad_login("Password is incorrect."));
    }

    let session = UserRoleToken::new(&user, config.token_lifetime());
    let token = session.encode_jwt(&security.jwt_keys.private)?;
    cookies.add(session.cookie(&security.jwt_keys.private)?);

    tracing::info!("User {} logged in", user.id);
    Ok(ApiResponse::ok(
        "User logged in successfully.",
        LoginPayload {
            token,
            user: user.into(),
        },
    ))
}

/// Drop the session cookie
#[utoipa::path(responses((status = 200, description = "Cookie removed")))]
#[post("/auth/logout")]
pub async fn logout(cookies: &CookieJar<'_>) -> Json<ApiResponse<Empty>> {
    cookies.remove(Cookie::new(AUTH_COOKIE_NAME, ""));
    ApiResponse::ok("User logged out successfully.", Empty {})
}

/// Account of the caller
#[utoipa::path(
    responses(
        (status = 200, description = "Caller's account", body = UserPayload),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 404, description = "Account no longer exists", body = Problem),
    ),
    security(
        ("jwt" = [])
    )
)]
#[get("/auth/me")]
#[tracing::instrument(skip(db))]
pub async fn me(
    auth: UserRoleToken,
    db: &State<Database>,
) -> Result<Json<ApiResponse<UserPayload>>, Problem> {
    let user = db
        .get_user(auth.user)
        .await?
        .ok_or(RuleError::NotFound(Entity::User, auth.user))?;

    Ok(ApiResponse::ok(
        "User fetched successfully.",
        UserPayload { user: user.into() },
    ))
}
