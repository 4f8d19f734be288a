use std::collections::HashMap;

use bson::doc;
use mongodb::Database;
use rocket::futures::TryStreamExt;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::filter;
use crate::data::ids::to_bson;
use crate::error::{DataResult, Entity, RuleError};
use crate::role::Role;
use crate::security::Salt;

use super::{PasswordHash, User, USER_COLLECTION_NAME};

pub mod problem {
    use crate::resp::problem::Problem;
    use rocket::http::Status;

    #[inline]
    pub fn bad_login(detail: impl ToString) -> Problem {
        Problem::new(
            Status::Unauthorized,
            "/problems/bad-login",
            "Bad email or password.",
        )
        .detail(detail)
        .to_owned()
    }
}

#[cfg(feature = "validation-regex")]
fn is_email(value: &str) -> bool {
    use regex::Regex;
    use std::sync::OnceLock;

    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .map_or_else(|| value.contains('@'), |re| re.is_match(value))
}

#[cfg(not(feature = "validation-regex"))]
fn is_email(value: &str) -> bool {
    value.contains('@')
}

#[derive(Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSignupData {
    #[schema(format = "email")]
    pub email: String,
    #[schema(format = "password")]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub account_type: Role,
}

impl std::fmt::Debug for UserSignupData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserSignupInfo:{}", self.email)
    }
}

impl UserSignupData {
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(RuleError::validation("All fields are required."));
        }

        if !is_email(self.email.trim()) {
            return Err(RuleError::validation("Not a valid e-mail address."));
        }

        if self.password.len() < 8 {
            return Err(RuleError::validation(
                "Password must be at least 8 characters (bytes) long.",
            ));
        }

        if self.password.len() > 1024 {
            return Err(RuleError::validation(
                "Passwords longer than 1024 characters aren't supported.",
            ));
        }

        Ok(())
    }

    pub fn into_user(self, salt: &Salt, cost: u32) -> User {
        let id = Uuid::new_v4();
        tracing::info!("Creating a new user with UUID: {}", id);

        User {
            id,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            pw_hash: PasswordHash::new(&self.password, salt, cost),
            account_type: self.account_type,
            courses: vec![],
        }
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct UserLoginData {
    #[schema(format = "email")]
    pub email: String,
    #[schema(format = "password")]
    pub password: String,
}

impl std::fmt::Debug for UserLoginData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserLoginInfo:{}", self.email)
    }
}

impl UserLoginData {
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(RuleError::validation("All the fields are required."));
        }
        Ok(())
    }
}

/// Loads a user and checks it has the expected account type.
pub fn require_role(user: Option<User>, id: Uuid, role: Role) -> Result<User, RuleError> {
    let user = user.ok_or(RuleError::NotFound(Entity::User, id))?;
    if user.account_type != role {
        return Err(RuleError::WrongRole(role));
    }
    Ok(user)
}

pub trait UserDbExt {
    async fn create_user(&self, user: &User) -> DataResult<()>;

    async fn get_user(&self, id: Uuid) -> DataResult<Option<User>>;

    /// Users with the given ids, keyed by id. Unknown ids are skipped.
    async fn get_users(&self, ids: &[Uuid]) -> DataResult<HashMap<Uuid, User>>;

    async fn find_user_by_email(&self, email: impl AsRef<str>) -> DataResult<Option<User>>;

    async fn add_user_course(&self, user: Uuid, course: Uuid) -> DataResult<()>;
}

impl UserDbExt for Database {
    async fn create_user(&self, user: &User) -> DataResult<()> {
        if self.find_user_by_email(&user.email).await?.is_some() {
            return Err(RuleError::EmailTaken(user.email.clone()).into());
        }

        self.collection::<User>(USER_COLLECTION_NAME)
            .insert_one(user, None)
            .await?;

        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> DataResult<Option<User>> {
        Ok(self
            .collection::<User>(USER_COLLECTION_NAME)
            .find_one(filter::by_id(id), None)
            .await?)
    }

    async fn get_users(&self, ids: &[Uuid]) -> DataResult<HashMap<Uuid, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users: Vec<User> = self
            .collection::<User>(USER_COLLECTION_NAME)
            .find(filter::by_ids(ids), None)
            .await?
            .try_collect()
            .await?;

        Ok(users.into_iter().map(|user| (user.id, user)).collect())
    }

    async fn find_user_by_email(&self, email: impl AsRef<str>) -> DataResult<Option<User>> {
        Ok(self
            .collection::<User>(USER_COLLECTION_NAME)
            .find_one(filter::by_email(email.as_ref().trim()), None)
            .await?)
    }

    async fn add_user_course(&self, user: Uuid, course: Uuid) -> DataResult<()> {
        self.collection::<User>(USER_COLLECTION_NAME)
            .update_one(
                filter::by_id(user),
                doc! { "$addToSet": { "courses": to_bson(course) } },
                None,
            )
            .await?;
        Ok(())
    }
}
