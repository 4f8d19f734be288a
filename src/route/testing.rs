//! Local clients for endpoint tests.
//!
//! The MongoDB client connects lazily, so everything decided before the first
//! query (guards, body parsing, validation) is testable without a database.
//! Tests that do reach MongoDB are ignored by default and use `MONGODB_URI`.

use mongodb::Database;
use rocket::http::{Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::data::user::db::{UserDbExt, UserSignupData};
use crate::data::user::User;
use crate::resp::jwt::UserRoleToken;
use crate::role::Role;
use crate::security::test_security;

pub async fn client() -> Client {
    let mut config = Config::default();
    config.password_cost = 4;
    config.mongodb_db = format!("courseware_test_{}", Uuid::new_v4().simple());

    let mongo = mongodb::Client::with_uri_str(&config.mongodb_uri)
        .await
        .expect("invalid MongoDB URI");
    let db = mongo.database(&config.mongodb_db);

    let rocket = crate::build(config, test_security().clone(), db).expect("invalid backend");
    Client::tracked(rocket).await.expect("invalid backend")
}

pub fn db(client: &Client) -> &Database {
    client.rocket().state().expect("database isn't managed")
}

pub fn bearer(user: Uuid, role: Role) -> Header<'static> {
    let token = UserRoleToken::for_user(user, role, chrono::Duration::hours(1))
        .encode_jwt(&test_security().jwt_keys.private)
        .expect("unable to encode token");
    Header::new("Authorization", format!("Bearer {}", token))
}

pub fn bearer_for(user: &User) -> Header<'static> {
    bearer(user.id, user.account_type)
}

pub async fn create_user(db: &Database, first_name: &str, role: Role) -> User {
    let user = UserSignupData {
        email: format!("{}-{}@example.com", first_name.to_lowercase(), Uuid::new_v4().simple()),
        password: "correct horse battery".to_string(),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        account_type: role,
    }
    .into_user(&test_security().salt, 4);

    db.create_user(&user).await.expect("unable to create test user");
    user
}

/// Asserts the status and returns the JSON body.
pub async fn expect_json(response: LocalResponse<'_>, status: Status) -> Value {
    assert_eq!(response.status(), status, "unexpected response status");
    response
        .into_json::<Value>()
        .await
        .expect("response body isn't JSON")
}

pub async fn drop_db(client: &Client) {
    db(client).drop(None).await.expect("unable to drop test database");
}
