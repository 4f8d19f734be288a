use bson::spec::BinarySubtype;
use bson::Binary;
use crypto::bcrypt::bcrypt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::convert::TryInto;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::ids::uuid_list_as_binary;
use crate::role::Role;
use crate::security::Salt;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "user";

/// Salted SHA-256 + bcrypt digest, stored with the bcrypt cost it was made with.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordHash {
    cost: u32,
    hash: [u8; 24],
}

fn digest(password: &str, salt: &Salt, cost: u32) -> [u8; 24] {
    let mut pw_hash: [u8; 24] = [0; 24];

    let mut sha = Sha256::new();
    sha2::Digest::update(&mut sha, password.as_bytes());

    bcrypt(cost, salt, sha.finalize().as_slice(), &mut pw_hash);

    pw_hash
}

impl PasswordHash {
    pub fn new(password: impl AsRef<str>, salt: &Salt, cost: u32) -> PasswordHash {
        PasswordHash {
            cost,
            hash: digest(password.as_ref(), salt, cost),
        }
    }

    /// Checks `password` using the cost this hash was created with.
    pub fn verify(&self, password: impl AsRef<str>, salt: &Salt) -> bool {
        digest(password.as_ref(), salt, self.cost) == self.hash
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasswordHash(cost: {}, ..)", self.cost)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredHash {
    cost: u32,
    hash: Binary,
}

impl Serialize for PasswordHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StoredHash {
            cost: self.cost,
            hash: Binary {
                subtype: BinarySubtype::Generic,
                bytes: self.hash.to_vec(),
            },
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PasswordHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = StoredHash::deserialize(deserializer)?;
        let hash = stored
            .hash
            .bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("stored password hash has wrong length"))?;

        Ok(PasswordHash {
            cost: stored.cost,
            hash,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", with = "bson::serde_helpers::uuid_1_as_binary")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub pw_hash: PasswordHash,
    pub account_type: Role,
    #[serde(default, with = "uuid_list_as_binary")]
    pub courses: Vec<Uuid>,
}

impl User {
    pub fn name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// User as presented by the API. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub account_type: Role,
    pub courses: Vec<Uuid>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            account_type: user.account_type,
            courses: user.courses,
        }
    }
}

/// Short form of a user embedded in course, group and roster views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_user(first_name: &str, role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        email: format!("{}@example.com", first_name.to_lowercase()),
        pw_hash: PasswordHash {
            cost: 4,
            hash: [0; 24],
        },
        account_type: role,
        courses: vec![],
    }
}
