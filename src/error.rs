use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("configuration file not found in '{0}'")]
    NotFound(PathBuf),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("password salt missing from '{0}'")]
    MissingSalt(PathBuf),
    #[error("JWT keys missing from '{0}'")]
    MissingKeys(PathBuf),
    #[error("unable to generate RSA key: {0}")]
    KeyGeneration(#[from] rsa::Error),
    #[error("unable to encode RSA private key: {0}")]
    PrivateKeyEncoding(#[from] rsa::pkcs1::Error),
    #[error("unable to encode RSA public key: {0}")]
    PublicKeyEncoding(#[from] rsa::pkcs8::spki::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Security(#[from] SecurityError),

    // External errors
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
    #[error(transparent)]
    Cors(#[from] rocket_cors::Error),
}

/// Kind of document a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Course,
    Assignment,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entity::User => write!(f, "user"),
            Entity::Course => write!(f, "course"),
            Entity::Assignment => write!(f, "assignment"),
        }
    }
}

/// Business rule violations. Each maps onto one problem type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("{0} not found")]
    NotFound(Entity, Uuid),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotAuthorized(String),
    #[error("user is not a {0}")]
    WrongRole(crate::role::Role),
    #[error("email already registered")]
    EmailTaken(String),
    #[error("this course already has an assignment; only one assignment is allowed per course")]
    AssignmentAlreadyExists,
    #[error("student already enrolled")]
    AlreadyEnrolled,
    #[error("this assignment is for individual submission only")]
    WrongSubmissionMode,
    #[error("unrecognized submission type '{0}'")]
    InvalidSubmissionType(String),
    #[error("some students are not enrolled in this course")]
    MemberNotEnrolled(Vec<Uuid>),
    #[error("one or more members already belong to another group for this assignment")]
    MemberAlreadyGrouped(Vec<Uuid>),
    #[error("assignment already submitted")]
    AlreadySubmitted,
    #[error("you are not part of any group for this assignment")]
    NotInGroup,
    #[error("only the group leader can submit the group assignment")]
    NotGroupLeader,
}

impl RuleError {
    pub fn validation(message: impl ToString) -> RuleError {
        RuleError::Validation(message.to_string())
    }

    pub fn not_authorized(message: impl ToString) -> RuleError {
        RuleError::NotAuthorized(message.to_string())
    }
}

/// Failure of a data layer operation.
#[derive(Debug, Error)]
pub enum DataError {
    #[error(transparent)]
    Rule(#[from] RuleError),
    #[error(transparent)]
    Database(#[from] mongodb::error::Error),
}

pub type DataResult<T> = Result<T, DataError>;
