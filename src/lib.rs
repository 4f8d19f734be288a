#![allow(async_fn_in_trait)]

#[macro_use]
extern crate rocket;
#[macro_use]
extern crate serde;

use mongodb::{Client, Database};
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::error::{BackendError, ConfigurationError};
use crate::route::mount_api;
use crate::security::Security;

pub mod config;
pub mod data;
pub mod error;
pub mod resp;
pub mod role;
pub mod route;
pub mod security;
pub mod util;

/// Assembles the server from already prepared state without touching the network.
pub fn build(config: Config, security: Security, db: Database) -> Result<Rocket<Build>, BackendError> {
    let cors = rocket_cors::CorsOptions {
        allowed_origins: AllowedOrigins::All,
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()?;

    let r = rocket::build()
        .manage(config)
        .manage(security)
        .manage(db)
        .attach(cors);

    Ok(mount_api(r))
}

fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global logger: {}", err);
    }
    if let Err(err) = tracing_log::LogTracer::init() {
        tracing::warn!("Unable to forward log records: {}", err);
    }
}

fn load_config() -> Result<Config, ConfigurationError> {
    match Config::load() {
        Ok(c) => {
            tracing::info!("Configuration loaded.");
            Ok(c)
        }
        Err(ConfigurationError::NotFound(dir)) => {
            tracing::info!("No configuration in '{}', using defaults.", dir.display());
            let c = Config::default();
            if let Err(err) = c.save() {
                tracing::warn!("Unable to save generated configuration: {}", err);
            }
            Ok(c)
        }
        Err(other) => {
            tracing::error!("Configuration error: {}", other);
            Err(other)
        }
    }
}

pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(l) = log_level {
        init_logging(l);
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let c = load_config()?;

    tracing::info!("Initializing security material...");
    let security = Security::load(c.jwt_key_bits)?;

    tracing::info!("Connecting to MongoDB: {}", c.mongodb_uri);
    let client = Client::with_uri_str(c.mongodb_uri.as_str()).await?;

    tracing::info!("Using MongoDB database: {}", c.mongodb_db);
    let db = client.database(c.mongodb_db.as_str());

    if let Err(err) = db.list_collection_names(None).await {
        tracing::error!("Unable to connect to MongoDB.");
        return Err(err.into());
    }

    tracing::info!("Starting HTTP server...");
    build(c, security, db)
}
