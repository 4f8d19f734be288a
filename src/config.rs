use crate::error::ConfigurationError;
use crate::util;
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("courseware".to_string())
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    env::var(key)
        .ok()
        .and_then(|it| it.parse().ok())
        .unwrap_or(fallback)
}

fn default_token_lifetime_days() -> i64 {
    env_or("TOKEN_LIFETIME_DAYS", 30)
}

fn default_password_cost() -> u32 {
    env_or("PASSWORD_COST", 10)
}

fn default_jwt_key_bits() -> usize {
    env_or("JWT_KEY_BITS", 2048)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    /// How long issued session tokens stay valid.
    #[serde(default = "default_token_lifetime_days")]
    pub token_lifetime_days: i64,
    /// bcrypt cost used for password hashes.
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
    /// Size of generated JWT signing keys.
    #[serde(default = "default_jwt_key_bits")]
    pub jwt_key_bits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            token_lifetime_days: default_token_lifetime_days(),
            password_cost: default_password_cost(),
            jwt_key_bits: default_jwt_key_bits(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        Config::load_from(config_file)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, ConfigurationError> {
        let file = File::open(path.as_ref())?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = path.as_ref().to_path_buf();

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    pub fn token_lifetime(&self) -> chrono::Duration {
        chrono::Duration::days(self.token_lifetime_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = serde_yaml::from_str("mongodb_db: testing\n").unwrap();

        assert_eq!(config.mongodb_db, "testing");
        assert_eq!(config.mongodb_uri, default_mongodb_uri());
        assert_eq!(config.token_lifetime_days, default_token_lifetime_days());
        assert_eq!(config.password_cost, default_password_cost());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = env::temp_dir().join(format!("courseware-config-{}", uuid::Uuid::new_v4()));
        let mut config = Config::default();
        config.file_path = dir.join("settings.yml");
        config.mongodb_db = "saved".to_string();
        config.token_lifetime_days = 7;

        config.save().expect("unable to save config");
        let loaded = Config::load_from(dir.join("settings.yml")).expect("unable to load config");

        assert_eq!(loaded.mongodb_db, "saved");
        assert_eq!(loaded.token_lifetime(), chrono::Duration::days(7));

        fs::remove_dir_all(dir).ok();
    }
}
