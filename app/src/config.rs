use crate::error::ConfigError;
use chrono_tz::Tz;
use std::env;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// One day
const RESAMPLE_INTERVAL_SECS: RangeInclusive<i64> = 1..=86_400;
/// One leap year
const FEATURE_TTL_MINUTES: RangeInclusive<i64> = 1..=527_040;

#[derive(Debug, Clone)]
pub struct Config {
    server_addr: SocketAddr,
    database_url: String,
    snapshot_path: PathBuf,
    registry_path: PathBuf,
    online_store_url: String,
    model_path: PathBuf,
    resample_interval_secs: i64,
    feature_ttl_minutes: i64,
    calendar_tz: Tz,
    otel_stdout: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            database_url: "sqlite://database/elevator.db".to_owned(),
            snapshot_path: PathBuf::from("data/feature_engineered_data.parquet"),
            registry_path: PathBuf::from("data/registry.json"),
            online_store_url: "sqlite://data/online_store.db".to_owned(),
            model_path: PathBuf::from("models/random_forest_model.json"),
            resample_interval_secs: 10,
            feature_ttl_minutes: 10,
            calendar_tz: chrono_tz::UTC,
            otel_stdout: false,
        }
    }
}

impl Config {
    /// Reads the config from the environment, after loading `.env`.
    ///
    /// Unset variables keep their default.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let defaults = Config::default();

        Ok(Config {
            server_addr: parse_var("SERVER_ADDR", defaults.server_addr)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            snapshot_path: parse_var("SNAPSHOT_PATH", defaults.snapshot_path)?,
            registry_path: parse_var("REGISTRY_PATH", defaults.registry_path)?,
            online_store_url: env::var("ONLINE_STORE_URL").unwrap_or(defaults.online_store_url),
            model_path: parse_var("MODEL_PATH", defaults.model_path)?,
            resample_interval_secs: parse_bounded(
                "RESAMPLE_INTERVAL_SECS",
                defaults.resample_interval_secs,
                RESAMPLE_INTERVAL_SECS,
            )?,
            feature_ttl_minutes: parse_bounded(
                "FEATURE_TTL_MINUTES",
                defaults.feature_ttl_minutes,
                FEATURE_TTL_MINUTES,
            )?,
            calendar_tz: parse_var("CALENDAR_TZ", defaults.calendar_tz)?,
            otel_stdout: parse_var("OTEL_STDOUT", defaults.otel_stdout)?,
        })
    }

    /// Moves every file of the config below `root`.
    #[cfg(test)]
    pub fn rooted_at(root: &Path) -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: format!("sqlite://{}", root.join("database/elevator.db").display()),
            snapshot_path: root.join("data/feature_engineered_data.parquet"),
            registry_path: root.join("data/registry.json"),
            online_store_url: format!("sqlite://{}", root.join("data/online_store.db").display()),
            model_path: root.join("models/random_forest_model.json"),
            ..Config::default()
        }
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn online_store_url(&self) -> &str {
        &self.online_store_url
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn resample_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.resample_interval_secs)
    }

    pub fn feature_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.feature_ttl_minutes)
    }

    pub fn calendar_tz(&self) -> Tz {
        self.calendar_tz
    }

    pub fn otel_stdout(&self) -> bool {
        self.otel_stdout
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        Err(_) => Ok(default),
    }
}

fn parse_bounded(
    key: &'static str,
    default: i64,
    range: RangeInclusive<i64>,
) -> Result<i64, ConfigError> {
    let value = parse_var(key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(key, value.to_string()))
    }
}
