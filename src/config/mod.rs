// restoretool/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::cli::Cli;
use crate::errors::AppError;

pub const DEFAULT_MAX_CONCURRENT_RESTORES: usize = 200;
pub const DEFAULT_LOG_FILE: &str = "restoretool.log";
pub const DEFAULT_CONTAINER: &str = "mysql";
pub const DEFAULT_CLIENT_BINARY: &str = "mysql";
pub const MODIFY_DIR_NAME: &str = "modify";

// Structs for deserializing config.json
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// `docker exec -i <container> mysql ...`
    Docker,
    /// A `mysql` client on this host's PATH.
    Local,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonClientConfig {
    pub mode: Option<ClientMode>,
    pub container: Option<String>,
    pub binary: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub max_concurrent_restores: Option<usize>,
    pub log_file: Option<PathBuf>,
    pub command_timeout_secs: Option<u64>,
    pub client: Option<JsonClientConfig>,
}

// Application's internal configuration structs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub mode: ClientMode,
    pub container: String,
    pub binary: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseCredentials {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: Option<String>,
    pub port: Option<u16>,
}

// Keep the password out of logs and panic messages.
impl fmt::Debug for DatabaseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub restore_path: PathBuf,
    pub modify_dir: PathBuf,
    pub max_concurrent_restores: usize,
    pub log_file: PathBuf,
    pub command_timeout: Option<Duration>,
    pub client: ClientConfig,
    pub credentials: DatabaseCredentials,
}

impl AppConfig {
    /// Reads the optional JSON tuning file. A missing file means defaults.
    pub fn load_from_json(config_path: &Path) -> Result<RawJsonConfig> {
        if !config_path.exists() {
            return Ok(RawJsonConfig::default());
        }
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        let raw_json_config: RawJsonConfig = serde_json::from_str(&config_content)
            .with_context(|| {
                format!(
                    "Failed to parse JSON from config file at {}",
                    config_path.display()
                )
            })?;
        Ok(raw_json_config)
    }

    /// Folds CLI flags over the JSON file and attaches the environment credentials.
    pub fn resolve(
        cli: &Cli,
        raw_config: RawJsonConfig,
        credentials: DatabaseCredentials,
    ) -> Result<Self, AppError> {
        let max_concurrent_restores = cli
            .workers
            .or(raw_config.max_concurrent_restores)
            .unwrap_or(DEFAULT_MAX_CONCURRENT_RESTORES);
        if max_concurrent_restores == 0 {
            return Err(AppError::Config(
                "max_concurrent_restores must be at least 1".to_string(),
            ));
        }

        let command_timeout = cli
            .timeout_secs
            .or(raw_config.command_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let raw_client = raw_config.client.unwrap_or_default();
        let client = ClientConfig {
            mode: raw_client.mode.unwrap_or(ClientMode::Docker),
            container: raw_client
                .container
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
            binary: raw_client
                .binary
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLIENT_BINARY.to_string()),
        };

        Ok(AppConfig {
            restore_path: cli.restore_path.clone(),
            modify_dir: cli.folder.join(MODIFY_DIR_NAME),
            max_concurrent_restores,
            log_file: cli
                .log_file
                .clone()
                .or(raw_config.log_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            command_timeout,
            client,
            credentials,
        })
    }
}

/// Loads credentials from the process environment (after `.env` has been applied).
pub fn load_credentials_from_env() -> Result<DatabaseCredentials, AppError> {
    credentials_from_lookup(|key| std::env::var(key).ok())
}

/// `DATABASE_URL` wins when set; otherwise the discrete `DB_*` variables are used.
fn credentials_from_lookup<F>(lookup: F) -> Result<DatabaseCredentials, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(database_url) = non_empty("DATABASE_URL") {
        return credentials_from_url(&database_url);
    }

    let database = non_empty("DB_NAME")
        .ok_or_else(|| AppError::Config("DB_NAME (or DATABASE_URL) must be set".to_string()))?;
    let password = non_empty("DB_PASS")
        .ok_or_else(|| AppError::Config("DB_PASS (or DATABASE_URL) must be set".to_string()))?;
    let port = match non_empty("DB_PORT") {
        Some(port) => Some(
            port.trim()
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("DB_PORT is not a valid port: {}", port)))?,
        ),
        None => None,
    };

    Ok(DatabaseCredentials {
        user: non_empty("DB_USER").unwrap_or_else(|| "root".to_string()),
        password,
        database,
        host: non_empty("DB_HOST"),
        port,
    })
}

fn credentials_from_url(database_url: &str) -> Result<DatabaseCredentials, AppError> {
    let parsed = Url::parse(database_url)?;
    if parsed.scheme() != "mysql" {
        return Err(AppError::Config(format!(
            "DATABASE_URL must use the mysql:// scheme, got {}://",
            parsed.scheme()
        )));
    }
    let database = decode_url_component(parsed.path().trim_start_matches('/'), "database name")?;
    if database.is_empty() {
        return Err(AppError::Config(
            "Database name not found in DATABASE_URL path".to_string(),
        ));
    }
    let password = parsed
        .password()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Config("DATABASE_URL must carry a password".to_string()))?;
    let password = decode_url_component(password, "password")?;
    let user = if parsed.username().is_empty() {
        "root".to_string()
    } else {
        decode_url_component(parsed.username(), "user name")?
    };

    Ok(DatabaseCredentials {
        user,
        password,
        database,
        host: parsed.host_str().map(str::to_string),
        port: parsed.port(),
    })
}

/// `Url` hands back userinfo and path still percent-encoded; the client needs the raw text.
fn decode_url_component(raw: &str, what: &str) -> Result<String, AppError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| AppError::Config(format!("DATABASE_URL {} is not valid UTF-8 once decoded", what)))
}
