use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use sheet::{CellRange, RetryPolicy};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Either TABLE_FILE or SPREADSHEET_ID must be set")]
    MissingStore,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub sheets_api_url: String,
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub sheets_token: Option<String>,
    pub table_file: Option<PathBuf>,
    pub retry: RetryPolicy,
    pub request_timeout: Duration,
    pub resync_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok(), read_secret)
    }

    /// `var` looks up plain settings, `secret` looks up secrets by name.
    pub fn from_lookup<V, S>(var: V, secret: S) -> Result<Self, ConfigError>
    where
        V: Fn(&str) -> Option<String>,
        S: Fn(&str) -> Option<String>,
    {
        let config = Self {
            port: try_load(&var, "PORT", "3000")?,
            sheets_api_url: try_load(&var, "SHEETS_API_URL", "https://sheets.googleapis.com")?,
            spreadsheet_id: try_load(&var, "SPREADSHEET_ID", "")?,
            sheet_name: try_load(&var, "SHEET_NAME", "Sheet1")?,
            sheets_token: secret("SHEETS_TOKEN"),
            table_file: var("TABLE_FILE")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            retry: RetryPolicy::new(
                try_load(&var, "RETRY_ATTEMPTS", "3")?,
                Duration::from_millis(try_load(&var, "RETRY_BASE_MS", "200")?),
                Duration::from_millis(try_load(&var, "RETRY_MAX_MS", "2000")?),
            ),
            request_timeout: Duration::from_millis(try_load(&var, "REQUEST_TIMEOUT_MS", "5000")?),
            resync_interval: Duration::from_secs(try_load(&var, "RESYNC_SECS", "60")?),
        };

        check_sheet_name(&config.sheet_name)?;

        if config.table_file.is_none() && config.spreadsheet_id.trim().is_empty() {
            return Err(ConfigError::MissingStore);
        }

        Ok(config)
    }
}

fn try_load<T: FromStr>(
    var: impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default:?}");
        default.to_string()
    });

    value.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value: value.clone(),
            reason: e.to_string(),
        }
    })
}

/// The name must survive a trip through A1 notation, or every range built
/// from it would address the wrong tab.
fn check_sheet_name(name: &str) -> Result<(), ConfigError> {
    let range = CellRange::columns(name, 0, 0);
    let invalid = |reason: String| ConfigError::Invalid {
        key: "SHEET_NAME",
        value: name.to_string(),
        reason,
    };

    let parsed: CellRange = range.to_string().parse().map_err(|e| invalid(format!("{e}")))?;
    if parsed != range {
        return Err(invalid(format!("reads back as {:?}", parsed.sheet)));
    }

    Ok(())
}

/// Docker secret first, then the environment.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("Secret {secret_name} not readable from {path} ({e}), trying environment");
        })
        .ok()
        .or_else(|| env::var(secret_name).ok())
        .filter(|s| !s.is_empty())
}
