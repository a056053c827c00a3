//! Configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use matching::reminders::WINDOW_SECS;
use matching::{EngineConfig, PenaltyPolicy};

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address.
    pub addr: SocketAddr,
    /// SQLite database URL.
    pub database_url: String,
    /// Telegram ids that receive admin alerts.
    pub admin_ids: Vec<i64>,
    /// Owner telegram id.
    pub owner_id: i64,
    /// Service timezone as hours east of UTC.
    pub utc_offset_hours: i32,
    /// Period of the expiry and reminder sweep.
    pub sweep_interval: Duration,
    /// Decline threshold and block length.
    pub penalty: PenaltyPolicy,
    /// Bot gateway endpoint. Notifications are only logged when unset.
    pub notify_webhook_url: Option<String>,
    /// Emit JSON logs.
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `LISTEN_ADDR` | Server bind address | `127.0.0.1:8790` |
    /// | `DATABASE_URL` | SQLite database URL | `sqlite:cleaning.db?mode=rwc` |
    /// | `ADMIN_IDS` | Comma-separated admin telegram ids | (required) |
    /// | `OWNER_ID` | Owner telegram id | first admin id |
    /// | `SERVICE_UTC_OFFSET_HOURS` | Service timezone | `5` |
    /// | `SWEEP_INTERVAL_SECS` | Sweep period, 1 to 60 | `30` |
    /// | `DECLINE_BLOCK_THRESHOLD` | Declines before a block, at least 1 | `3` |
    /// | `DECLINE_BLOCK_HOURS` | Block length, at least 1 | `12` |
    /// | `NOTIFY_WEBHOOK_URL` | Bot gateway endpoint | (log only) |
    /// | `LOG_FORMAT` | `json` for JSON logs | text |
    pub fn from_env() -> Result<Self, ConfigError> {
        let addr = env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8790".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidAddr)?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:cleaning.db?mode=rwc".to_string());

        let admin_ids = parse_admin_ids(
            &env::var("ADMIN_IDS").map_err(|_| ConfigError::MissingAdminIds)?,
        )?;

        let owner_id = match env::var("OWNER_ID") {
            Ok(raw) => parse_number("OWNER_ID", &raw)?,
            Err(_) => admin_ids.first().copied().ok_or(ConfigError::MissingAdminIds)?,
        };

        Ok(Self {
            addr,
            database_url,
            admin_ids,
            owner_id,
            utc_offset_hours: number_or("SERVICE_UTC_OFFSET_HOURS", 5)?,
            sweep_interval: sweep_interval(number_or("SWEEP_INTERVAL_SECS", 30)?)?,
            penalty: penalty_policy(
                number_or("DECLINE_BLOCK_THRESHOLD", 3)?,
                number_or("DECLINE_BLOCK_HOURS", 12)?,
            )?,
            notify_webhook_url: env::var("NOTIFY_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            json_logs: env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false),
        })
    }

    /// Settings for the matching engine.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(self.admin_ids.clone())
            .with_owner(self.owner_id)
            .with_utc_offset_hours(self.utc_offset_hours)
            .with_penalty(self.penalty)
    }
}

/// Sweep period in seconds.
///
/// Reminder windows are `WINDOW_SECS` wide, so a longer period would skip
/// reminders.
pub fn sweep_interval(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 || secs > WINDOW_SECS.unsigned_abs() {
        return Err(ConfigError::InvalidNumber {
            var: "SWEEP_INTERVAL_SECS",
            value: secs.to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Penalty policy from the decline threshold and block length in hours.
pub fn penalty_policy(threshold: i64, block_hours: i64) -> Result<PenaltyPolicy, ConfigError> {
    if threshold < 1 {
        return Err(ConfigError::InvalidNumber {
            var: "DECLINE_BLOCK_THRESHOLD",
            value: threshold.to_string(),
        });
    }
    let block_duration = chrono::Duration::try_hours(block_hours)
        .filter(|d| *d > chrono::Duration::zero())
        .ok_or_else(|| ConfigError::InvalidNumber {
            var: "DECLINE_BLOCK_HOURS",
            value: block_hours.to_string(),
        })?;

    Ok(PenaltyPolicy {
        threshold,
        block_duration,
    })
}

/// Parse a comma-separated list of admin ids. At least one is required.
pub fn parse_admin_ids(raw: &str) -> Result<Vec<i64>, ConfigError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| parse_number("ADMIN_IDS", part))
        .collect::<Result<Vec<i64>, _>>()?;

    if ids.is_empty() {
        return Err(ConfigError::MissingAdminIds);
    }
    Ok(ids)
}

fn parse_number<T: std::str::FromStr>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}

fn number_or<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(raw) => parse_number(var, &raw),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid LISTEN_ADDR format")]
    InvalidAddr,

    #[error("ADMIN_IDS environment variable is required")]
    MissingAdminIds,

    #[error("Invalid value for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },
}
