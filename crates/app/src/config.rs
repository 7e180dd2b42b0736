//! Process configuration read from the environment (and `.env`).

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use services::Clock;

pub const DEFAULT_DB_URL: &str = "sqlite:focus.sqlite3?mode=rwc";
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 30;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
    #[error("{var} must be a date in YYYY-MM-DD form, got {raw:?}")]
    InvalidDate { var: &'static str, raw: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub horizon_weeks: u32,
    pub session_ttl: Duration,
    pub today: Option<NaiveDate>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            horizon_weeks: focus_core::generator::DEFAULT_HORIZON_WEEKS,
            session_ttl: Duration::days(DEFAULT_SESSION_TTL_DAYS),
            today: None,
        }
    }
}

impl AppConfig {
    /// Read `FOCUS_*` variables, falling back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a set but unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("FOCUS_DB_URL") {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Empty {
                    var: "FOCUS_DB_URL",
                });
            }
            config.db_url = trimmed.to_owned();
        }
        if let Some(raw) = lookup("FOCUS_HORIZON_WEEKS") {
            config.horizon_weeks = parse_positive("FOCUS_HORIZON_WEEKS", &raw)?;
        }
        if let Some(raw) = lookup("FOCUS_SESSION_TTL_DAYS") {
            let days = parse_positive("FOCUS_SESSION_TTL_DAYS", &raw)?;
            config.session_ttl = Duration::days(i64::from(days));
        }
        if let Some(raw) = lookup("FOCUS_TODAY") {
            config.today = Some(parse_date("FOCUS_TODAY", &raw)?);
        }
        Ok(config)
    }

    /// Wall clock, or a clock pinned to `today` when one is configured.
    #[must_use]
    pub fn clock(&self) -> Clock {
        self.today.map_or_else(Clock::default_clock, Clock::fixed_on)
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            var,
            raw: raw.to_owned(),
        }),
    }
}

pub fn parse_date(var: &'static str, raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        var,
        raw: raw.to_owned(),
    })
}
