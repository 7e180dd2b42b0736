use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{ProgressionId, UserId};
use crate::model::plan::FocusDuration;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressionTypeError {
    #[error("invalid progression type: {0}")]
    Invalid(String),
}

/// How a tier change was initiated.
///
/// - `Auto`: the user accepted the suggestion once the plan became eligible
/// - `Manual`: the user applied the suggestion ahead of eligibility
/// - `Custom`: the user picked their own duration/frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionType {
    Auto,
    Manual,
    Custom,
}

impl ProgressionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressionType::Auto => "auto",
            ProgressionType::Manual => "manual",
            ProgressionType::Custom => "custom",
        }
    }
}

impl fmt::Display for ProgressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressionType {
    type Err = ProgressionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ProgressionType::Auto),
            "manual" => Ok(ProgressionType::Manual),
            "custom" => Ok(ProgressionType::Custom),
            other => Err(ProgressionTypeError::Invalid(other.to_owned())),
        }
    }
}

/// Immutable audit record of a committed tier change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progression {
    pub id: ProgressionId,
    pub user_id: UserId,
    pub previous_duration: FocusDuration,
    pub previous_frequency: u8,
    pub new_duration: FocusDuration,
    pub new_frequency: u8,
    pub progression_type: ProgressionType,
    pub created_at: DateTime<Utc>,
}

impl Progression {
    /// True when the record changes neither duration nor frequency.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.previous_duration == self.new_duration
            && self.previous_frequency == self.new_frequency
    }
}
