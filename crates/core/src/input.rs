//! Typed operation inputs, validated before anything touches storage.
//!
//! Raw form fields arrive as strings; each `parse` turns them into a value
//! the engine can use directly, or a field-level [`ValidationError`].

use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::completion::Completion;
use crate::model::{
    DifficultyRating, FocusDuration, PlanError, PlanId, ProgressionType, SessionId, WorkDays,
};

pub const MAX_ACTUAL_DURATION_MINUTES: u32 = 600;
pub const MAX_NOTES_CHARS: usize = 2000;
pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 31;
pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 255;

/// A rejected input field.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn parse_number<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ValidationError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ValidationError::new(field, format!("expected a whole number, got {raw:?}")))
}

fn plan_error(field: &'static str, err: &PlanError) -> ValidationError {
    ValidationError::new(field, err.to_string())
}

//
// ─── PLAN SETTINGS ─────────────────────────────────────────────────────────────
//

/// Work days as submitted: a JSON array string or repeated form values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkDaysField {
    Json(String),
    Values(Vec<String>),
}

/// Raw onboarding / settings form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanForm {
    pub focus_duration: String,
    pub days_per_week: String,
    pub work_days: WorkDaysField,
}

/// Validated plan settings, shared by onboarding and settings updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanInput {
    pub focus_duration: FocusDuration,
    pub days_per_week: u8,
    pub work_days: WorkDays,
}

impl PlanInput {
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first invalid field.
    pub fn new(
        focus_minutes: u32,
        days_per_week: u8,
        work_days: &[u8],
    ) -> Result<Self, ValidationError> {
        let focus_duration = FocusDuration::from_minutes(focus_minutes)
            .map_err(|e| plan_error("focus_duration", &e))?;
        if !(1..=7).contains(&days_per_week) {
            return Err(plan_error(
                "days_per_week",
                &PlanError::InvalidDaysPerWeek(days_per_week),
            ));
        }
        let work_days = WorkDays::from_indices(work_days.iter().copied())
            .map_err(|e| plan_error("work_days", &e))?;
        Ok(Self {
            focus_duration,
            days_per_week,
            work_days,
        })
    }

    /// # Errors
    ///
    /// Returns `ValidationError` for unparsable or out-of-range fields.
    pub fn parse(form: &PlanForm) -> Result<Self, ValidationError> {
        let minutes: u32 = parse_number("focus_duration", &form.focus_duration)?;
        let days: u8 = parse_number("days_per_week", &form.days_per_week)?;
        let indices: Vec<u8> = match &form.work_days {
            WorkDaysField::Json(raw) => serde_json::from_str(raw).map_err(|_| {
                ValidationError::new("work_days", "expected a JSON array of weekday numbers")
            })?,
            WorkDaysField::Values(values) => values
                .iter()
                .map(|v| parse_number("work_days", v))
                .collect::<Result<_, _>>()?,
        };
        Self::new(minutes, days, &indices)
    }
}

//
// ─── COMPLETION ────────────────────────────────────────────────────────────────
//

/// Raw completion form. `session_id` is absent for ad-hoc sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionForm {
    pub session_id: Option<String>,
    pub plan_id: String,
    pub actual_duration: String,
    pub difficulty_rating: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompleteSessionInput {
    pub session_id: Option<SessionId>,
    pub plan_id: PlanId,
    pub completion: Completion,
}

impl CompleteSessionInput {
    /// # Errors
    ///
    /// Returns `ValidationError` naming the first invalid field.
    pub fn parse(form: &CompletionForm) -> Result<Self, ValidationError> {
        let session_id = form
            .session_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<SessionId>()
                    .map_err(|e| ValidationError::new("session_id", e.to_string()))
            })
            .transpose()?;
        let plan_id = form
            .plan_id
            .parse::<PlanId>()
            .map_err(|e| ValidationError::new("plan_id", e.to_string()))?;
        let actual: u32 = parse_number("actual_duration", &form.actual_duration)?;
        let rating = form
            .difficulty_rating
            .trim()
            .parse::<DifficultyRating>()
            .map_err(|e| ValidationError::new("difficulty_rating", e.to_string()))?;

        Ok(Self {
            session_id,
            plan_id,
            completion: Completion::new(actual, rating, form.notes.clone())?,
        })
    }
}

pub(crate) fn validate_actual_duration(minutes: u32) -> Result<u32, ValidationError> {
    if (1..=MAX_ACTUAL_DURATION_MINUTES).contains(&minutes) {
        Ok(minutes)
    } else {
        Err(ValidationError::new(
            "actual_duration",
            format!("must be between 1 and {MAX_ACTUAL_DURATION_MINUTES} minutes"),
        ))
    }
}

pub(crate) fn normalize_notes(notes: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(notes) = notes else {
        return Ok(None);
    };
    let trimmed = notes.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_NOTES_CHARS {
        return Err(ValidationError::new(
            "notes",
            format!("must be at most {MAX_NOTES_CHARS} characters"),
        ));
    }
    Ok(Some(trimmed.to_owned()))
}

//
// ─── PROGRESSION ───────────────────────────────────────────────────────────────
//

/// What the user asked for on the progression screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressionRequest {
    /// Take the suggested tier; only allowed once the plan is eligible.
    AcceptSuggestion,
    /// Take the suggested tier regardless of eligibility.
    ApplySuggestion,
    /// Move to an explicit tier.
    Custom {
        duration: FocusDuration,
        frequency: u8,
    },
}

impl ProgressionRequest {
    /// # Errors
    ///
    /// Returns `ValidationError` if duration is off the ladder or frequency is
    /// outside `1..=7`.
    pub fn custom(duration_minutes: u32, frequency: u8) -> Result<Self, ValidationError> {
        let duration = FocusDuration::from_minutes(duration_minutes)
            .map_err(|e| plan_error("new_duration", &e))?;
        if !(1..=7).contains(&frequency) {
            return Err(plan_error(
                "new_frequency",
                &PlanError::InvalidDaysPerWeek(frequency),
            ));
        }
        Ok(Self::Custom {
            duration,
            frequency,
        })
    }

    #[must_use]
    pub fn progression_type(&self) -> ProgressionType {
        match self {
            ProgressionRequest::AcceptSuggestion => ProgressionType::Auto,
            ProgressionRequest::ApplySuggestion => ProgressionType::Manual,
            ProgressionRequest::Custom { .. } => ProgressionType::Custom,
        }
    }
}

//
// ─── CREDENTIALS ───────────────────────────────────────────────────────────────
//

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// # Errors
    ///
    /// Returns `ValidationError` for a malformed username or password.
    pub fn parse(username: &str, password: &str) -> Result<Self, ValidationError> {
        let len = username.chars().count();
        if len < USERNAME_MIN {
            return Err(ValidationError::new(
                "username",
                format!("Username must be at least {USERNAME_MIN} characters"),
            ));
        }
        if len > USERNAME_MAX {
            return Err(ValidationError::new(
                "username",
                format!("Username must be at most {USERNAME_MAX} characters"),
            ));
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ValidationError::new(
                "username",
                "Username can only contain lowercase letters, numbers, underscores, and hyphens",
            ));
        }

        let len = password.chars().count();
        if len < PASSWORD_MIN {
            return Err(ValidationError::new(
                "password",
                format!("Password must be at least {PASSWORD_MIN} characters"),
            ));
        }
        if len > PASSWORD_MAX {
            return Err(ValidationError::new(
                "password",
                format!("Password must be at most {PASSWORD_MAX} characters"),
            ));
        }

        Ok(Self {
            username: username.to_owned(),
            password: password.to_owned(),
        })
    }
}

//
// ─── MONTH ─────────────────────────────────────────────────────────────────────
//

/// A calendar month selected in the history view (`YYYY-MM`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    first_day: NaiveDate,
}

impl YearMonth {
    /// # Errors
    ///
    /// Returns `ValidationError` unless `raw` is exactly `YYYY-MM` with a real month.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::new("month", format!("expected YYYY-MM, got {raw:?}"));
        let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        Ok(Self { first_day })
    }

    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.first_day
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(self.first_day)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.first_day.format("%Y-%m"))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
