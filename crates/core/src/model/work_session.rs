use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{PlanId, SessionId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WorkSessionError {
    #[error("invalid session status: {0}")]
    InvalidStatus(String),

    #[error("invalid difficulty rating: {0}")]
    InvalidRating(String),

    #[error("session is already {0}")]
    AlreadyFinal(SessionStatus),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Stored lifecycle state of a work session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Completed,
    Missed,
    Skipped,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Completed => "completed",
            SessionStatus::Missed => "missed",
            SessionStatus::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Scheduled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = WorkSessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(SessionStatus::Scheduled),
            "completed" => Ok(SessionStatus::Completed),
            "missed" => Ok(SessionStatus::Missed),
            "skipped" => Ok(SessionStatus::Skipped),
            other => Err(WorkSessionError::InvalidStatus(other.to_owned())),
        }
    }
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// How the user felt about a completed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyRating {
    Easy,
    JustRight,
    Challenging,
}

impl DifficultyRating {
    pub const ALL: [DifficultyRating; 3] = [
        DifficultyRating::Easy,
        DifficultyRating::JustRight,
        DifficultyRating::Challenging,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyRating::Easy => "easy",
            DifficultyRating::JustRight => "just_right",
            DifficultyRating::Challenging => "challenging",
        }
    }
}

impl fmt::Display for DifficultyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyRating {
    type Err = WorkSessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(DifficultyRating::Easy),
            "just_right" => Ok(DifficultyRating::JustRight),
            "challenging" => Ok(DifficultyRating::Challenging),
            other => Err(WorkSessionError::InvalidRating(other.to_owned())),
        }
    }
}

//
// ─── WORK SESSION ──────────────────────────────────────────────────────────────
//

/// One calendar day in the ledger: either a focus block or a rest day.
///
/// `plan_id` always points at the plan that was active when the row was
/// written, even after that plan is retired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub scheduled_date: NaiveDate,
    pub planned_duration: u32,
    pub actual_duration: Option<u32>,
    pub is_rest_day: bool,
    pub status: SessionStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub difficulty_rating: Option<DifficultyRating>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkSession {
    /// A not-yet-acted-upon ledger entry.
    #[must_use]
    pub fn scheduled(
        user_id: UserId,
        plan_id: PlanId,
        scheduled_date: NaiveDate,
        planned_duration: u32,
        is_rest_day: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: SessionId::generate(),
            user_id,
            plan_id,
            scheduled_date,
            planned_duration,
            actual_duration: None,
            is_rest_day,
            status: SessionStatus::Scheduled,
            completed_at: None,
            difficulty_rating: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Status as seen on `as_of`: a focus block still `scheduled` after its
    /// date has passed reads as `missed`. Rest days never read as missed.
    #[must_use]
    pub fn effective_status(&self, as_of: NaiveDate) -> SessionStatus {
        match self.status {
            SessionStatus::Scheduled if !self.is_rest_day && as_of > self.scheduled_date => {
                SessionStatus::Missed
            }
            status => status,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// Explicitly skip a pending session.
    ///
    /// # Errors
    ///
    /// Returns `WorkSessionError::AlreadyFinal` if the session already reached
    /// a terminal state.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Result<SessionPatch, WorkSessionError> {
        if self.status.is_terminal() {
            return Err(WorkSessionError::AlreadyFinal(self.status));
        }
        let patch = SessionPatch {
            status: Some(SessionStatus::Skipped),
            ..SessionPatch::touch(now)
        };
        self.apply_patch(&patch);
        Ok(patch)
    }

    /// Apply a storage patch in place.
    pub fn apply_patch(&mut self, patch: &SessionPatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(planned) = patch.planned_duration {
            self.planned_duration = planned;
        }
        if let Some(actual) = patch.actual_duration {
            self.actual_duration = Some(actual);
        }
        if let Some(at) = patch.completed_at {
            self.completed_at = Some(at);
        }
        if let Some(rating) = patch.difficulty_rating {
            self.difficulty_rating = Some(rating);
        }
        if let Some(notes) = &patch.notes {
            self.notes.clone_from(notes);
        }
        self.updated_at = patch.updated_at;
    }
}

/// Partial update for a stored session. `None` leaves a column unchanged;
/// `notes: Some(None)` clears the notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPatch {
    pub status: Option<SessionStatus>,
    pub planned_duration: Option<u32>,
    pub actual_duration: Option<u32>,
    pub completed_at: Option<DateTime<Utc>>,
    pub difficulty_rating: Option<DifficultyRating>,
    pub notes: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl SessionPatch {
    #[must_use]
    pub fn touch(updated_at: DateTime<Utc>) -> Self {
        Self {
            status: None,
            planned_duration: None,
            actual_duration: None,
            completed_at: None,
            difficulty_rating: None,
            notes: None,
            updated_at,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{fixed_now, fixed_today};

    fn build_session(date: NaiveDate, rest: bool) -> WorkSession {
        WorkSession::scheduled(
            UserId::generate(),
            PlanId::generate(),
            date,
            25,
            rest,
            fixed_now(),
        )
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            SessionStatus::Scheduled,
            SessionStatus::Completed,
            SessionStatus::Missed,
            SessionStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!(matches!(
            "done".parse::<SessionStatus>(),
            Err(WorkSessionError::InvalidStatus(_))
        ));
    }

    #[test]
    fn rating_parses_snake_case() {
        assert_eq!(
            "just_right".parse::<DifficultyRating>().unwrap(),
            DifficultyRating::JustRight
        );
        assert!("hard".parse::<DifficultyRating>().is_err());
    }

    #[test]
    fn past_scheduled_session_reads_as_missed() {
        let today = fixed_today();
        let yesterday = today.pred_opt().unwrap();
        let session = build_session(yesterday, false);

        assert_eq!(session.status, SessionStatus::Scheduled);
        assert_eq!(session.effective_status(today), SessionStatus::Missed);
        assert_eq!(
            session.effective_status(yesterday),
            SessionStatus::Scheduled
        );
    }

    #[test]
    fn past_rest_day_is_not_missed() {
        let today = fixed_today();
        let session = build_session(today.pred_opt().unwrap(), true);
        assert_eq!(session.effective_status(today), SessionStatus::Scheduled);
    }

    #[test]
    fn completed_status_is_never_downgraded() {
        let today = fixed_today();
        let mut session = build_session(today.pred_opt().unwrap(), false);
        session.status = SessionStatus::Completed;
        assert_eq!(session.effective_status(today), SessionStatus::Completed);
    }

    #[test]
    fn skip_only_from_scheduled() {
        let mut session = build_session(fixed_today(), false);
        let patch = session.skip(fixed_now()).unwrap();
        assert_eq!(patch.status, Some(SessionStatus::Skipped));
        assert_eq!(session.status, SessionStatus::Skipped);

        let err = session.skip(fixed_now()).unwrap_err();
        assert_eq!(err, WorkSessionError::AlreadyFinal(SessionStatus::Skipped));
    }
}
