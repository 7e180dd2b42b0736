//! Shared error types for the services crate.

use thiserror::Error;

use focus_core::input::ValidationError;
use focus_core::model::{PlanError, WorkSessionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::auth::AuthError;

/// Where the host should send the user instead of rendering an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Onboarding,
}

/// Errors emitted by plan, session, dashboard, history and progression services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("no active plan; onboarding required")]
    NeedsOnboarding,
    #[error("plan is not yet eligible to progress")]
    NotEligible,
    #[error("work session not found")]
    SessionNotFound,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    WorkSession(#[from] WorkSessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// Redirect target for errors that are part of normal navigation.
    #[must_use]
    pub fn fallback(&self) -> Option<Fallback> {
        match self {
            ServiceError::NeedsOnboarding => Some(Fallback::Onboarding),
            _ => None,
        }
    }
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Incorrect username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
