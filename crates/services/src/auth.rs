//! Authentication collaborator boundary.
//!
//! Password hashing and session bookkeeping belong to the host. Services only
//! see this trait, so tests can plug in a trivial implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use focus_core::model::UserId;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("session store failed: {0}")]
    Session(String),
}

/// A signed-in session handed back to the host.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// # Errors
    ///
    /// Returns `AuthError::Hash` if hashing fails.
    async fn hash_password(&self, password: &str) -> Result<String, AuthError>;

    /// `Ok(false)` for a wrong password; `Err` only when the hash is unusable.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Hash` if the stored hash cannot be parsed.
    async fn verify_password(&self, hash: &str, password: &str) -> Result<bool, AuthError>;

    /// Record a session for `user_id` and return when it expires.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session cannot be recorded.
    async fn create_session(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<DateTime<Utc>, AuthError>;

    /// Forget a session. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store fails.
    async fn invalidate_session(&self, token: &str) -> Result<(), AuthError>;
}
