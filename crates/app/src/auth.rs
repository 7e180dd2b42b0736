//! Argon2id password hashing and an in-process session table.

use std::collections::HashMap;

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use focus_core::model::UserId;
use services::{AuthError, Authenticator, Clock};

fn hash_blocking(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_blocking(hash: &str, password: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hash(e.to_string())),
    }
}

struct SessionEntry {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

pub struct LocalAuthenticator {
    clock: Clock,
    ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl LocalAuthenticator {
    #[must_use]
    pub fn new(clock: Clock, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// The user behind a live session. Expired entries are dropped on lookup.
    pub async fn resolve(&self, token: &str) -> Option<UserId> {
        let mut sessions = self.sessions.lock().await;
        let entry = sessions.get(token)?;
        if entry.expires_at <= self.clock.now() {
            sessions.remove(token);
            tracing::debug!("session expired");
            return None;
        }
        Some(entry.user_id)
    }
}

#[async_trait]
impl Authenticator for LocalAuthenticator {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hash_blocking(&password))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    async fn verify_password(&self, hash: &str, password: &str) -> Result<bool, AuthError> {
        let (hash, password) = (hash.to_owned(), password.to_owned());
        tokio::task::spawn_blocking(move || verify_blocking(&hash, &password))
            .await
            .map_err(|e| AuthError::Hash(e.to_string()))?
    }

    async fn create_session(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<DateTime<Utc>, AuthError> {
        let expires_at = self.clock.now() + self.ttl;
        self.sessions.lock().await.insert(
            token.to_owned(),
            SessionEntry {
                user_id,
                expires_at,
            },
        );
        Ok(expires_at)
    }

    async fn invalidate_session(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.lock().await.remove(token);
        Ok(())
    }
}
