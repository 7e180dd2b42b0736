use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use focus_core::model::UserId;
use focus_core::time::fixed_now;
use services::{AuthError, Authenticator};

/// Session store with a reversible "hash"; enough to drive account flows.
#[derive(Default)]
pub struct PlainAuth {
    sessions: Mutex<HashMap<String, UserId>>,
}

impl PlainAuth {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl Authenticator for PlainAuth {
    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        Ok(format!("plain:{password}"))
    }

    async fn verify_password(&self, hash: &str, password: &str) -> Result<bool, AuthError> {
        Ok(hash == format!("plain:{password}"))
    }

    async fn create_session(
        &self,
        token: &str,
        user_id: UserId,
    ) -> Result<DateTime<Utc>, AuthError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(token.to_owned(), user_id);
        Ok(fixed_now() + Duration::hours(1))
    }

    async fn invalidate_session(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.lock().unwrap().remove(token);
        Ok(())
    }
}
