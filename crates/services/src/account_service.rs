use std::sync::Arc;

use rand::Rng;

use focus_core::input::Credentials;
use focus_core::model::{User, UserId};
use storage::repository::{StorageError, UserRepository};

use crate::auth::{AuthSession, Authenticator};
use crate::error::AccountError;

const TOKEN_BYTES: usize = 20;

fn generate_session_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::rng().random();
    hex::encode(bytes)
}

/// Registration, sign-in and account removal.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    auth: Arc<dyn Authenticator>,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, auth: Arc<dyn Authenticator>) -> Self {
        Self { users, auth }
    }

    async fn open_session(&self, user_id: UserId) -> Result<AuthSession, AccountError> {
        let token = generate_session_token();
        let expires_at = self.auth.create_session(&token, user_id).await?;
        Ok(AuthSession {
            token,
            user_id,
            expires_at,
        })
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UsernameTaken` if the name is in use.
    pub async fn register(
        &self,
        credentials: &Credentials,
    ) -> Result<(User, AuthSession), AccountError> {
        if self
            .users
            .find_user_by_username(&credentials.username)
            .await?
            .is_some()
        {
            return Err(AccountError::UsernameTaken);
        }

        let user = User {
            id: UserId::generate(),
            username: credentials.username.clone(),
            password_hash: self.auth.hash_password(&credentials.password).await?,
        };
        match self.users.insert_user(&user).await {
            Ok(()) => {}
            Err(StorageError::Conflict) => return Err(AccountError::UsernameTaken),
            Err(other) => return Err(other.into()),
        }

        let session = self.open_session(user.id).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "account registered");
        Ok((user, session))
    }

    /// # Errors
    ///
    /// Returns `AccountError::InvalidCredentials` for an unknown user or a
    /// wrong password, without saying which.
    pub async fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<(User, AuthSession), AccountError> {
        let Some(user) = self
            .users
            .find_user_by_username(&credentials.username)
            .await?
        else {
            tracing::debug!(username = %credentials.username, "sign-in for unknown user");
            return Err(AccountError::InvalidCredentials);
        };

        if !self
            .auth
            .verify_password(&user.password_hash, &credentials.password)
            .await?
        {
            tracing::debug!(user_id = %user.id, "sign-in with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        let session = self.open_session(user.id).await?;
        Ok((user, session))
    }

    /// # Errors
    ///
    /// Returns `AccountError::Auth` if the session store fails.
    pub async fn sign_out(&self, token: &str) -> Result<(), AccountError> {
        self.auth.invalidate_session(token).await?;
        Ok(())
    }

    /// Remove the account and everything it owns, then end the session.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Storage` if the account cannot be removed.
    pub async fn delete_account(
        &self,
        user_id: UserId,
        token: Option<&str>,
    ) -> Result<(), AccountError> {
        self.users.delete_user(user_id).await?;
        if let Some(token) = token {
            self.auth.invalidate_session(token).await?;
        }
        tracing::info!(%user_id, "account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthError;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use focus_core::time::fixed_now;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use storage::repository::InMemoryRepository;

    /// Reversible "hash" so tests stay fast.
    #[derive(Default)]
    struct PlainAuth {
        sessions: Mutex<HashMap<String, UserId>>,
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

    fn service() -> (AccountService, Arc<PlainAuth>, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let auth = Arc::new(PlainAuth::default());
        let svc = AccountService::new(Arc::new(repo.clone()), auth.clone());
        (svc, auth, repo)
    }

    #[test]
    fn tokens_are_hex_and_distinct() {
        let a = generate_session_token();
        let b = generate_session_token();
        assert_eq!(a.len(), TOKEN_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn register_then_sign_in() {
        let (svc, auth, _repo) = service();
        let creds = Credentials::parse("alice", "secret1").unwrap();
        let (user, session) = svc.register(&creds).await.unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.expires_at, fixed_now() + Duration::hours(1));
        assert_ne!(user.password_hash, "secret1");

        let (again, second) = svc.sign_in(&creds).await.unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(auth.sessions.lock().unwrap().len(), 2);

        svc.sign_out(&second.token).await.unwrap();
        assert_eq!(auth.sessions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (svc, _auth, _repo) = service();
        let creds = Credentials::parse("bob", "secret1").unwrap();
        svc.register(&creds).await.unwrap();
        let err = svc.register(&creds).await.unwrap_err();
        assert_eq!(err.to_string(), "Username already taken");
    }

    #[tokio::test]
    async fn bad_credentials_share_one_message() {
        let (svc, _auth, _repo) = service();
        svc.register(&Credentials::parse("carol", "secret1").unwrap())
            .await
            .unwrap();

        let wrong_password = svc
            .sign_in(&Credentials::parse("carol", "secret2").unwrap())
            .await
            .unwrap_err();
        let unknown_user = svc
            .sign_in(&Credentials::parse("nobody", "secret1").unwrap())
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), "Incorrect username or password");
        assert_eq!(unknown_user.to_string(), wrong_password.to_string());
    }

    #[tokio::test]
    async fn delete_account_removes_user_and_session() {
        let (svc, auth, repo) = service();
        let (user, session) = svc
            .register(&Credentials::parse("dave", "secret1").unwrap())
            .await
            .unwrap();

        svc.delete_account(user.id, Some(&session.token))
            .await
            .unwrap();
        assert!(auth.sessions.lock().unwrap().is_empty());
        assert!(matches!(
            repo.get_user(user.id).await,
            Err(StorageError::NotFound)
        ));
    }
}
