//! Authentication service

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, SubsecRound, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;
use tracing::{debug, info};
use verse_core::{EntityStore, NewUser, RegisterRequest, Result, Session, User, VerseError};

const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

pub struct AuthService {
    store: Arc<dyn EntityStore>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn EntityStore>, session_ttl: Duration) -> Self {
        Self { store, session_ttl }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<(User, Session)> {
        validate_registration(&req)?;

        // Friendlier message than the store's constraint error
        if self.store.get_user_by_username(req.username.trim()).await?.is_some() {
            return Err(VerseError::ConstraintViolation(
                "Username already exists".to_string(),
            ));
        }
        if self.store.get_user_by_email(req.email.trim()).await?.is_some() {
            return Err(VerseError::ConstraintViolation(
                "Email already registered".to_string(),
            ));
        }

        let user = self
            .store
            .create_user(&NewUser {
                username: req.username.trim().to_string(),
                password: hash_password(&req.password)?,
                email: req.email.trim().to_string(),
                full_name: req.full_name.trim().to_string(),
                is_subscribed: req.is_subscribed,
            })
            .await?;
        info!("Registered user {} ({})", user.id, user.username);

        let session = self.start_session(user.id).await?;
        Ok((user, session))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(User, Session)> {
        let user = self.store.get_user_by_username(username.trim()).await?;

        if let Some(user) = user {
            if verify_password(password, &user.password)? {
                let session = self.start_session(user.id).await?;
                return Ok((user, session));
            }
        }

        Err(VerseError::AuthenticationFailed(
            "Invalid username or password".to_string(),
        ))
    }

    pub async fn logout(&self, token: &str) -> Result<()> {
        self.store.delete_session(token).await
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let session = self
            .store
            .get_session(token)
            .await?
            .ok_or_else(|| VerseError::AuthenticationFailed("Session expired".to_string()))?;

        self.store
            .get_user(session.user_id)
            .await?
            .ok_or_else(|| VerseError::AuthenticationFailed("User not found".to_string()))
    }

    async fn start_session(&self, user_id: i64) -> Result<Session> {
        // Millisecond precision, the resolution the durable store keeps
        let expires_at = Utc::now()
            .checked_add_signed(self.session_ttl)
            .ok_or_else(|| VerseError::Internal("Session expiry out of range".to_string()))?
            .trunc_subsecs(3);
        let session = Session {
            id: generate_token(),
            user_id,
            expires_at,
        };
        self.store.create_session(&session).await?;
        debug!("Started session for user {}", user_id);
        Ok(session)
    }
}

fn validate_registration(req: &RegisterRequest) -> Result<()> {
    if req.username.trim().chars().count() < MIN_USERNAME_LEN {
        return Err(VerseError::Validation(
            "Username must be at least 3 characters".to_string(),
        ));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(VerseError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }
    if !req.email.contains('@') {
        return Err(VerseError::Validation("Invalid email address".to_string()));
    }
    if req.full_name.trim().is_empty() {
        return Err(VerseError::Validation("Full name is required".to_string()));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| VerseError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored)
        .map_err(|e| VerseError::Internal(format!("Invalid password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// 256-bit random session token, hex encoded
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> AuthService {
        let store = Arc::new(MemoryStore::new(std::time::Duration::from_secs(60)));
        AuthService::new(store, Duration::hours(1))
    }

    fn registration(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: "correct horse".to_string(),
            email: email.to_string(),
            full_name: "Alice Smith".to_string(),
            is_subscribed: true,
        }
    }

    #[tokio::test]
    async fn test_register_then_login() -> Result<()> {
        let auth = service();

        let (user, session) = auth
            .register(registration("alice", "alice@example.com"))
            .await?;
        assert_ne!(user.password, "correct horse");
        assert_eq!(session.id.len(), 64);
        assert_eq!(auth.authenticate(&session.id).await?.id, user.id);

        let (again, second) = auth.login("ALICE", "correct horse").await?;
        assert_eq!(again.id, user.id);
        assert_ne!(second.id, session.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() -> Result<()> {
        let auth = service();
        auth.register(registration("alice", "alice@example.com"))
            .await?;

        let wrong = auth.login("alice", "wrong password").await;
        assert!(matches!(wrong, Err(VerseError::AuthenticationFailed(_))));

        let unknown = auth.login("nobody", "correct horse").await;
        assert!(matches!(unknown, Err(VerseError::AuthenticationFailed(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_validation_and_duplicates() -> Result<()> {
        let auth = service();

        let mut short = registration("al", "al@example.com");
        assert!(matches!(
            auth.register(short.clone()).await,
            Err(VerseError::Validation(_))
        ));
        short.username = "alice".to_string();
        short.password = "12345".to_string();
        assert!(matches!(
            auth.register(short).await,
            Err(VerseError::Validation(_))
        ));

        auth.register(registration("alice", "alice@example.com"))
            .await?;
        assert!(matches!(
            auth.register(registration("Alice", "new@example.com")).await,
            Err(VerseError::ConstraintViolation(_))
        ));
        assert!(matches!(
            auth.register(registration("alicia", "ALICE@example.com")).await,
            Err(VerseError::ConstraintViolation(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_login_trims_username_like_register() -> Result<()> {
        let auth = service();
        let (user, _) = auth
            .register(registration(" alice ", "alice@example.com"))
            .await?;
        assert_eq!(user.username, "alice");

        let (again, _) = auth.login(" alice ", "correct horse").await?;
        assert_eq!(again.id, user.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_session_expiry_overflow_is_an_error() -> Result<()> {
        let store = Arc::new(MemoryStore::new(std::time::Duration::from_secs(60)));
        let auth = AuthService::new(store, Duration::MAX);

        let result = auth
            .register(registration("alice", "alice@example.com"))
            .await;
        assert!(matches!(result, Err(VerseError::Internal(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_session_expiry_has_millisecond_precision() -> Result<()> {
        let auth = service();
        let (_, session) = auth
            .register(registration("alice", "alice@example.com"))
            .await?;
        assert_eq!(session.expires_at.timestamp_subsec_nanos() % 1_000_000, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_logout_ends_session() -> Result<()> {
        let auth = service();
        let (_, session) = auth
            .register(registration("alice", "alice@example.com"))
            .await?;

        auth.logout(&session.id).await?;
        assert!(matches!(
            auth.authenticate(&session.id).await,
            Err(VerseError::AuthenticationFailed(_))
        ));
        Ok(())
    }
}
