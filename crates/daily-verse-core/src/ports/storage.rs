//! Storage traits for persistence
//!
//! Both backends (durable SQL and in-process maps) implement every trait here
//! and must return the same results for the same sequence of calls.

use crate::Result;
use async_trait::async_trait;
use daily_verse_types::{NewUser, NewUserVerse, NewVerse, Session, User, UserVerse, Verse};

/// User store
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    /// Case-insensitive exact match
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    /// Case-insensitive exact match
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Fails with `ConstraintViolation` if the username or email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User>;
    /// Fails with `NotFound` for an unknown id.
    async fn update_user_subscription(&self, id: i64, is_subscribed: bool) -> Result<User>;
    /// Subscribed users, ordered by id.
    async fn get_subscribed_users(&self) -> Result<Vec<User>>;
}

/// Verse store
#[async_trait]
pub trait VerseStore: Send + Sync {
    async fn get_verse(&self, id: i64) -> Result<Option<Verse>>;
    async fn get_verse_by_reference(&self, reference: &str) -> Result<Option<Verse>>;
    /// Returns the existing record unchanged when the reference is already stored.
    async fn create_verse(&self, verse: &NewVerse) -> Result<Verse>;
}

/// Sent-verse log
#[async_trait]
pub trait UserVerseStore: Send + Sync {
    async fn get_user_verse(&self, user_id: i64, verse_id: i64) -> Result<Option<UserVerse>>;
    /// Always inserts. Fails with `NotFound` if either parent is missing.
    async fn create_user_verse(&self, user_verse: &NewUserVerse) -> Result<UserVerse>;
}

/// Login session store
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &Session) -> Result<()>;
    /// Expired sessions are reported as absent.
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;
    async fn delete_session(&self, id: &str) -> Result<()>;
    /// Drops expired sessions, returning how many were removed.
    async fn prune_expired_sessions(&self) -> Result<u64>;
}

/// Everything the application persists, behind one handle.
pub trait EntityStore: UserStore + VerseStore + UserVerseStore + SessionStore {}

impl<T> EntityStore for T where T: UserStore + VerseStore + UserVerseStore + SessionStore {}
