//! In-process storage: the ephemeral Entity Store and the expiring cache that
//! holds its login sessions. Nothing here survives a restart.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use verse_core::{
    NewUser, NewUserVerse, NewVerse, Result, Session, SessionStore, User, UserStore, UserVerse,
    UserVerseStore, Verse, VerseError, VerseStore,
};

/// Simple in-memory cache with TTL support
pub struct MemoryCache<V> {
    data: Arc<DashMap<String, CacheEntry<V>>>,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

impl<V: Clone + Send + Sync + 'static> MemoryCache<V> {
    /// Create a cache whose expired entries are swept every `cleanup_interval`.
    /// Must be called inside a tokio runtime.
    pub fn new(cleanup_interval: Duration) -> Self {
        let cache = Self {
            data: Arc::new(DashMap::new()),
        };

        cache.start_cleanup_task(cleanup_interval);

        cache
    }

    /// Get a value from cache
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let value = self.data.get(key).and_then(|entry| {
            if entry.is_expired(now) {
                None
            } else {
                Some(entry.value.clone())
            }
        });

        if value.is_none() {
            self.data.remove_if(key, |_, entry| entry.is_expired(now));
        }
        value
    }

    /// Set a value with TTL
    pub fn set_with_ttl(&self, key: String, value: V, ttl: Duration) {
        self.data.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Delete a key from cache
    pub fn delete(&self, key: &str) {
        self.data.remove(key);
    }

    /// Drop every expired entry, returning how many went.
    pub fn purge_expired(&self) -> usize {
        Self::purge(&self.data)
    }

    fn purge(data: &DashMap<String, CacheEntry<V>>) -> usize {
        let now = Instant::now();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(data.len())
    }

    fn start_cleanup_task(&self, cleanup_interval: Duration) {
        // Weak so the task ends once the cache is dropped
        let data: Weak<DashMap<String, CacheEntry<V>>> = Arc::downgrade(&self.data);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            interval.tick().await;
            loop {
                interval.tick().await;

                let Some(data) = data.upgrade() else {
                    break;
                };
                let removed = Self::purge(&data);
                if removed > 0 {
                    tracing::debug!("Pruned {} expired cache entries", removed);
                }
            }
        });
    }
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    verses: BTreeMap<i64, Verse>,
    user_verses: BTreeMap<i64, UserVerse>,
    // Secondary indexes. Usernames and emails are keyed ASCII-lowercased.
    users_by_username: HashMap<String, i64>,
    users_by_email: HashMap<String, i64>,
    verses_by_reference: HashMap<String, i64>,
    next_user_id: i64,
    next_verse_id: i64,
    next_user_verse_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// Ephemeral Entity Store backed by maps behind a single lock
pub struct MemoryStore {
    tables: RwLock<Tables>,
    sessions: MemoryCache<Session>,
}

impl MemoryStore {
    /// Must be called inside a tokio runtime (starts the session sweeper).
    pub fn new(session_prune_interval: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            sessions: MemoryCache::new(session_prune_interval),
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users_by_username
            .get(&username.to_ascii_lowercase())
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users_by_email
            .get(&email.to_ascii_lowercase())
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let username_key = user.username.to_ascii_lowercase();
        let email_key = user.email.to_ascii_lowercase();

        let mut tables = self.tables.write().await;
        if tables.users_by_username.contains_key(&username_key)
            || tables.users_by_email.contains_key(&email_key)
        {
            return Err(VerseError::ConstraintViolation(
                "username or email already exists".to_string(),
            ));
        }

        let id = Tables::next_id(&mut tables.next_user_id);
        let created = User {
            id,
            username: user.username.clone(),
            password: user.password.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_subscribed: user.is_subscribed,
            created_at: Utc::now(),
        };

        tables.users_by_username.insert(username_key, id);
        tables.users_by_email.insert(email_key, id);
        tables.users.insert(id, created.clone());

        Ok(created)
    }

    async fn update_user_subscription(&self, id: i64, is_subscribed: bool) -> Result<User> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| VerseError::NotFound(format!("user {}", id)))?;
        user.is_subscribed = is_subscribed;
        Ok(user.clone())
    }

    async fn get_subscribed_users(&self) -> Result<Vec<User>> {
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .filter(|u| u.is_subscribed)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl VerseStore for MemoryStore {
    async fn get_verse(&self, id: i64) -> Result<Option<Verse>> {
        Ok(self.tables.read().await.verses.get(&id).cloned())
    }

    async fn get_verse_by_reference(&self, reference: &str) -> Result<Option<Verse>> {
        let tables = self.tables.read().await;
        Ok(tables
            .verses_by_reference
            .get(reference)
            .and_then(|id| tables.verses.get(id))
            .cloned())
    }

    async fn create_verse(&self, verse: &NewVerse) -> Result<Verse> {
        // Check and insert under the same write guard
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .verses_by_reference
            .get(&verse.reference)
            .and_then(|id| tables.verses.get(id))
        {
            return Ok(existing.clone());
        }

        let id = Tables::next_id(&mut tables.next_verse_id);
        let created = Verse {
            id,
            text: verse.text.clone(),
            reference: verse.reference.clone(),
            explanation: verse.explanation.clone(),
            application: verse.application.clone(),
            created_at: Utc::now(),
        };

        tables.verses_by_reference.insert(verse.reference.clone(), id);
        tables.verses.insert(id, created.clone());

        Ok(created)
    }
}

#[async_trait]
impl UserVerseStore for MemoryStore {
    async fn get_user_verse(&self, user_id: i64, verse_id: i64) -> Result<Option<UserVerse>> {
        Ok(self
            .tables
            .read()
            .await
            .user_verses
            .values()
            .find(|uv| uv.user_id == user_id && uv.verse_id == verse_id)
            .cloned())
    }

    async fn create_user_verse(&self, user_verse: &NewUserVerse) -> Result<UserVerse> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_verse.user_id)
            || !tables.verses.contains_key(&user_verse.verse_id)
        {
            return Err(VerseError::NotFound(format!(
                "user {} or verse {}",
                user_verse.user_id, user_verse.verse_id
            )));
        }

        let id = Tables::next_id(&mut tables.next_user_verse_id);
        let created = UserVerse {
            id,
            user_id: user_verse.user_id,
            verse_id: user_verse.verse_id,
            sent_at: Utc::now(),
        };
        tables.user_verses.insert(id, created.clone());

        Ok(created)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, session: &Session) -> Result<()> {
        if !self.tables.read().await.users.contains_key(&session.user_id) {
            return Err(VerseError::NotFound(format!("user {}", session.user_id)));
        }

        // Same resolution as the SQLite column
        let session = Session {
            expires_at: session.expires_at.trunc_subsecs(3),
            ..session.clone()
        };
        let ttl = (session.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.sessions.set_with_ttl(session.id.clone(), session, ttl);
        Ok(())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        Ok(self
            .sessions
            .get(id)
            .filter(|s| !s.is_expired_at(Utc::now())))
    }

    async fn delete_session(&self, id: &str) -> Result<()> {
        self.sessions.delete(id);
        Ok(())
    }

    async fn prune_expired_sessions(&self) -> Result<u64> {
        Ok(self.sessions.purge_expired() as u64)
    }
}
