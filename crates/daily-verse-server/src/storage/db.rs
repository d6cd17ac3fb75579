//! SQLite database layer (embedded, no external dependencies)

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use verse_core::{
    NewUser, NewUserVerse, NewVerse, Session, SessionStore, User, UserStore, UserVerse,
    UserVerseStore, Verse, VerseError, VerseStore,
};

pub struct Database {
    pool: Arc<SqlitePool>,
}

impl Database {
    pub async fn new(database_path: &str) -> Result<Self> {
        tracing::info!("Opening SQLite database at: {}", database_path);

        // Create parent directory if needed
        if let Some(parent) = std::path::Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                tracing::info!("Creating parent directory: {}", parent.display());
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .with_context(|| {
                format!("Failed to connect to SQLite database at: {}", database_path)
            })?;

        tracing::info!("SQLite connection established, running migrations...");
        Self::from_pool(pool).await
    }

    /// Private in-memory database. One connection, since every SQLite
    /// in-memory connection is its own database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        Self::run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;

        tracing::info!("Database initialization complete");

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        // Users table. NOCASE makes both the unique constraints and the
        // lookups ASCII case-insensitive.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                full_name TEXT NOT NULL,
                is_subscribed BOOLEAN NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Verses table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS verses (
                id INTEGER PRIMARY KEY,
                text TEXT NOT NULL,
                reference TEXT NOT NULL UNIQUE,
                explanation TEXT NOT NULL,
                application TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Sent-verse log
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_verses (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                verse_id INTEGER NOT NULL REFERENCES verses(id) ON DELETE CASCADE,
                sent_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_user_verses_pair ON user_verses (user_id, verse_id)
            "#,
        )
        .execute(pool)
        .await?;

        // Login sessions. Expiry is unix milliseconds so it compares numerically.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                sid TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions (expires_at)
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for Database {
    async fn get_user(&self, id: i64) -> verse_core::Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password, email, full_name, is_subscribed, created_at
            FROM users WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_user_by_username(&self, username: &str) -> verse_core::Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password, email, full_name, is_subscribed, created_at
            FROM users WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_user_by_email(&self, email: &str) -> verse_core::Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password, email, full_name, is_subscribed, created_at
            FROM users WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_user(&self, user: &NewUser) -> verse_core::Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (username, password, email, full_name, is_subscribed, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, username, password, email, full_name, is_subscribed, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.is_subscribed)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                VerseError::ConstraintViolation("username or email already exists".to_string())
            }
            _ => db_error(e),
        })?;

        Ok(row.into())
    }

    async fn update_user_subscription(
        &self,
        id: i64,
        is_subscribed: bool,
    ) -> verse_core::Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            UPDATE users SET is_subscribed = ?1 WHERE id = ?2
            RETURNING id, username, password, email, full_name, is_subscribed, created_at
            "#,
        )
        .bind(is_subscribed)
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        row.map(|r| r.into())
            .ok_or_else(|| VerseError::NotFound(format!("user {}", id)))
    }

    async fn get_subscribed_users(&self) -> verse_core::Result<Vec<User>> {
        let rows: Vec<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password, email, full_name, is_subscribed, created_at
            FROM users WHERE is_subscribed = 1
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

#[async_trait]
impl VerseStore for Database {
    async fn get_verse(&self, id: i64) -> verse_core::Result<Option<Verse>> {
        let row: Option<VerseRow> = sqlx::query_as(
            r#"
            SELECT id, text, reference, explanation, application, created_at
            FROM verses WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn get_verse_by_reference(&self, reference: &str) -> verse_core::Result<Option<Verse>> {
        let row: Option<VerseRow> = sqlx::query_as(
            r#"
            SELECT id, text, reference, explanation, application, created_at
            FROM verses WHERE reference = ?1
            "#,
        )
        .bind(reference)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_verse(&self, verse: &NewVerse) -> verse_core::Result<Verse> {
        // The unique index on reference settles races between concurrent inserts.
        sqlx::query(
            r#"
            INSERT INTO verses (text, reference, explanation, application, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(reference) DO NOTHING
            "#,
        )
        .bind(&verse.text)
        .bind(&verse.reference)
        .bind(&verse.explanation)
        .bind(&verse.application)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        self.get_verse_by_reference(&verse.reference)
            .await?
            .ok_or_else(|| VerseError::Database(format!("verse {} vanished", verse.reference)))
    }
}

#[async_trait]
impl UserVerseStore for Database {
    async fn get_user_verse(
        &self,
        user_id: i64,
        verse_id: i64,
    ) -> verse_core::Result<Option<UserVerse>> {
        let row: Option<UserVerseRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, verse_id, sent_at
            FROM user_verses WHERE user_id = ?1 AND verse_id = ?2
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(verse_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_user_verse(&self, user_verse: &NewUserVerse) -> verse_core::Result<UserVerse> {
        let row: UserVerseRow = sqlx::query_as(
            r#"
            INSERT INTO user_verses (user_id, verse_id, sent_at)
            VALUES (?1, ?2, ?3)
            RETURNING id, user_id, verse_id, sent_at
            "#,
        )
        .bind(user_verse.user_id)
        .bind(user_verse.verse_id)
        .bind(Utc::now())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => VerseError::NotFound(
                format!(
                    "user {} or verse {}",
                    user_verse.user_id, user_verse.verse_id
                ),
            ),
            _ => db_error(e),
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn create_session(&self, session: &Session) -> verse_core::Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO sessions (sid, user_id, expires_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.expires_at.timestamp_millis())
        .execute(&*self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                VerseError::NotFound(format!("user {}", session.user_id))
            }
            _ => db_error(e),
        })?;

        Ok(())
    }

    async fn get_session(&self, id: &str) -> verse_core::Result<Option<Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT sid, user_id, expires_at FROM sessions
            WHERE sid = ?1 AND expires_at > ?2
            "#,
        )
        .bind(id)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete_session(&self, id: &str) -> verse_core::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM sessions WHERE sid = ?1
            "#,
        )
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn prune_expired_sessions(&self) -> verse_core::Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM sessions WHERE expires_at <= ?1
            "#,
        )
        .bind(Utc::now().timestamp_millis())
        .execute(&*self.pool)
        .await
        .map_err(db_error)?;

        Ok(result.rows_affected())
    }
}

fn db_error(e: sqlx::Error) -> VerseError {
    VerseError::Database(e.to_string())
}

// Helper structs for sqlx query_as
#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    email: String,
    full_name: String,
    is_subscribed: bool,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User {
            id: r.id,
            username: r.username,
            password: r.password,
            email: r.email,
            full_name: r.full_name,
            is_subscribed: r.is_subscribed,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VerseRow {
    id: i64,
    text: String,
    reference: String,
    explanation: String,
    application: String,
    created_at: DateTime<Utc>,
}

impl From<VerseRow> for Verse {
    fn from(r: VerseRow) -> Self {
        Verse {
            id: r.id,
            text: r.text,
            reference: r.reference,
            explanation: r.explanation,
            application: r.application,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserVerseRow {
    id: i64,
    user_id: i64,
    verse_id: i64,
    sent_at: DateTime<Utc>,
}

impl From<UserVerseRow> for UserVerse {
    fn from(r: UserVerseRow) -> Self {
        UserVerse {
            id: r.id,
            user_id: r.user_id,
            verse_id: r.verse_id,
            sent_at: r.sent_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    sid: String,
    user_id: i64,
    expires_at: i64,
}

impl From<SessionRow> for Session {
    fn from(r: SessionRow) -> Self {
        Session {
            id: r.sid,
            user_id: r.user_id,
            expires_at: Utc
                .timestamp_millis_opt(r.expires_at)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> NewUser {
        NewUser {
            username: "alice".to_string(),
            password: "hash".to_string(),
            email: "alice@example.com".to_string(),
            full_name: "Alice Smith".to_string(),
            is_subscribed: true,
        }
    }

    #[tokio::test]
    async fn test_data_survives_reopen() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let path = temp_dir.path().join("verses.db");
        let path = path.to_string_lossy().to_string();

        let created = {
            let db = Database::new(&path).await?;
            let user = db.create_user(&alice()).await?;
            let verse = db
                .create_verse(&NewVerse::new("text", "Psalm 23:1", "expl", "app"))
                .await?;
            db.create_user_verse(&NewUserVerse {
                user_id: user.id,
                verse_id: verse.id,
            })
            .await?;
            db.pool.close().await;
            (user, verse)
        };

        let db = Database::new(&path).await?;
        assert_eq!(db.get_user(created.0.id).await?, Some(created.0.clone()));
        assert_eq!(
            db.get_verse_by_reference("Psalm 23:1").await?,
            Some(created.1.clone())
        );
        assert!(db
            .get_user_verse(created.0.id, created.1.id)
            .await?
            .is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_deleting_user_cascades_to_user_verses() -> Result<()> {
        let db = Database::in_memory().await?;
        let user = db.create_user(&alice()).await?;
        let verse = db
            .create_verse(&NewVerse::new("text", "John 3:16", "expl", "app"))
            .await?;
        db.create_user_verse(&NewUserVerse {
            user_id: user.id,
            verse_id: verse.id,
        })
        .await?;

        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(user.id)
            .execute(&*db.pool)
            .await?;

        assert!(db.get_user_verse(user.id, verse.id).await?.is_none());
        assert!(db.get_verse(verse.id).await?.is_some());
        Ok(())
    }
}
