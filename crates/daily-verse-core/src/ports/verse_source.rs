//! Verse source trait

use async_trait::async_trait;
use daily_verse_types::NewVerse;

#[async_trait]
pub trait VerseSource: Send + Sync {
    /// Pick a verse. Implementations degrade to a local verse instead of failing.
    async fn random_verse(&self) -> NewVerse;
}
