//! Outbound mail trait

use crate::Result;
use async_trait::async_trait;
use daily_verse_types::{User, Verse};

#[async_trait]
pub trait MailSender: Send + Sync {
    /// Deliver one verse email to one user. Errors are `TransportFailure`.
    async fn send_verse(&self, verse: &Verse, recipient: &User) -> Result<()>;
}
