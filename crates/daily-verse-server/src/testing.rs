//! In-process doubles for the external collaborators

use async_trait::async_trait;
use std::sync::Mutex;
use verse_core::{MailSender, NewVerse, Result, User, Verse, VerseError, VerseSource};

/// Records recipients; fails for a fixed set of addresses
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<String>>,
    fail_for: Vec<String>,
}

impl RecordingMailer {
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_for: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send_verse(&self, _verse: &Verse, recipient: &User) -> Result<()> {
        if self.fail_for.contains(&recipient.email) {
            return Err(VerseError::TransportFailure(format!(
                "mailbox {} unavailable",
                recipient.email
            )));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(recipient.email.clone());
        }
        Ok(())
    }
}

/// Always returns the same verse
pub struct StaticVerseSource(pub NewVerse);

#[async_trait]
impl VerseSource for StaticVerseSource {
    async fn random_verse(&self) -> NewVerse {
        self.0.clone()
    }
}
