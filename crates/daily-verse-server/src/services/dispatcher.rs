//! Batch dispatch: one verse to every subscribed user

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use verse_core::{
    DispatchFailure, DispatchReport, EntityStore, MailSender, NewUserVerse, Result, Verse,
};

pub struct BatchDispatcher {
    store: Arc<dyn EntityStore>,
    mailer: Arc<dyn MailSender>,
    /// Pause between consecutive sends, a rate limit on the mail transport
    delay: Duration,
}

impl BatchDispatcher {
    pub fn new(store: Arc<dyn EntityStore>, mailer: Arc<dyn MailSender>, delay: Duration) -> Self {
        Self {
            store,
            mailer,
            delay,
        }
    }

    /// Send `verse` to the current subscribers, one at a time.
    ///
    /// A failed send is recorded in the report and the batch moves on; only
    /// failing to read the subscriber list fails the whole call. Successful
    /// sends are logged as `UserVerse` rows. No retries, and concurrent calls
    /// are not serialized against each other.
    pub async fn dispatch(&self, verse: &Verse) -> Result<DispatchReport> {
        let subscribers = self.store.get_subscribed_users().await?;
        info!(
            "Dispatching {} to {} subscribers",
            verse.reference,
            subscribers.len()
        );

        let mut report = DispatchReport::default();
        for (i, user) in subscribers.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            report.sent_count += 1;

            match self.mailer.send_verse(verse, user).await {
                Ok(()) => {
                    debug!("Sent {} to {}", verse.reference, user.email);
                    let record = NewUserVerse {
                        user_id: user.id,
                        verse_id: verse.id,
                    };
                    if let Err(e) = self.store.create_user_verse(&record).await {
                        warn!("Sent to {} but could not record it: {}", user.email, e);
                    }
                }
                Err(e) => {
                    warn!("Failed to send email to {}: {}", user.email, e);
                    report.errors.push(DispatchFailure {
                        recipient: user.email.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Dispatch of {} finished: {} attempted, {} failed",
            verse.reference,
            report.sent_count,
            report.errors.len()
        );
        Ok(report)
    }
}
