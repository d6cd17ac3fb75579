//! Batch dispatch results

use serde::{Deserialize, Serialize};

/// One recipient the batch could not deliver to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchFailure {
    /// Recipient email address
    pub recipient: String,
    pub cause: String,
}

/// Outcome of sending one verse to every subscriber
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    /// Users attempted, successful or not
    pub sent_count: usize,
    pub errors: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.sent_count - self.errors.len()
    }
}
