//! Verse types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored scripture excerpt with commentary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    pub id: i64,
    pub text: String,
    pub reference: String,
    pub explanation: String,
    pub application: String,
    pub created_at: DateTime<Utc>,
}

/// Verse content without storage identity.
///
/// This is both the insert shape and the public `{text, reference,
/// explanation, application}` payload served by the random-verse route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVerse {
    pub text: String,
    pub reference: String,
    pub explanation: String,
    pub application: String,
}

impl NewVerse {
    pub fn new(
        text: impl Into<String>,
        reference: impl Into<String>,
        explanation: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            reference: reference.into(),
            explanation: explanation.into(),
            application: application.into(),
        }
    }
}

impl From<Verse> for NewVerse {
    fn from(v: Verse) -> Self {
        Self {
            text: v.text,
            reference: v.reference,
            explanation: v.explanation,
            application: v.application,
        }
    }
}

/// Marks that a verse was sent to a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVerse {
    pub id: i64,
    pub user_id: i64,
    pub verse_id: i64,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserVerse {
    pub user_id: i64,
    pub verse_id: i64,
}
