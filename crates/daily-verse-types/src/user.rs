//! User types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscriber account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub password: String,
    pub email: String,
    pub full_name: String,
    pub is_subscribed: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new user row. `password` is already hashed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    #[serde(default = "default_subscribed")]
    pub is_subscribed: bool,
}

/// Registration request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    #[serde(default = "default_subscribed")]
    pub is_subscribed: bool,
}

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Settings update body (`PATCH /api/user/settings`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdate {
    pub is_subscribed: bool,
}

fn default_subscribed() -> bool {
    true
}
