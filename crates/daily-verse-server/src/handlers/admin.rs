//! Admin handlers

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;
use verse_core::{DispatchReport, Verse};

#[derive(Debug, Serialize)]
pub struct SendDailyVerseResponse {
    success: bool,
    message: String,
    verse: Verse,
    report: DispatchReport,
}

/// Fetch a verse and email it to every subscriber.
pub async fn send_daily_verse(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<SendDailyVerseResponse>, ApiError> {
    info!("Daily verse dispatch triggered by {}", auth.user.username);

    let verse = state.verse_source.random_verse().await;
    let saved = state
        .store
        .create_verse(&verse)
        .await
        .map_err(|e| ApiError::internal("Failed to send daily verse", e))?;

    let report = state
        .dispatcher
        .dispatch(&saved)
        .await
        .map_err(|e| ApiError::internal("Failed to send daily verse", e))?;

    Ok(Json(SendDailyVerseResponse {
        success: true,
        message: format!("Daily verse sent to {} users", report.sent_count),
        verse: saved,
        report,
    }))
}
