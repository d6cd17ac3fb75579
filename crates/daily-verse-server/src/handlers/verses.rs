//! Verse handlers

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use tracing::{debug, warn};
use verse_core::{NewVerse, Verse};

/// Pick a verse, remember it, and return its content.
pub async fn random(State(state): State<AppState>) -> Result<Json<NewVerse>, ApiError> {
    let verse = state.verse_source.random_verse().await;

    let saved = state
        .store
        .create_verse(&verse)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch random verse", e))?;
    debug!("Random verse {} stored as {}", saved.reference, saved.id);

    Ok(Json(verse))
}

pub async fn create(
    State(state): State<AppState>,
    _auth: AuthUser,
    payload: Result<Json<NewVerse>, JsonRejection>,
) -> Result<(StatusCode, Json<Verse>), ApiError> {
    let Json(verse) = payload.map_err(|e| {
        warn!("Rejected verse body: {}", e);
        ApiError::bad_request("Invalid verse data")
    })?;

    if verse.text.trim().is_empty() || verse.reference.trim().is_empty() {
        return Err(ApiError::bad_request("Invalid verse data"));
    }

    let saved = state.store.create_verse(&verse).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}
