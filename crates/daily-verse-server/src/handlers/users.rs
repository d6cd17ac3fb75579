//! User handlers

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{extract::State, Json};
use tracing::info;
use verse_core::{SubscriptionUpdate, User};

pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SubscriptionUpdate>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .store
        .update_user_subscription(auth.user.id, req.is_subscribed)
        .await?;

    info!(
        "User {} subscription set to {}",
        user.username, user.is_subscribed
    );
    Ok(Json(user))
}
