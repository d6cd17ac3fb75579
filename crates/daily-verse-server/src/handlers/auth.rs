//! Authentication handlers

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use verse_core::{LoginRequest, RegisterRequest, User};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    user: User,
    token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    info!("Registration attempt for: {}", req.username);

    let (user, session) = state.auth_service.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user,
            token: session.id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    info!("Login attempt for: {}", req.username);

    let (user, session) = state
        .auth_service
        .login(&req.username, &req.password)
        .await?;

    info!("Login successful for: {}", user.username);

    Ok(Json(AuthResponse {
        user,
        token: session.id,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    state.auth_service.logout(&auth.token).await?;
    Ok(Json(json!({ "success": true })))
}

/// Current user
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}
