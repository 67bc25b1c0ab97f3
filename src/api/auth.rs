// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use tracing::{info, warn};

use crate::{
    error::ApiError,
    models::{LoginRequest, LoginResponse},
    referral::{normalize_email, UserDirectory},
    state::AppState,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Exchange email + password for a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let email = normalize_email(&request.email);
    let Some(user) = state.db.find_by_email(&email)? else {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };

    if !state.hasher.verify(&request.password, &user.password_hash) {
        warn!(user_id = %user.user_id, "Login rejected: wrong password");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let issued = state
        .tokens
        .issue(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;

    info!(user_id = %user.user_id, "User logged in");
    Ok(Json(LoginResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_at: issued.expires_at,
        user,
    }))
}
