// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{AdminOnly, Auth},
    error::ApiError,
    models::UpdateStatusRequest,
    referral::{
        ActivationReport, Registration, RegistrationService, RewardEngine, User, UserDirectory,
        UserId, UserStatus,
    },
    state::AppState,
};

/// Register a user, optionally under the owner of `referral_code`.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<Registration>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = RegistrationService::new(state.db.as_ref(), state.hasher.as_ref())
        .with_admin_emails(&state.admin_emails)
        .register(request)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.db.list()?))
}

pub async fn get_user(
    Auth(_claims): Auth,
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.db.get(UserId(user_id))?))
}

/// Move a user forward in its lifecycle; going live pays referral bonuses.
pub async fn update_status(
    AdminOnly(_admin): AdminOnly,
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<ActivationReport>, ApiError> {
    let target: UserStatus = request.status.parse()?;
    let db = state.db.as_ref();
    let report = RewardEngine::new(db, db, state.reward_policy).update_status(UserId(user_id), target)?;
    Ok(Json(report))
}
