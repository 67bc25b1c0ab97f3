// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::{
    auth::{AdminOnly, Auth},
    error::ApiError,
    models::CreateLedgerEntryRequest,
    referral::{Ledger, LedgerEntry, LedgerStatus, NewLedgerEntry, UserId},
    state::AppState,
};

/// Record a user's payment. Bonuses are credited to this entry later.
pub async fn create_entry(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
    Json(request): Json<CreateLedgerEntryRequest>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    let status = match request.status.as_deref() {
        Some(raw) => raw.parse::<LedgerStatus>()?,
        None => LedgerStatus::default(),
    };
    if request.payment_method.trim().is_empty() || request.transaction_id.trim().is_empty() {
        return Err(ApiError::bad_request(
            "payment_method and transaction_id are required",
        ));
    }

    let entry = state.db.open_entry(NewLedgerEntry {
        user_id: request.user_id,
        total_amount: request.total_amount,
        payment_method: request.payment_method.trim().to_string(),
        transaction_id: request.transaction_id.trim().to_string(),
        status,
    })?;

    info!(
        user_id = %entry.user_id,
        amount = entry.total_amount,
        transaction_id = %entry.transaction_id,
        "Ledger entry opened"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// A user's own entry; admins may read any.
pub async fn get_entry(
    Auth(claims): Auth,
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let user_id = UserId(user_id);
    if !claims.is_admin && claims.user_id()? != user_id {
        return Err(ApiError::forbidden("Cannot read another user's ledger"));
    }

    state
        .db
        .find_entry(user_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Ledger entry for user {user_id} not found")))
}
