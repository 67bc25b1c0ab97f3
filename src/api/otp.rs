// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    auth::{Auth, Claims},
    error::ApiError,
    models::{SendOtpRequest, VerifyOtpRequest, VerifyOtpResponse},
    otp::{OtpReceipt, OtpService},
    referral::{ContactChannel, UserId},
    state::AppState,
};

fn ensure_self_or_admin(claims: &Claims, user_id: UserId) -> Result<(), ApiError> {
    if claims.is_admin || claims.user_id()? == user_id {
        Ok(())
    } else {
        Err(ApiError::forbidden("Cannot verify another user's contact"))
    }
}

fn service(state: &AppState) -> OtpService<'_> {
    OtpService::new(
        state.db.as_ref(),
        state.db.as_ref(),
        state.dispatcher.as_ref(),
        &state.otp.secret,
        state.otp.ttl,
    )
}

/// Send a fresh code to the user's email or mobile.
pub async fn send_otp(
    Auth(claims): Auth,
    State(state): State<AppState>,
    Json(request): Json<SendOtpRequest>,
) -> Result<Json<OtpReceipt>, ApiError> {
    let channel: ContactChannel = request.channel.parse()?;
    ensure_self_or_admin(&claims, request.user_id)?;

    let receipt = service(&state).send(request.user_id, channel).await?;
    Ok(Json(receipt))
}

pub async fn verify_otp(
    Auth(claims): Auth,
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, ApiError> {
    let channel: ContactChannel = request.channel.parse()?;
    ensure_self_or_admin(&claims, request.user_id)?;

    let user = service(&state).verify(request.user_id, &request.otp, channel)?;
    Ok(Json(VerifyOtpResponse {
        message: "OTP verified successfully".to_string(),
        user,
    }))
}
