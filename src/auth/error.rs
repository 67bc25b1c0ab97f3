// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token failures, rendered as `{error, error_code}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Sign in first: the Authorization header is missing")]
    MissingToken,

    #[error("Authorization header must be 'Bearer <session token>'")]
    NotBearer,

    /// Undecodable token, or a `sub` that is not a user id
    #[error("Session token could not be read")]
    MalformedToken,

    /// Signed with a different server secret
    #[error("Session token was not issued by this server")]
    BadSignature,

    #[error("Session has expired, please log in again")]
    SessionExpired,

    #[error("Only administrators may do this")]
    AdminRequired,

    #[error("Could not issue a session token: {0}")]
    Signing(String),
}

#[derive(Serialize)]
struct Body {
    error: String,
    error_code: &'static str,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::NotBearer => "not_bearer",
            AuthError::MalformedToken => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::SessionExpired => "session_expired",
            AuthError::AdminRequired => "admin_required",
            AuthError::Signing(_) => "signing_failed",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::AdminRequired => StatusCode::FORBIDDEN,
            AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Body {
            error: self.to_string(),
            error_code: self.error_code(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
