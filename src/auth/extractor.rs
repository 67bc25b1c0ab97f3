// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(claims): Auth) -> impl IntoResponse {
//!     // claims.sub is the caller's user ID
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, Claims};
use crate::state::AppState;

/// Extractor for any caller holding a valid session token.
pub struct Auth(pub Claims);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::NotBearer)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::NotBearer)?;

        let claims = state.tokens.verify(token)?;
        Ok(Auth(claims))
    }
}

/// Extractor that requires the admin flag.
pub struct AdminOnly(pub Claims);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(claims) = Auth::from_request_parts(parts, state).await?;

        if !claims.is_admin {
            return Err(AuthError::AdminRequired);
        }

        Ok(AdminOnly(claims))
    }
}
