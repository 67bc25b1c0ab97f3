// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! ## Auth Flow
//!
//! 1. Client registers, then logs in with email + password
//! 2. Server verifies the PBKDF2 hash and issues an HS256 session token
//! 3. Client sends `Authorization: Bearer <token>`
//! 4. Extractors verify signature and expiry, then expose the [`Claims`]
//!
//! Admin-only routes use [`AdminOnly`], which additionally checks the
//! `is_admin` claim.

pub mod error;
pub mod extractor;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use extractor::{AdminOnly, Auth};
pub use password::{PasswordHasher, Pbkdf2Hasher};
pub use token::{Claims, IssuedToken, TokenIssuer};
