// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error taxonomy shared by the directory, ledger, walker and reward engine.

use super::types::UserId;

#[derive(Debug, thiserror::Error)]
pub enum ReferralError {
    /// Missing user or ledger entry.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate unique field (email, mobile, referral code, transaction id).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An external collaborator (notification gateway, system RNG) failed.
    #[error("dependency failed: {0}")]
    Dependency(String),

    /// The persistence layer failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// A user was reached twice during a walk; the parent links are corrupt.
    #[error("referral tree is inconsistent at user {0}")]
    Integrity(UserId),
}

pub type ReferralResult<T> = Result<T, ReferralError>;
