// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the REST API. Domain records
//! ([`User`], [`LedgerEntry`], walk results) are serialized directly; the
//! types here only cover what has no domain counterpart.
//!
//! [`User`]: crate::referral::User
//! [`LedgerEntry`]: crate::referral::LedgerEntry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::referral::{ChainLink, ReferralNode, User, UserId};

// =============================================================================
// Users
// =============================================================================

/// Request to move a user to a new status (`pending`, `live` or `closed`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

// =============================================================================
// Referrals
// =============================================================================

/// First-child chain starting at `user_id`.
#[derive(Debug, Clone, Serialize)]
pub struct ChainResponse {
    pub user_id: UserId,
    pub chain: Vec<ChainLink>,
}

/// Fully expanded subtree rooted at `tree.user`.
#[derive(Debug, Clone, Serialize)]
pub struct TreeResponse {
    pub tree: ReferralNode,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AncestorQuery {
    /// Levels to walk up; defaults to the milestone depth
    pub depth: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AncestorResponse {
    pub user_id: UserId,
    pub depth: u32,
    /// `None` when a root is reached before `depth` steps
    pub ancestor: Option<User>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Request to open the ledger entry of a paying user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLedgerEntryRequest {
    pub user_id: UserId,
    pub total_amount: u64,
    pub payment_method: String,
    pub transaction_id: String,
    /// `pending`, `completed` or `live`; defaults to `pending`
    #[serde(default)]
    pub status: Option<String>,
}

// =============================================================================
// OTP
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOtpRequest {
    pub user_id: UserId,
    /// `email` or `mobile`
    #[serde(alias = "type", default)]
    pub channel: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub user_id: UserId,
    pub otp: String,
    #[serde(alias = "type", default)]
    pub channel: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyOtpResponse {
    pub message: String,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_requests_accept_type_alias() {
        let send: SendOtpRequest =
            serde_json::from_str(r#"{"user_id": 3, "type": "mobile"}"#).unwrap();
        assert_eq!(send.user_id, UserId(3));
        assert_eq!(send.channel, "mobile");

        let verify: VerifyOtpRequest =
            serde_json::from_str(r#"{"user_id": 3, "otp": "123456", "channel": "email"}"#)
                .unwrap();
        assert_eq!(verify.channel, "email");

        // Missing channel is left to the handler to reject.
        let bare: SendOtpRequest = serde_json::from_str(r#"{"user_id": 3}"#).unwrap();
        assert!(bare.channel.is_empty());
    }

    #[test]
    fn ledger_request_status_is_optional() {
        let request: CreateLedgerEntryRequest = serde_json::from_str(
            r#"{"user_id": 1, "total_amount": 999, "payment_method": "upi", "transaction_id": "T1"}"#,
        )
        .unwrap();
        assert!(request.status.is_none());
        assert_eq!(request.total_amount, 999);
    }
}
