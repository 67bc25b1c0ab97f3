// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Referral Domain Types
//!
//! Users form a forest through `parent_user_id`. Ledger entries carry the
//! earnings each user accumulates from the referral rewards.
//!
//! ## Type Categories
//!
//! - **Users**: [`User`], [`NewUser`], [`UserStatus`], [`ContactChannel`]
//! - **Ledger**: [`LedgerEntry`], [`NewLedgerEntry`], [`LedgerStatus`]
//! - **Bonuses**: [`BonusAward`], [`CreditOutcome`]
//! - **Walks**: [`ChainLink`], [`ReferralNode`]

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ReferralError;

// =============================================================================
// User Identity
// =============================================================================

/// Numeric user identifier, allocated in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        UserId(value)
    }
}

/// Account status. Variants are declared in transition order; a user only
/// ever moves forward through them.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// Registered, activation not yet completed
    #[default]
    Pending,
    /// Activation completed (e.g. payment confirmed)
    Live,
    /// Account closed; terminal
    Closed,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Pending => "pending",
            UserStatus::Live => "live",
            UserStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserStatus {
    type Err = ReferralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(UserStatus::Pending),
            "live" => Ok(UserStatus::Live),
            "closed" => Ok(UserStatus::Closed),
            other => Err(ReferralError::Validation(format!(
                "unknown status '{other}' (expected pending, live or closed)"
            ))),
        }
    }
}

/// Contact channel used for OTP delivery and verification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactChannel {
    Email,
    Mobile,
}

impl ContactChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactChannel::Email => "email",
            ContactChannel::Mobile => "mobile",
        }
    }
}

impl fmt::Display for ContactChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContactChannel {
    type Err = ReferralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(ContactChannel::Email),
            "mobile" => Ok(ContactChannel::Mobile),
            "" => Err(ReferralError::Validation(
                "OTP type is required. Must be \"email\" or \"mobile\".".to_string(),
            )),
            other => Err(ReferralError::Validation(format!(
                "invalid OTP type '{other}'. Must be \"email\" or \"mobile\"."
            ))),
        }
    }
}

// =============================================================================
// Users
// =============================================================================

/// A registered user and its position in the referral forest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub name: String,
    /// Normalized (NFKC, lowercase) email address
    pub email: String,
    pub mobile: String,
    /// Never serialized into responses
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Invite code other users register with
    pub referral_code: String,
    /// Referrer; `None` for the root of a tree
    pub parent_user_id: Option<UserId>,
    pub status: UserStatus,
    pub email_verified: bool,
    pub mobile_verified: bool,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_live(&self) -> bool {
        self.status == UserStatus::Live
    }

    pub fn is_root(&self) -> bool {
        self.parent_user_id.is_none()
    }
}

/// A user ready to be inserted; the directory assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
    pub referral_code: String,
    pub parent_user_id: Option<UserId>,
    pub is_admin: bool,
}

// =============================================================================
// Ledger
// =============================================================================

/// Payment lifecycle of a ledger entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    #[default]
    Pending,
    Completed,
    Live,
}

impl FromStr for LedgerStatus {
    type Err = ReferralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LedgerStatus::Pending),
            "completed" => Ok(LedgerStatus::Completed),
            "live" => Ok(LedgerStatus::Live),
            other => Err(ReferralError::Validation(format!(
                "unknown ledger status '{other}'"
            ))),
        }
    }
}

/// Per-user payment and earnings record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub user_id: UserId,
    /// Amount the user paid in
    pub total_amount: u64,
    /// Bonus balance earned from referrals
    pub earn_amount: u64,
    pub payment_method: String,
    pub transaction_id: String,
    pub status: LedgerStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: UserId,
    pub total_amount: u64,
    pub payment_method: String,
    pub transaction_id: String,
    pub status: LedgerStatus,
}

// =============================================================================
// Bonuses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    /// Paid to the parent when a direct referral goes live
    Direct,
    /// Paid to the bounded-depth ancestor when one of its branches reaches
    /// the live-count threshold
    Milestone,
}

impl BonusKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusKind::Direct => "direct",
            BonusKind::Milestone => "milestone",
        }
    }
}

/// A bonus to be credited once to `beneficiary` on account of `subject`.
///
/// For a direct bonus the subject is the activated child; for a milestone
/// bonus it is the root of the qualifying branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusAward {
    pub kind: BonusKind,
    pub beneficiary: UserId,
    pub subject: UserId,
    pub amount: u64,
}

impl BonusAward {
    pub fn direct(parent: UserId, child: UserId, amount: u64) -> Self {
        Self {
            kind: BonusKind::Direct,
            beneficiary: parent,
            subject: child,
            amount,
        }
    }

    pub fn milestone(ancestor: UserId, branch_root: UserId, amount: u64) -> Self {
        Self {
            kind: BonusKind::Milestone,
            beneficiary: ancestor,
            subject: branch_root,
            amount,
        }
    }

    /// At most one credit is ever applied per key.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}:{}", self.kind.as_str(), self.beneficiary, self.subject)
    }
}

/// Result of attempting to credit a [`BonusAward`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreditOutcome {
    Credited { earn_amount: u64 },
    AlreadyApplied,
    /// The beneficiary has no ledger entry; nothing was written.
    NoLedgerEntry,
}

// =============================================================================
// Walk Results
// =============================================================================

/// One step of a first-child chain: the user and all of its direct referrals.
#[derive(Debug, Clone, Serialize)]
pub struct ChainLink {
    pub user: User,
    pub referrals: Vec<User>,
}

/// A node of a fully expanded referral subtree.
#[derive(Debug, Clone, Serialize)]
pub struct ReferralNode {
    pub user: User,
    /// Distance from the root of the walk (root = 0)
    pub depth: u32,
    /// Live users in this subtree, this node included
    pub live_referral_count: u64,
    /// Users below this node
    pub descendant_count: u64,
    /// Direct referrals have reached the inner-sharing threshold
    pub completed_inner_sharing: bool,
    pub referrals: Vec<ReferralNode>,
}
