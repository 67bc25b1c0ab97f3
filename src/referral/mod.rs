// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Referral Network Core
//!
//! Users are linked into a forest by the referral code they registered with.
//! This module owns the rules over that forest:
//!
//! - `code` - collision-free invite codes
//! - `registration` - placing new users under their referrer
//! - `walker` - first-child chain, subtree expansion, bounded ancestor lookup
//! - `rewards` - status transitions and bonus accounting
//!
//! Persistence is reached only through the [`UserDirectory`] and [`Ledger`]
//! traits.

pub mod code;
pub mod error;
pub mod registration;
pub mod rewards;
pub mod traits;
pub mod types;
pub mod walker;

pub use error::{ReferralError, ReferralResult};
pub use registration::{normalize_email, Registration, RegistrationService};
pub use rewards::{ActivationReport, BonusResult, RewardEngine, RewardPolicy};
pub use traits::{Ledger, UserDirectory};
pub use types::{
    BonusAward, BonusKind, ChainLink, ContactChannel, CreditOutcome, LedgerEntry, LedgerStatus,
    NewLedgerEntry, NewUser, ReferralNode, User, UserId, UserStatus,
};
pub use walker::TreeWalker;
