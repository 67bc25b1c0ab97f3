// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! A single embedded redb file under `DATA_DIR` holds every record:
//!
//! ```text
//! $DATA_DIR/
//!   referrals.redb    # users, indexes, ledger, bonus events, OTP codes
//! ```
//!
//! [`ReferralDatabase`] implements the `UserDirectory`, `Ledger` and
//! `OtpStore` traits; handlers never touch tables directly.

pub mod database;

pub use database::{DbError, DbResult, ReferralDatabase};
