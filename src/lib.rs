// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Referral Network - User Directory, Referral Tree and Rewards
//!
//! Users register under the referral code of an existing user, forming a
//! forest. When a user goes live, its referrer and a distant ancestor earn
//! bonuses on their payment ledgers.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Password hashing, session tokens and extractors
//! - `otp` - Email and mobile verification codes
//! - `referral` - Codes, tree walks and reward accounting
//! - `storage` - Embedded ACID store (redb)

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod otp;
pub mod referral;
pub mod state;
pub mod storage;

#[cfg(test)]
mod test_support;
