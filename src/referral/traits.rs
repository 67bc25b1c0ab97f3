// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Collaborator interfaces the referral core is built against.
//!
//! Every read returns an owned snapshot; implementations must not cache
//! between calls, so each step of a tree walk sees the current store.

use super::error::{ReferralError, ReferralResult};
use super::types::{
    BonusAward, ContactChannel, CreditOutcome, LedgerEntry, NewLedgerEntry, NewUser, User, UserId,
    UserStatus,
};

/// User records and the parent/child links between them.
pub trait UserDirectory: Send + Sync {
    /// Insert a user.
    ///
    /// Fails with `Conflict` when the email, mobile or referral code is taken
    /// and with `NotFound` when `parent_user_id` names no existing user.
    fn create(&self, user: NewUser) -> ReferralResult<User>;

    fn find_by_id(&self, user_id: UserId) -> ReferralResult<Option<User>>;

    fn find_by_referral_code(&self, code: &str) -> ReferralResult<Option<User>>;

    /// Lookup by normalized email.
    fn find_by_email(&self, email: &str) -> ReferralResult<Option<User>>;

    /// Direct referrals of a user, in registration order. Empty for a leaf.
    fn find_children_of(&self, user_id: UserId) -> ReferralResult<Vec<User>>;

    /// Move the user forward to `status` and return the status it held.
    ///
    /// The comparison and the write happen atomically; a backward move
    /// fails with `Validation` and writes nothing. Repeating the current
    /// status is accepted.
    fn advance_status(
        &self,
        user_id: UserId,
        status: UserStatus,
    ) -> ReferralResult<(UserStatus, User)>;

    fn mark_contact_verified(
        &self,
        user_id: UserId,
        channel: ContactChannel,
    ) -> ReferralResult<User>;

    fn list(&self) -> ReferralResult<Vec<User>>;

    fn referral_code_exists(&self, code: &str) -> ReferralResult<bool> {
        Ok(self.find_by_referral_code(code)?.is_some())
    }

    /// Like [`find_by_id`](Self::find_by_id) but a missing user is an error.
    fn get(&self, user_id: UserId) -> ReferralResult<User> {
        self.find_by_id(user_id)?
            .ok_or_else(|| ReferralError::NotFound(format!("User {user_id}")))
    }
}

/// Payment/earnings records owned by the payment component.
///
/// The referral core only flips an entry to live and credits bonuses.
pub trait Ledger: Send + Sync {
    fn open_entry(&self, entry: NewLedgerEntry) -> ReferralResult<LedgerEntry>;

    fn find_entry(&self, user_id: UserId) -> ReferralResult<Option<LedgerEntry>>;

    /// Set the entry's status to live. `Ok(None)` when the user has no entry.
    fn mark_live(&self, user_id: UserId) -> ReferralResult<Option<LedgerEntry>>;

    /// Add `award.amount` to the beneficiary's `earn_amount`.
    ///
    /// The idempotency check, the balance update and the record of the award
    /// commit together: an award key is credited at most once.
    fn credit_bonus(&self, award: &BonusAward) -> ReferralResult<CreditOutcome>;
}
