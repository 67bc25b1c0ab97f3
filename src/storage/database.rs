// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded referral database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `users`: user_id → serialized StoredUser
//! - `email_index`, `mobile_index`, `referral_code_index`: unique key → user_id
//! - `children_index`: (parent_id, child_id) → ()
//! - `ledger`: user_id → serialized LedgerEntry
//! - `transaction_index`: transaction_id → user_id
//! - `bonus_events`: idempotency key → serialized BonusEvent
//! - `otp_codes`: `user_id|channel` → serialized OtpRecord
//! - `meta`: key → u64 counters
//!
//! User IDs are allocated from a counter, so a range scan over
//! `children_index` yields children in registration order.

use std::path::Path;

use chrono::{DateTime, Utc};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::otp::{OtpRecord, OtpStore};
use crate::referral::{
    BonusAward, ContactChannel, CreditOutcome, Ledger, LedgerEntry, LedgerStatus, NewLedgerEntry,
    NewUser, ReferralError, ReferralResult, User, UserDirectory, UserId, UserStatus,
};

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

const EMAIL_INDEX: TableDefinition<&str, u64> = TableDefinition::new("email_index");

const MOBILE_INDEX: TableDefinition<&str, u64> = TableDefinition::new("mobile_index");

const REFERRAL_CODE_INDEX: TableDefinition<&str, u64> =
    TableDefinition::new("referral_code_index");

/// Parent/child edges. Key: `(parent_id, child_id)`.
const CHILDREN_INDEX: TableDefinition<(u64, u64), ()> = TableDefinition::new("children_index");

const LEDGER: TableDefinition<u64, &[u8]> = TableDefinition::new("ledger");

const TRANSACTION_INDEX: TableDefinition<&str, u64> = TableDefinition::new("transaction_index");

/// Applied bonuses. Presence of a key means the award was credited.
const BONUS_EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("bonus_events");

const OTP_CODES: TableDefinition<&str, &[u8]> = TableDefinition::new("otp_codes");

const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_USER_ID: &str = "next_user_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("user {0} is referenced but missing")]
    Dangling(UserId),

    #[error("rejected: {0}")]
    Rejected(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for ReferralError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => ReferralError::NotFound(what),
            DbError::Conflict(what) => ReferralError::Conflict(what),
            DbError::Dangling(user_id) => ReferralError::Integrity(user_id),
            DbError::Rejected(why) => ReferralError::Validation(why),
            other => ReferralError::Storage(other.to_string()),
        }
    }
}

// =============================================================================
// Stored Records
// =============================================================================

/// On-disk user row. Unlike [`User`], the password hash is serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    user_id: UserId,
    name: String,
    email: String,
    mobile: String,
    password_hash: String,
    referral_code: String,
    parent_user_id: Option<UserId>,
    status: UserStatus,
    email_verified: bool,
    mobile_verified: bool,
    is_admin: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoredUser> for User {
    fn from(s: StoredUser) -> Self {
        User {
            user_id: s.user_id,
            name: s.name,
            email: s.email,
            mobile: s.mobile,
            password_hash: s.password_hash,
            referral_code: s.referral_code,
            parent_user_id: s.parent_user_id,
            status: s.status,
            email_verified: s.email_verified,
            mobile_verified: s.mobile_verified,
            is_admin: s.is_admin,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Audit record of a credited bonus.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BonusEvent {
    award: BonusAward,
    earn_amount_after: u64,
    applied_at: DateTime<Utc>,
}

fn otp_key(user_id: UserId, channel: ContactChannel) -> String {
    format!("{user_id}|{}", channel.as_str())
}

// =============================================================================
// ReferralDatabase
// =============================================================================

/// Embedded ACID store for users, ledger entries, bonus events and OTPs.
pub struct ReferralDatabase {
    db: Database,
}

impl ReferralDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(EMAIL_INDEX)?;
            let _ = write_txn.open_table(MOBILE_INDEX)?;
            let _ = write_txn.open_table(REFERRAL_CODE_INDEX)?;
            let _ = write_txn.open_table(CHILDREN_INDEX)?;
            let _ = write_txn.open_table(LEDGER)?;
            let _ = write_txn.open_table(TRANSACTION_INDEX)?;
            let _ = write_txn.open_table(BONUS_EVENTS)?;
            let _ = write_txn.open_table(OTP_CODES)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Cheap readiness probe.
    pub fn ping(&self) -> DbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(META)?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a user, its unique indexes and its parent edge atomically.
    pub fn insert_user(&self, new: NewUser) -> DbResult<User> {
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut users = write_txn.open_table(USERS)?;
            let mut emails = write_txn.open_table(EMAIL_INDEX)?;
            let mut mobiles = write_txn.open_table(MOBILE_INDEX)?;
            let mut codes = write_txn.open_table(REFERRAL_CODE_INDEX)?;
            let mut children = write_txn.open_table(CHILDREN_INDEX)?;
            let mut meta = write_txn.open_table(META)?;

            if emails.get(new.email.as_str())?.is_some() {
                return Err(DbError::Conflict(format!(
                    "Email {} is already registered",
                    new.email
                )));
            }
            if mobiles.get(new.mobile.as_str())?.is_some() {
                return Err(DbError::Conflict(format!(
                    "Mobile {} is already registered",
                    new.mobile
                )));
            }
            if codes.get(new.referral_code.as_str())?.is_some() {
                return Err(DbError::Conflict(format!(
                    "Referral code {} is already taken",
                    new.referral_code
                )));
            }
            if let Some(parent) = new.parent_user_id {
                if users.get(parent.0)?.is_none() {
                    return Err(DbError::NotFound(format!("User {parent}")));
                }
            }

            let user_id = meta.get(NEXT_USER_ID)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(NEXT_USER_ID, user_id + 1)?;

            let now = Utc::now();
            let stored = StoredUser {
                user_id: UserId(user_id),
                name: new.name,
                email: new.email,
                mobile: new.mobile,
                password_hash: new.password_hash,
                referral_code: new.referral_code,
                parent_user_id: new.parent_user_id,
                status: UserStatus::Pending,
                email_verified: false,
                mobile_verified: false,
                is_admin: new.is_admin,
                created_at: now,
                updated_at: now,
            };

            let json = serde_json::to_vec(&stored)?;
            users.insert(user_id, json.as_slice())?;
            emails.insert(stored.email.as_str(), user_id)?;
            mobiles.insert(stored.mobile.as_str(), user_id)?;
            codes.insert(stored.referral_code.as_str(), user_id)?;
            if let Some(parent) = stored.parent_user_id {
                children.insert((parent.0, user_id), ())?;
            }
            stored
        };
        write_txn.commit()?;

        debug!(user_id = %stored.user_id, "User row committed");
        Ok(stored.into())
    }

    pub fn get_user(&self, user_id: UserId) -> DbResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;
        match users.get(user_id.0)? {
            Some(value) => {
                let stored: StoredUser = serde_json::from_slice(value.value())?;
                Ok(Some(stored.into()))
            }
            None => Ok(None),
        }
    }

    fn get_user_by_index(
        &self,
        index: TableDefinition<'static, &'static str, u64>,
        key: &str,
    ) -> DbResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(index)?;
        let Some(user_id) = idx.get(key)?.map(|v| v.value()) else {
            return Ok(None);
        };

        let users = read_txn.open_table(USERS)?;
        let value = users
            .get(user_id)?
            .ok_or(DbError::Dangling(UserId(user_id)))?;
        let stored: StoredUser = serde_json::from_slice(value.value())?;
        Ok(Some(stored.into()))
    }

    /// Children of `parent`, oldest first.
    pub fn list_children(&self, parent: UserId) -> DbResult<Vec<User>> {
        let read_txn = self.db.begin_read()?;
        let children = read_txn.open_table(CHILDREN_INDEX)?;
        let users = read_txn.open_table(USERS)?;

        let mut result = Vec::new();
        for item in children.range((parent.0, 0)..=(parent.0, u64::MAX))? {
            let (key, _) = item?;
            let (_, child_id) = key.value();
            let value = users
                .get(child_id)?
                .ok_or(DbError::Dangling(UserId(child_id)))?;
            let stored: StoredUser = serde_json::from_slice(value.value())?;
            result.push(stored.into());
        }
        Ok(result)
    }

    pub fn list_users(&self) -> DbResult<Vec<User>> {
        let read_txn = self.db.begin_read()?;
        let users = read_txn.open_table(USERS)?;

        let mut result = Vec::new();
        for item in users.iter()? {
            let (_, value) = item?;
            let stored: StoredUser = serde_json::from_slice(value.value())?;
            result.push(stored.into());
        }
        Ok(result)
    }

    /// Read-modify-write of one user row inside a single write transaction.
    fn modify_user<F>(&self, user_id: UserId, apply: F) -> DbResult<User>
    where
        F: FnOnce(&mut StoredUser) -> DbResult<()>,
    {
        let write_txn = self.db.begin_write()?;
        let stored = {
            let mut users = write_txn.open_table(USERS)?;
            let mut stored: StoredUser = match users.get(user_id.0)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(DbError::NotFound(format!("User {user_id}"))),
            };

            apply(&mut stored)?;
            stored.updated_at = Utc::now();

            let json = serde_json::to_vec(&stored)?;
            users.insert(user_id.0, json.as_slice())?;
            stored
        };
        write_txn.commit()?;
        Ok(stored.into())
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    pub fn insert_ledger_entry(&self, new: NewLedgerEntry) -> DbResult<LedgerEntry> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let users = write_txn.open_table(USERS)?;
            let mut ledger = write_txn.open_table(LEDGER)?;
            let mut transactions = write_txn.open_table(TRANSACTION_INDEX)?;

            if users.get(new.user_id.0)?.is_none() {
                return Err(DbError::NotFound(format!("User {}", new.user_id)));
            }
            if ledger.get(new.user_id.0)?.is_some() {
                return Err(DbError::Conflict(format!(
                    "User {} already has a ledger entry",
                    new.user_id
                )));
            }
            if transactions.get(new.transaction_id.as_str())?.is_some() {
                return Err(DbError::Conflict(format!(
                    "Transaction {} is already recorded",
                    new.transaction_id
                )));
            }

            let now = Utc::now();
            let entry = LedgerEntry {
                user_id: new.user_id,
                total_amount: new.total_amount,
                earn_amount: 0,
                payment_method: new.payment_method,
                transaction_id: new.transaction_id,
                status: new.status,
                created_at: now,
                updated_at: now,
            };

            let json = serde_json::to_vec(&entry)?;
            ledger.insert(entry.user_id.0, json.as_slice())?;
            transactions.insert(entry.transaction_id.as_str(), entry.user_id.0)?;
            entry
        };
        write_txn.commit()?;
        Ok(entry)
    }

    pub fn get_ledger_entry(&self, user_id: UserId) -> DbResult<Option<LedgerEntry>> {
        let read_txn = self.db.begin_read()?;
        let ledger = read_txn.open_table(LEDGER)?;
        match ledger.get(user_id.0)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn set_ledger_live(&self, user_id: UserId) -> DbResult<Option<LedgerEntry>> {
        let write_txn = self.db.begin_write()?;
        let entry = {
            let mut ledger = write_txn.open_table(LEDGER)?;
            let current: Option<LedgerEntry> = ledger
                .get(user_id.0)?
                .map(|value| serde_json::from_slice(value.value()))
                .transpose()?;

            match current {
                Some(mut entry) => {
                    entry.status = LedgerStatus::Live;
                    entry.updated_at = Utc::now();
                    let json = serde_json::to_vec(&entry)?;
                    ledger.insert(user_id.0, json.as_slice())?;
                    Some(entry)
                }
                None => None,
            }
        };
        write_txn.commit()?;
        Ok(entry)
    }

    /// Check the idempotency key, bump the balance and record the event in
    /// one write transaction.
    pub fn apply_bonus(&self, award: &BonusAward) -> DbResult<CreditOutcome> {
        let key = award.idempotency_key();

        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut events = write_txn.open_table(BONUS_EVENTS)?;
            let mut ledger = write_txn.open_table(LEDGER)?;

            if events.get(key.as_str())?.is_some() {
                CreditOutcome::AlreadyApplied
            } else {
                let current: Option<LedgerEntry> = ledger
                    .get(award.beneficiary.0)?
                    .map(|value| serde_json::from_slice(value.value()))
                    .transpose()?;

                match current {
                    None => CreditOutcome::NoLedgerEntry,
                    Some(mut entry) => {
                        let now = Utc::now();
                        entry.earn_amount = entry.earn_amount.saturating_add(award.amount);
                        entry.updated_at = now;
                        let json = serde_json::to_vec(&entry)?;
                        ledger.insert(award.beneficiary.0, json.as_slice())?;

                        let event = serde_json::to_vec(&BonusEvent {
                            award: award.clone(),
                            earn_amount_after: entry.earn_amount,
                            applied_at: now,
                        })?;
                        events.insert(key.as_str(), event.as_slice())?;

                        CreditOutcome::Credited {
                            earn_amount: entry.earn_amount,
                        }
                    }
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    // =========================================================================
    // OTP Codes
    // =========================================================================

    pub fn put_otp(&self, record: &OtpRecord) -> DbResult<()> {
        let key = otp_key(record.user_id, record.channel);
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(OTP_CODES)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn get_otp(&self, user_id: UserId, channel: ContactChannel) -> DbResult<Option<OtpRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(OTP_CODES)?;
        match table.get(otp_key(user_id, channel).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Collaborator Implementations
// =============================================================================

impl UserDirectory for ReferralDatabase {
    fn create(&self, user: NewUser) -> ReferralResult<User> {
        Ok(self.insert_user(user)?)
    }

    fn find_by_id(&self, user_id: UserId) -> ReferralResult<Option<User>> {
        Ok(self.get_user(user_id)?)
    }

    fn find_by_referral_code(&self, code: &str) -> ReferralResult<Option<User>> {
        Ok(self.get_user_by_index(REFERRAL_CODE_INDEX, code)?)
    }

    fn find_by_email(&self, email: &str) -> ReferralResult<Option<User>> {
        Ok(self.get_user_by_index(EMAIL_INDEX, email)?)
    }

    fn find_children_of(&self, user_id: UserId) -> ReferralResult<Vec<User>> {
        Ok(self.list_children(user_id)?)
    }

    fn advance_status(
        &self,
        user_id: UserId,
        status: UserStatus,
    ) -> ReferralResult<(UserStatus, User)> {
        let mut previous = UserStatus::default();
        let user = self.modify_user(user_id, |user| {
            previous = user.status;
            if status < user.status {
                return Err(DbError::Rejected(format!(
                    "user {user_id} cannot move from {} back to {status}",
                    user.status
                )));
            }
            user.status = status;
            Ok(())
        })?;
        Ok((previous, user))
    }

    fn mark_contact_verified(
        &self,
        user_id: UserId,
        channel: ContactChannel,
    ) -> ReferralResult<User> {
        Ok(self.modify_user(user_id, |user| {
            match channel {
                ContactChannel::Email => user.email_verified = true,
                ContactChannel::Mobile => user.mobile_verified = true,
            }
            Ok(())
        })?)
    }

    fn list(&self) -> ReferralResult<Vec<User>> {
        Ok(self.list_users()?)
    }

    fn referral_code_exists(&self, code: &str) -> ReferralResult<bool> {
        let read_txn = self.db.begin_read().map_err(DbError::from)?;
        let codes = read_txn.open_table(REFERRAL_CODE_INDEX).map_err(DbError::from)?;
        Ok(codes.get(code).map_err(DbError::from)?.is_some())
    }
}

impl Ledger for ReferralDatabase {
    fn open_entry(&self, entry: NewLedgerEntry) -> ReferralResult<LedgerEntry> {
        Ok(self.insert_ledger_entry(entry)?)
    }

    fn find_entry(&self, user_id: UserId) -> ReferralResult<Option<LedgerEntry>> {
        Ok(self.get_ledger_entry(user_id)?)
    }

    fn mark_live(&self, user_id: UserId) -> ReferralResult<Option<LedgerEntry>> {
        Ok(self.set_ledger_live(user_id)?)
    }

    fn credit_bonus(&self, award: &BonusAward) -> ReferralResult<CreditOutcome> {
        Ok(self.apply_bonus(award)?)
    }
}

impl OtpStore for ReferralDatabase {
    fn save_otp(&self, record: &OtpRecord) -> ReferralResult<()> {
        Ok(self.put_otp(record)?)
    }

    fn find_otp(
        &self,
        user_id: UserId,
        channel: ContactChannel,
    ) -> ReferralResult<Option<OtpRecord>> {
        Ok(self.get_otp(user_id, channel)?)
    }
}

// =============================================================================
// Tests
// =============================================================================
