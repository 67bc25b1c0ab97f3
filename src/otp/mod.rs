// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Contact Verification (OTP)
//!
//! Six-digit one-time codes confirm a user's email address or mobile number.
//! Only an HMAC-SHA256 digest of each code is stored; a newer code for the
//! same channel replaces the pending one.

pub mod dispatch;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{info, warn};

use crate::referral::{ContactChannel, ReferralError, ReferralResult, User, UserDirectory, UserId};

pub use dispatch::{DispatchError, LogDispatcher, OtpDispatcher, WebhookDispatcher};

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_OTP_TTL_SECS: i64 = 600;

const INVALID_OTP: &str = "Invalid or expired OTP";

/// Stored state of the latest code sent on one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub user_id: UserId,
    pub channel: ContactChannel,
    /// Base64 HMAC of `user_id|channel|code`
    pub code_digest: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
}

/// Persistence for OTP records, one per `(user, channel)`.
pub trait OtpStore: Send + Sync {
    /// Insert or replace the record for its `(user, channel)`.
    fn save_otp(&self, record: &OtpRecord) -> ReferralResult<()>;

    fn find_otp(&self, user_id: UserId, channel: ContactChannel)
        -> ReferralResult<Option<OtpRecord>>;
}

/// Returned to the caller after a code went out. Never contains the code.
#[derive(Debug, Clone, Serialize)]
pub struct OtpReceipt {
    pub user_id: UserId,
    pub channel: ContactChannel,
    pub expires_at: DateTime<Utc>,
}

pub struct OtpService<'a> {
    directory: &'a dyn UserDirectory,
    store: &'a dyn OtpStore,
    dispatcher: &'a dyn OtpDispatcher,
    secret: &'a [u8],
    ttl: Duration,
}

impl<'a> OtpService<'a> {
    pub fn new(
        directory: &'a dyn UserDirectory,
        store: &'a dyn OtpStore,
        dispatcher: &'a dyn OtpDispatcher,
        secret: &'a [u8],
        ttl: Duration,
    ) -> Self {
        Self {
            directory,
            store,
            dispatcher,
            secret,
            ttl,
        }
    }

    pub async fn send(&self, user_id: UserId, channel: ContactChannel) -> ReferralResult<OtpReceipt> {
        let code = generate_code(&mut rand::thread_rng());
        self.send_code(user_id, channel, code).await
    }

    async fn send_code(
        &self,
        user_id: UserId,
        channel: ContactChannel,
        code: String,
    ) -> ReferralResult<OtpReceipt> {
        let user = self.directory.get(user_id)?;
        let contact = match channel {
            ContactChannel::Email => user.email.as_str(),
            ContactChannel::Mobile => user.mobile.as_str(),
        };

        let now = Utc::now();
        let record = OtpRecord {
            user_id,
            channel,
            code_digest: digest(self.secret, user_id, channel, &code)?,
            created_at: now,
            expires_at: now + self.ttl,
            verified: false,
        };

        // Persist only once the code is out; a failed resend keeps the
        // pending code usable.
        self.dispatcher
            .send(contact, &code, channel)
            .await
            .map_err(|e| {
                warn!(user_id = %user_id, channel = %channel, error = %e, "OTP dispatch failed");
                ReferralError::Dependency(format!("Failed to send OTP: {e}"))
            })?;
        self.store.save_otp(&record)?;

        info!(user_id = %user_id, channel = %channel, "OTP sent");
        Ok(OtpReceipt {
            user_id,
            channel,
            expires_at: record.expires_at,
        })
    }

    /// Check a submitted code and flag the channel as verified.
    ///
    /// Wrong, expired and already-used codes all fail the same way.
    pub fn verify(&self, user_id: UserId, code: &str, channel: ContactChannel) -> ReferralResult<User> {
        self.directory.get(user_id)?;

        let Some(mut record) = self.store.find_otp(user_id, channel)? else {
            return Err(ReferralError::Validation(INVALID_OTP.to_string()));
        };
        if record.verified || Utc::now() > record.expires_at {
            return Err(ReferralError::Validation(INVALID_OTP.to_string()));
        }
        if !code_matches(self.secret, &record, code.trim())? {
            return Err(ReferralError::Validation(INVALID_OTP.to_string()));
        }

        record.verified = true;
        self.store.save_otp(&record)?;
        let user = self.directory.mark_contact_verified(user_id, channel)?;

        info!(user_id = %user_id, channel = %channel, "Contact verified");
        Ok(user)
    }
}

/// Uniform six-digit code, never with a leading zero.
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(100_000..=999_999u32).to_string()
}

fn keyed_mac(secret: &[u8], user_id: UserId, channel: ContactChannel, code: &str) -> ReferralResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| ReferralError::Dependency(format!("OTP key rejected: {e}")))?;
    mac.update(format!("{user_id}|{}|{code}", channel.as_str()).as_bytes());
    Ok(mac)
}

fn digest(secret: &[u8], user_id: UserId, channel: ContactChannel, code: &str) -> ReferralResult<String> {
    let mac = keyed_mac(secret, user_id, channel, code)?;
    Ok(Base64::encode_string(&mac.finalize().into_bytes()))
}

fn code_matches(secret: &[u8], record: &OtpRecord, code: &str) -> ReferralResult<bool> {
    let Ok(expected) = Base64::decode_vec(&record.code_digest) else {
        return Ok(false);
    };
    let mac = keyed_mac(secret, record.user_id, record.channel, code)?;
    Ok(mac.verify_slice(&expected).is_ok())
}
