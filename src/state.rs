// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use chrono::Duration;

use crate::auth::{PasswordHasher, Pbkdf2Hasher, TokenIssuer};
use crate::otp::{LogDispatcher, OtpDispatcher, DEFAULT_OTP_TTL_SECS};
use crate::referral::walker::DEFAULT_INNER_SHARING_THRESHOLD;
use crate::referral::RewardPolicy;
use crate::storage::ReferralDatabase;

/// OTP signing key and lifetime.
#[derive(Clone)]
pub struct OtpSettings {
    pub secret: Arc<[u8]>,
    pub ttl: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<ReferralDatabase>,
    pub tokens: Arc<TokenIssuer>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub dispatcher: Arc<dyn OtpDispatcher>,
    pub otp: OtpSettings,
    pub reward_policy: RewardPolicy,
    /// Direct referrals a subtree node needs for `completed_inner_sharing`
    pub inner_sharing_threshold: usize,
    pub admin_emails: Arc<[String]>,
}

impl AppState {
    /// State with the default hasher, the log dispatcher and default policy.
    ///
    /// The OTP key defaults to the token secret.
    pub fn new(db: ReferralDatabase, token_secret: &[u8], token_ttl_secs: i64) -> Self {
        Self {
            db: Arc::new(db),
            tokens: Arc::new(TokenIssuer::new(token_secret, token_ttl_secs)),
            hasher: Arc::new(Pbkdf2Hasher::default()),
            dispatcher: Arc::new(LogDispatcher),
            otp: OtpSettings {
                secret: Arc::from(token_secret),
                ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS),
            },
            reward_policy: RewardPolicy::default(),
            inner_sharing_threshold: DEFAULT_INNER_SHARING_THRESHOLD,
            admin_emails: Arc::from(Vec::new()),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn PasswordHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn OtpDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_otp(mut self, secret: &[u8], ttl_secs: i64) -> Self {
        self.otp = OtpSettings {
            secret: Arc::from(secret),
            ttl: Duration::seconds(ttl_secs),
        };
        self
    }

    pub fn with_reward_policy(mut self, policy: RewardPolicy) -> Self {
        self.reward_policy = policy;
        self
    }

    pub fn with_inner_sharing_threshold(mut self, threshold: usize) -> Self {
        self.inner_sharing_threshold = threshold;
        self
    }

    pub fn with_admin_emails(mut self, admin_emails: Vec<String>) -> Self {
        self.admin_emails = Arc::from(admin_emails);
        self
    }
}
