// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing with PBKDF2-HMAC-SHA256.
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt b64>$<digest b64>`.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::rand::{SecureRandom, SystemRandom};
use ring::{digest, pbkdf2};

use crate::referral::{ReferralError, ReferralResult};

static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA256;
const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const CREDENTIAL_LEN: usize = digest::SHA256_OUTPUT_LEN;

pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// One-way password hashing. Plaintext never leaves the call.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> ReferralResult<String>;

    /// `false` for a wrong password and for an unparseable hash.
    fn verify(&self, password: &str, encoded: &str) -> bool;
}

pub struct Pbkdf2Hasher {
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
            rng: SystemRandom::new(),
        }
    }
}

impl Default for Pbkdf2Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_ITERATIONS)
    }
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, password: &str) -> ReferralResult<String> {
        let mut salt = [0u8; SALT_LEN];
        self.rng
            .fill(&mut salt)
            .map_err(|_| ReferralError::Dependency("system randomness unavailable".to_string()))?;

        let mut credential = [0u8; CREDENTIAL_LEN];
        pbkdf2::derive(
            ALGORITHM,
            self.iterations,
            &salt,
            password.as_bytes(),
            &mut credential,
        );

        Ok(format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            Base64::encode_string(&salt),
            Base64::encode_string(&credential)
        ))
    }

    fn verify(&self, password: &str, encoded: &str) -> bool {
        let mut parts = encoded.split('$');
        let (Some(SCHEME), Some(iterations), Some(salt), Some(credential), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        let Some(iterations) = iterations.parse().ok().and_then(NonZeroU32::new) else {
            return false;
        };
        let (Ok(salt), Ok(credential)) = (Base64::decode_vec(salt), Base64::decode_vec(credential))
        else {
            return false;
        };

        pbkdf2::verify(
            ALGORITHM,
            iterations,
            &salt,
            password.as_bytes(),
            &credential,
        )
        .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = Pbkdf2Hasher::new(1_000);
        let encoded = hasher.hash("hunter2!").unwrap();

        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("hunter2!", &encoded));
        assert!(!hasher.verify("hunter3!", &encoded));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = Pbkdf2Hasher::new(1_000);
        let first = hasher.hash("same").unwrap();
        let second = hasher.hash("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn verify_honours_encoded_iterations() {
        let encoded = Pbkdf2Hasher::new(1_500).hash("pw").unwrap();
        assert!(Pbkdf2Hasher::new(1_000).verify("pw", &encoded));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        let hasher = Pbkdf2Hasher::new(1_000);
        for encoded in [
            "",
            "plaintext",
            "bcrypt$10$abc$def",
            "pbkdf2-sha256$0$AAAA$AAAA",
            "pbkdf2-sha256$1000$!!!$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA$extra",
        ] {
            assert!(!hasher.verify("pw", encoded), "accepted {encoded:?}");
        }
    }
}
