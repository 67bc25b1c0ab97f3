// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Referral code generation.
//!
//! Codes look like `REF4821QZ`: a fixed three-letter prefix, a number in
//! `1000..=9999` and two uppercase letters. The space holds 9000 × 26²
//! (about 6.08M) codes, so collisions are resolved by simply drawing again.

use rand::Rng;

use super::error::ReferralResult;
use super::traits::UserDirectory;

pub const REFERRAL_CODE_PREFIX: &str = "REF";

const ALPHABET: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Draw one code. No uniqueness check.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let number: u16 = rng.gen_range(1000..=9999);
    let first = ALPHABET[rng.gen_range(0..ALPHABET.len())] as char;
    let second = ALPHABET[rng.gen_range(0..ALPHABET.len())] as char;
    format!("{REFERRAL_CODE_PREFIX}{number}{first}{second}")
}

/// Draw codes until one is not yet assigned in the directory.
///
/// Retries are unbounded. The check is advisory: the directory enforces
/// uniqueness again when the user is committed.
pub fn generate_unique<R: Rng + ?Sized>(
    directory: &dyn UserDirectory,
    rng: &mut R,
) -> ReferralResult<String> {
    let mut attempts = 0u32;
    loop {
        let code = generate(rng);
        attempts += 1;
        if !directory.referral_code_exists(&code)? {
            if attempts > 1 {
                tracing::debug!(attempts, "Referral code collided, redrew");
            }
            return Ok(code);
        }
    }
}

/// Whether `code` has the `[A-Z]{3}[0-9]{4}[A-Z]{2}` shape.
pub fn is_well_formed(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 9
        && bytes[..3].iter().all(u8::is_ascii_uppercase)
        && bytes[3..7].iter().all(u8::is_ascii_digit)
        && bytes[7..].iter().all(u8::is_ascii_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user_with_code, temp_db};
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn generated_codes_have_expected_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let code = generate(&mut rng);
            assert!(is_well_formed(&code), "bad code {code}");
            assert!(code.starts_with(REFERRAL_CODE_PREFIX));
            let number: u16 = code[3..7].parse().unwrap();
            assert!((1000..=9999).contains(&number));
        }
    }

    #[test]
    fn well_formed_rejects_other_shapes() {
        assert!(is_well_formed("REF4821QZ"));
        assert!(!is_well_formed("ref4821QZ"));
        assert!(!is_well_formed("REF482QZ"));
        assert!(!is_well_formed("REF4821Q1"));
        assert!(!is_well_formed("REF4821QZX"));
        assert!(!is_well_formed(""));
    }

    #[test]
    fn generate_unique_skips_taken_codes() {
        let (db, _dir) = temp_db();

        let taken = generate(&mut StdRng::seed_from_u64(7));
        seed_user_with_code(&db, "holder", None, &taken);

        // Same seed: the first draw collides and must be redrawn.
        let code = generate_unique(&db, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_ne!(code, taken);
        assert!(is_well_formed(&code));
    }
}
