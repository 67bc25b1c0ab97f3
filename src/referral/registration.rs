// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User registration: places a new user into the referral forest.

use rand::Rng;
use serde::Deserialize;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use super::code;
use super::error::{ReferralError, ReferralResult};
use super::traits::UserDirectory;
use super::types::{NewUser, User};
use crate::auth::PasswordHasher;

/// Registration input, as submitted by the user.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
    /// Code of the referrer, if the user was invited
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// Canonical form used for the unique email index.
pub fn normalize_email(email: &str) -> String {
    email.trim().nfkc().collect::<String>().to_lowercase()
}

pub struct RegistrationService<'a> {
    directory: &'a dyn UserDirectory,
    hasher: &'a dyn PasswordHasher,
    admin_emails: &'a [String],
}

impl<'a> RegistrationService<'a> {
    pub fn new(directory: &'a dyn UserDirectory, hasher: &'a dyn PasswordHasher) -> Self {
        Self {
            directory,
            hasher,
            admin_emails: &[],
        }
    }

    /// Normalized emails that receive the admin flag on registration.
    pub fn with_admin_emails(mut self, admin_emails: &'a [String]) -> Self {
        self.admin_emails = admin_emails;
        self
    }

    pub fn register(&self, registration: Registration) -> ReferralResult<User> {
        self.register_with_rng(registration, &mut rand::thread_rng())
    }

    /// Register a user, drawing its referral code from `rng`.
    ///
    /// An unknown or malformed referral code does not fail registration; the
    /// user simply becomes the root of a new tree.
    pub fn register_with_rng<R: Rng + ?Sized>(
        &self,
        registration: Registration,
        rng: &mut R,
    ) -> ReferralResult<User> {
        validate(&registration)?;

        let email = normalize_email(&registration.email);
        let parent = match registration.referral_code.as_deref() {
            Some(raw) => self.resolve_referrer(raw)?,
            None => None,
        };

        let password_hash = self.hasher.hash(&registration.password)?;
        let referral_code = code::generate_unique(self.directory, rng)?;
        let is_admin = self.admin_emails.iter().any(|admin| *admin == email);

        let user = self.directory.create(NewUser {
            name: registration.name.trim().to_string(),
            email,
            mobile: registration.mobile.trim().to_string(),
            password_hash,
            referral_code,
            parent_user_id: parent.as_ref().map(|p| p.user_id),
            is_admin,
        })?;

        info!(
            user_id = %user.user_id,
            parent_id = ?user.parent_user_id,
            referral_code = %user.referral_code,
            "User registered"
        );
        Ok(user)
    }

    fn resolve_referrer(&self, raw: &str) -> ReferralResult<Option<User>> {
        let referral_code = raw.trim().to_ascii_uppercase();
        if referral_code.is_empty() {
            return Ok(None);
        }
        if !code::is_well_formed(&referral_code) {
            debug!(referral_code = %referral_code, "Ignoring malformed referral code");
            return Ok(None);
        }

        let referrer = self.directory.find_by_referral_code(&referral_code)?;
        if referrer.is_none() {
            debug!(referral_code = %referral_code, "Referral code matches no user");
        }
        Ok(referrer)
    }
}

fn validate(registration: &Registration) -> ReferralResult<()> {
    let required = [
        ("name", &registration.name),
        ("email", &registration.email),
        ("mobile", &registration.mobile),
        ("password", &registration.password),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ReferralError::Validation(format!("{field} is required")));
        }
    }

    if !registration.email.contains('@') {
        return Err(ReferralError::Validation(
            "email must be a valid address".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Pbkdf2Hasher;
    use crate::test_support::temp_db;
    use rand::{rngs::StdRng, SeedableRng};

    fn registration(name: &str, referral_code: Option<&str>) -> Registration {
        Registration {
            name: name.to_string(),
            email: format!("{name}@Example.com"),
            mobile: format!("+1555{:04}", name.len() * 97),
            password: "correct horse".to_string(),
            referral_code: referral_code.map(str::to_string),
        }
    }

    #[test]
    fn register_with_valid_code_links_parent() {
        let (db, _dir) = temp_db();
        let hasher = Pbkdf2Hasher::new(1_000);
        let service = RegistrationService::new(&db, &hasher);
        let mut rng = StdRng::seed_from_u64(1);

        let a = service
            .register_with_rng(registration("alice", None), &mut rng)
            .unwrap();
        assert!(a.is_root());
        assert!(code::is_well_formed(&a.referral_code));

        let b = service
            .register_with_rng(registration("bob", Some(&a.referral_code)), &mut rng)
            .unwrap();
        assert_eq!(b.parent_user_id, Some(a.user_id));
        assert_ne!(a.referral_code, b.referral_code);

        let children = db.find_children_of(a.user_id).unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].user_id, b.user_id);
    }

    #[test]
    fn unknown_or_malformed_code_leaves_user_root() {
        let (db, _dir) = temp_db();
        let hasher = Pbkdf2Hasher::new(1_000);
        let service = RegistrationService::new(&db, &hasher);

        let unknown = service
            .register(registration("carol", Some("REF0000AA")))
            .unwrap();
        assert!(unknown.parent_user_id.is_none());

        let malformed = service
            .register(registration("dave", Some("not-a-code")))
            .unwrap();
        assert!(malformed.parent_user_id.is_none());
    }

    #[test]
    fn lowercase_code_still_resolves() {
        let (db, _dir) = temp_db();
        let hasher = Pbkdf2Hasher::new(1_000);
        let service = RegistrationService::new(&db, &hasher);

        let a = service.register(registration("erin", None)).unwrap();
        let lower = a.referral_code.to_ascii_lowercase();
        let b = service.register(registration("frank", Some(&lower))).unwrap();
        assert_eq!(b.parent_user_id, Some(a.user_id));
    }

    #[test]
    fn email_is_normalized_and_password_hashed() {
        let (db, _dir) = temp_db();
        let hasher = Pbkdf2Hasher::new(1_000);
        let service = RegistrationService::new(&db, &hasher);

        let user = service.register(registration("grace", None)).unwrap();
        assert_eq!(user.email, "grace@example.com");
        assert_ne!(user.password_hash, "correct horse");
        assert!(hasher.verify("correct horse", &user.password_hash));
        assert!(db.find_by_email("grace@example.com").unwrap().is_some());
    }

    #[test]
    fn duplicate_email_conflicts() {
        let (db, _dir) = temp_db();
        let hasher = Pbkdf2Hasher::new(1_000);
        let service = RegistrationService::new(&db, &hasher);

        service.register(registration("heidi", None)).unwrap();
        let mut again = registration("heidi", None);
        again.mobile = "+15559999".to_string();
        again.email = "  HEIDI@example.com ".to_string();

        assert!(matches!(
            service.register(again),
            Err(ReferralError::Conflict(_))
        ));
    }

    #[test]
    fn listed_email_registers_as_admin() {
        let (db, _dir) = temp_db();
        let hasher = Pbkdf2Hasher::new(1_000);
        let admins = vec!["root@example.com".to_string()];
        let service = RegistrationService::new(&db, &hasher).with_admin_emails(&admins);

        let root = service.register(registration("root", None)).unwrap();
        assert!(root.is_admin);
        let other = service.register(registration("karla", None)).unwrap();
        assert!(!other.is_admin);
    }

    #[test]
    fn missing_fields_fail_validation() {
        let (db, _dir) = temp_db();
        let hasher = Pbkdf2Hasher::new(1_000);
        let service = RegistrationService::new(&db, &hasher);

        let mut missing_name = registration("ivan", None);
        missing_name.name = "  ".to_string();
        assert!(matches!(
            service.register(missing_name),
            Err(ReferralError::Validation(_))
        ));

        let mut bad_email = registration("judy", None);
        bad_email.email = "judy.example.com".to_string();
        assert!(matches!(
            service.register(bad_email),
            Err(ReferralError::Validation(_))
        ));
    }
}
