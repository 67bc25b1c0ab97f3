// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup. Invalid
//! values are startup errors; nothing is re-read afterwards.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the database file | `./data` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `JWT_SECRET` | HS256 signing secret for session tokens | Required |
//! | `TOKEN_TTL_SECS` | Session token lifetime | `28800` |
//! | `OTP_SECRET` | HMAC key for stored OTP digests | `JWT_SECRET` |
//! | `OTP_TTL_SECS` | OTP lifetime | `600` |
//! | `OTP_WEBHOOK_URL` | Gateway for OTP delivery; unset logs codes instead | unset |
//! | `ADMIN_EMAILS` | Comma-separated emails registered as admins | empty |
//! | `DIRECT_REFERRAL_BONUS` | Paid to the parent of a user going live | `100` |
//! | `MILESTONE_BONUS` | Paid per qualifying branch | `500` |
//! | `MILESTONE_DEPTH` | Levels up to the milestone ancestor | `7` |
//! | `MILESTONE_THRESHOLD` | Live users a branch needs | `7` |
//! | `INNER_SHARING_THRESHOLD` | Direct referrals that complete the inner-sharing task | `6` |

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use url::Url;

use crate::otp::DEFAULT_OTP_TTL_SECS;
use crate::referral::rewards::{
    DEFAULT_DIRECT_BONUS, DEFAULT_MILESTONE_BONUS, DEFAULT_MILESTONE_THRESHOLD,
};
use crate::referral::walker::{DEFAULT_ANCESTOR_DEPTH, DEFAULT_INNER_SHARING_THRESHOLD};
use crate::referral::RewardPolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const TOKEN_TTL_ENV: &str = "TOKEN_TTL_SECS";
pub const OTP_SECRET_ENV: &str = "OTP_SECRET";
pub const OTP_TTL_ENV: &str = "OTP_TTL_SECS";
pub const OTP_WEBHOOK_URL_ENV: &str = "OTP_WEBHOOK_URL";
pub const ADMIN_EMAILS_ENV: &str = "ADMIN_EMAILS";
pub const DIRECT_BONUS_ENV: &str = "DIRECT_REFERRAL_BONUS";
pub const MILESTONE_BONUS_ENV: &str = "MILESTONE_BONUS";
pub const MILESTONE_DEPTH_ENV: &str = "MILESTONE_DEPTH";
pub const MILESTONE_THRESHOLD_ENV: &str = "MILESTONE_THRESHOLD";
pub const INNER_SHARING_THRESHOLD_ENV: &str = "INNER_SHARING_THRESHOLD";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 8 * 60 * 60;

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "referrals.redb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub log_format: LogFormat,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub otp_secret: String,
    pub otp_ttl_secs: i64,
    pub otp_webhook_url: Option<Url>,
    /// Normalized emails that register with the admin flag
    pub admin_emails: Vec<String>,
    pub reward_policy: RewardPolicy,
    pub inner_sharing_threshold: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host: IpAddr = parse_or(&var, HOST_ENV, DEFAULT_HOST.parse().ok())?;
        let port: u16 = parse_or(&var, PORT_ENV, Some(DEFAULT_PORT))?;

        let log_format = match var(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    value: other.to_string(),
                    reason: "expected `json` or `pretty`".to_string(),
                })
            }
        };

        let jwt_secret = var(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;
        let otp_secret = var(OTP_SECRET_ENV).unwrap_or_else(|| jwt_secret.clone());

        let token_ttl_secs: i64 = parse_or(&var, TOKEN_TTL_ENV, Some(DEFAULT_TOKEN_TTL_SECS))?;
        let otp_ttl_secs: i64 = parse_or(&var, OTP_TTL_ENV, Some(DEFAULT_OTP_TTL_SECS))?;
        for (name, value) in [(TOKEN_TTL_ENV, token_ttl_secs), (OTP_TTL_ENV, otp_ttl_secs)] {
            if value <= 0 {
                return Err(ConfigError::Invalid {
                    name,
                    value: value.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }

        let otp_webhook_url = match var(OTP_WEBHOOK_URL_ENV) {
            Some(raw) => Some(Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
                name: OTP_WEBHOOK_URL_ENV,
                value: raw.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        let admin_emails = var(ADMIN_EMAILS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(crate::referral::normalize_email)
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let reward_policy = RewardPolicy {
            direct_bonus: parse_or(&var, DIRECT_BONUS_ENV, Some(DEFAULT_DIRECT_BONUS))?,
            milestone_bonus: parse_or(&var, MILESTONE_BONUS_ENV, Some(DEFAULT_MILESTONE_BONUS))?,
            milestone_depth: parse_or(&var, MILESTONE_DEPTH_ENV, Some(DEFAULT_ANCESTOR_DEPTH))?,
            milestone_threshold: parse_or(
                &var,
                MILESTONE_THRESHOLD_ENV,
                Some(DEFAULT_MILESTONE_THRESHOLD),
            )?,
        };
        if reward_policy.milestone_threshold == 0 {
            return Err(ConfigError::Invalid {
                name: MILESTONE_THRESHOLD_ENV,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let inner_sharing_threshold: usize = parse_or(
            &var,
            INNER_SHARING_THRESHOLD_ENV,
            Some(DEFAULT_INNER_SHARING_THRESHOLD),
        )?;

        Ok(Self {
            bind_addr: SocketAddr::new(host, port),
            data_dir: var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            log_format,
            jwt_secret,
            token_ttl_secs,
            otp_secret,
            otp_ttl_secs,
            otp_webhook_url,
            admin_emails,
            reward_policy,
            inner_sharing_threshold,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

/// Parse `name` if set, otherwise fall back to `default`.
fn parse_or<T, V>(var: &V, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    V: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = config_from(&[(JWT_SECRET_ENV, "s3cret")]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.token_ttl_secs, DEFAULT_TOKEN_TTL_SECS);
        assert_eq!(config.otp_ttl_secs, DEFAULT_OTP_TTL_SECS);
        assert_eq!(config.otp_secret, "s3cret");
        assert!(config.otp_webhook_url.is_none());
        assert!(config.admin_emails.is_empty());
        assert_eq!(config.reward_policy, RewardPolicy::default());
        assert_eq!(config.inner_sharing_threshold, DEFAULT_INNER_SHARING_THRESHOLD);
        assert_eq!(
            config.database_path(),
            PathBuf::from("./data").join("referrals.redb")
        );
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(matches!(
            config_from(&[]),
            Err(ConfigError::Missing(JWT_SECRET_ENV))
        ));
        assert!(matches!(
            config_from(&[(JWT_SECRET_ENV, "   ")]),
            Err(ConfigError::Missing(JWT_SECRET_ENV))
        ));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            (JWT_SECRET_ENV, "s3cret"),
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9000"),
            (DATA_DIR_ENV, "/var/lib/referrals"),
            (LOG_FORMAT_ENV, "json"),
            (OTP_SECRET_ENV, "otp"),
            (OTP_WEBHOOK_URL_ENV, "https://sms.example.com/send"),
            (ADMIN_EMAILS_ENV, " Root@Example.com ,ops@example.com,"),
            (DIRECT_BONUS_ENV, "50"),
            (MILESTONE_BONUS_ENV, "250"),
            (MILESTONE_DEPTH_ENV, "3"),
            (MILESTONE_THRESHOLD_ENV, "2"),
            (INNER_SHARING_THRESHOLD_ENV, "4"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.otp_secret, "otp");
        assert_eq!(
            config.otp_webhook_url.as_ref().unwrap().as_str(),
            "https://sms.example.com/send"
        );
        assert_eq!(config.admin_emails, vec!["root@example.com", "ops@example.com"]);
        assert_eq!(
            config.reward_policy,
            RewardPolicy {
                direct_bonus: 50,
                milestone_bonus: 250,
                milestone_depth: 3,
                milestone_threshold: 2,
            }
        );
        assert_eq!(config.inner_sharing_threshold, 4);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/var/lib/referrals/referrals.redb")
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (name, value) in [
            (PORT_ENV, "eighty"),
            (LOG_FORMAT_ENV, "xml"),
            (TOKEN_TTL_ENV, "0"),
            (OTP_TTL_ENV, "-5"),
            (OTP_WEBHOOK_URL_ENV, "not a url"),
            (DIRECT_BONUS_ENV, "-1"),
            (MILESTONE_THRESHOLD_ENV, "0"),
            (INNER_SHARING_THRESHOLD_ENV, "six"),
        ] {
            let result = config_from(&[(JWT_SECRET_ENV, "s3cret"), (name, value)]);
            assert!(
                matches!(result, Err(ConfigError::Invalid { .. })),
                "{name}={value} was accepted"
            );
        }
    }
}
