// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Delivery of one-time codes to an email address or a mobile number.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::referral::ContactChannel;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Sends a code to a contact. Implementations must not retry.
#[async_trait]
pub trait OtpDispatcher: Send + Sync {
    async fn send(
        &self,
        contact: &str,
        code: &str,
        channel: ContactChannel,
    ) -> Result<(), DispatchError>;
}

/// Development dispatcher: the code only goes to the log.
#[derive(Debug, Default)]
pub struct LogDispatcher;

#[async_trait]
impl OtpDispatcher for LogDispatcher {
    async fn send(
        &self,
        contact: &str,
        code: &str,
        channel: ContactChannel,
    ) -> Result<(), DispatchError> {
        debug!(channel = %channel, to = %contact, code = %code, "OTP issued (log dispatcher)");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct GatewayMessage<'a> {
    channel: &'a str,
    to: String,
    message: String,
}

/// Posts `{channel, to, message}` as JSON to an external SMS/email gateway.
pub struct WebhookDispatcher {
    http: Client,
    endpoint: Url,
}

impl WebhookDispatcher {
    pub fn new(endpoint: Url) -> Result<Self, DispatchError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DispatchError::Client(e.to_string()))?;
        Ok(Self { http, endpoint })
    }
}

#[async_trait]
impl OtpDispatcher for WebhookDispatcher {
    async fn send(
        &self,
        contact: &str,
        code: &str,
        channel: ContactChannel,
    ) -> Result<(), DispatchError> {
        let to = match channel {
            ContactChannel::Email => contact.trim().to_string(),
            ContactChannel::Mobile => to_e164(contact),
        };
        let payload = GatewayMessage {
            channel: channel.as_str(),
            to,
            message: format!("Your verification code is {code}"),
        };

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected { status, body });
        }

        debug!(channel = %channel, "OTP handed to gateway");
        Ok(())
    }
}

/// Strip separators and make sure the number carries a leading `+`.
pub fn to_e164(mobile: &str) -> String {
    let digits: String = mobile
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    format!("+{digits}")
}
