// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use referral_network_server::{
    api::router,
    config::{AppConfig, LogFormat},
    otp::{LogDispatcher, OtpDispatcher, WebhookDispatcher},
    state::AppState,
    storage::ReferralDatabase,
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    let db_path = config.database_path();
    let db = match ReferralDatabase::open(&db_path) {
        Ok(db) => db,
        Err(e) => {
            error!(path = %db_path.display(), error = %e, "Failed to open database");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %db_path.display(), "Database opened");

    let dispatcher: Arc<dyn OtpDispatcher> = match config.otp_webhook_url.clone() {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "OTP codes will be sent through the webhook gateway");
            match WebhookDispatcher::new(endpoint) {
                Ok(dispatcher) => Arc::new(dispatcher),
                Err(e) => {
                    error!(error = %e, "Failed to build OTP gateway client");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => {
            warn!("OTP_WEBHOOK_URL not set; OTP codes are only logged");
            Arc::new(LogDispatcher)
        }
    };

    let state = AppState::new(db, config.jwt_secret.as_bytes(), config.token_ttl_secs)
        .with_dispatcher(dispatcher)
        .with_otp(config.otp_secret.as_bytes(), config.otp_ttl_secs)
        .with_reward_policy(config.reward_policy)
        .with_inner_sharing_threshold(config.inner_sharing_threshold)
        .with_admin_emails(config.admin_emails.clone());
    let app = router(state);

    let listener = match TcpListener::bind(config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %config.bind_addr, error = %e, "Failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(addr = %config.bind_addr, "Referral network server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
