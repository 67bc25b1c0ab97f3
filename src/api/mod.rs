// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub mod auth;
pub mod health;
pub mod ledger;
pub mod otp;
pub mod referrals;
pub mod users;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/users", get(users::list_users).post(users::register_user))
        .route("/users/{user_id}", get(users::get_user))
        .route("/users/{user_id}/status", put(users::update_status))
        .route("/auth/login", post(auth::login))
        .route("/referrals/{user_id}/chain", get(referrals::first_child_chain))
        .route("/referrals/{user_id}/tree", get(referrals::descendant_tree))
        .route("/referrals/{user_id}/ancestor", get(referrals::ancestor))
        .route("/ledger", post(ledger::create_entry))
        .route("/ledger/{user_id}", get(ledger::get_entry))
        .route("/otp/send", post(otp::send_otp))
        .route("/otp/verify", post(otp::verify_otp));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Outermost first: assign the request id before the trace span opens.
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CorsLayer::permissive());

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .layer(middleware)
        .with_state(state)
}
