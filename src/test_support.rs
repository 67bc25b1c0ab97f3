// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fixtures shared by the in-module tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::api::router;
use crate::auth::Pbkdf2Hasher;
use crate::referral::{
    Ledger, LedgerEntry, LedgerStatus, NewLedgerEntry, NewUser, User, UserDirectory, UserId,
};
use crate::state::AppState;
use crate::storage::ReferralDatabase;

pub const TEST_JWT_SECRET: &[u8] = b"test-jwt-secret";

static SEQ: AtomicU64 = AtomicU64::new(1);

pub fn temp_db() -> (ReferralDatabase, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = ReferralDatabase::open(&dir.path().join("test.redb")).expect("Failed to open db");
    (db, dir)
}

/// AppState over a fresh database, with a cheap hasher for speed.
pub fn test_state() -> (AppState, TempDir) {
    let (db, dir) = temp_db();
    let state = AppState::new(db, TEST_JWT_SECRET, 3600)
        .with_hasher(Arc::new(Pbkdf2Hasher::new(1_000)));
    (state, dir)
}

/// A `NewUser` whose unique fields are derived from `name`.
pub fn new_user(name: &str, code: &str, parent: Option<UserId>) -> NewUser {
    NewUser {
        name: name.to_string(),
        email: format!("{name}@example.com"),
        mobile: format!("+1555-{name}"),
        password_hash: format!("hash-{name}"),
        referral_code: code.to_string(),
        parent_user_id: parent,
        is_admin: false,
    }
}

fn next_code(n: u64) -> String {
    let letter = (b'A' + (n / 9000 % 26) as u8) as char;
    format!("REF{:04}{letter}Z", 1000 + n % 9000)
}

pub fn seed_user_with_code(
    db: &ReferralDatabase,
    name: &str,
    parent: Option<&User>,
    code: &str,
) -> User {
    let n = SEQ.fetch_add(1, Ordering::Relaxed);
    db.create(NewUser {
        name: name.to_string(),
        email: format!("{name}.{n}@example.com"),
        mobile: format!("+1555{n:07}"),
        password_hash: format!("hash-{name}"),
        referral_code: code.to_string(),
        parent_user_id: parent.map(|p| p.user_id),
        is_admin: false,
    })
    .expect("seed user")
}

pub fn seed_user(db: &ReferralDatabase, name: &str, parent: Option<&User>) -> User {
    let code = next_code(SEQ.fetch_add(1, Ordering::Relaxed));
    seed_user_with_code(db, name, parent, &code)
}

pub fn seed_admin(db: &ReferralDatabase) -> User {
    let n = SEQ.fetch_add(1, Ordering::Relaxed);
    db.create(NewUser {
        is_admin: true,
        ..new_user(&format!("admin{n}"), &next_code(n), None)
    })
    .expect("seed admin")
}

/// `n` users, each the only child of the previous one.
pub fn seed_chain(db: &ReferralDatabase, n: usize) -> Vec<User> {
    let mut chain: Vec<User> = Vec::with_capacity(n);
    for i in 0..n {
        let user = seed_user(db, &format!("level{i}"), chain.last());
        chain.push(user);
    }
    chain
}

pub fn open_ledger(db: &ReferralDatabase, user: &User) -> LedgerEntry {
    db.open_entry(NewLedgerEntry {
        user_id: user.user_id,
        total_amount: 1_000,
        payment_method: "card".to_string(),
        transaction_id: format!("tx-{}", user.user_id),
        status: LedgerStatus::Pending,
    })
    .expect("open ledger")
}

pub fn bearer(state: &AppState, user: &User) -> String {
    format!("Bearer {}", state.tokens.issue(user).expect("issue token").token)
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).expect("request")
}

/// Drive the full router once; returns the status and the JSON body
/// (`Null` when empty).
pub async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = router(state.clone()).oneshot(request).await.expect("router");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}
