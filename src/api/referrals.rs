// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    auth::Auth,
    error::ApiError,
    models::{AncestorQuery, AncestorResponse, ChainResponse, TreeResponse},
    referral::{TreeWalker, UserId},
    state::AppState,
};

/// Follow the earliest referral at each level, starting at `user_id`.
pub async fn first_child_chain(
    Auth(_claims): Auth,
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<ChainResponse>, ApiError> {
    let user_id = UserId(user_id);
    let chain = TreeWalker::new(state.db.as_ref()).first_child_chain(user_id)?;
    Ok(Json(ChainResponse { user_id, chain }))
}

/// The whole subtree below `user_id`, with per-node live counts.
pub async fn descendant_tree(
    Auth(_claims): Auth,
    Path(user_id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<TreeResponse>, ApiError> {
    let tree = TreeWalker::new(state.db.as_ref())
        .with_inner_sharing_threshold(state.inner_sharing_threshold)
        .descendant_tree(UserId(user_id))?;
    Ok(Json(TreeResponse { tree }))
}

/// The user exactly `depth` levels above `user_id` (milestone depth by default).
pub async fn ancestor(
    Auth(_claims): Auth,
    Path(user_id): Path<u64>,
    Query(query): Query<AncestorQuery>,
    State(state): State<AppState>,
) -> Result<Json<AncestorResponse>, ApiError> {
    let user_id = UserId(user_id);
    let depth = query.depth.unwrap_or(state.reward_policy.milestone_depth);
    let ancestor = TreeWalker::new(state.db.as_ref()).ancestor_at_depth(user_id, depth)?;
    Ok(Json(AncestorResponse {
        user_id,
        depth,
        ancestor,
    }))
}
