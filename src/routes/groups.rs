// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Group, membership and per-group activity routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Activity, Membership, NewActivity};
use crate::services::directory::{GroupDetail, GroupSummary};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/groups", post(create_group).get(list_groups))
        .route("/api/groups/{group_id}", get(get_group))
        .route("/api/groups/{group_id}/members", post(add_member))
        .route(
            "/api/groups/{group_id}/members/{user_id}",
            delete(remove_member),
        )
        .route(
            "/api/groups/{group_id}/members/{user_id}/points",
            put(set_points),
        )
        .route(
            "/api/groups/{group_id}/activities",
            post(create_activity).get(list_activities),
        )
}

// ─── Groups ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateGroupRequest {
    name: String,
}

async fn create_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(body), _): WithRejection<Json<CreateGroupRequest>, AppError>,
) -> Result<(StatusCode, Json<GroupSummary>)> {
    let group = state.directory.create_group(user.user_id, &body.name).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

async fn list_groups(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<GroupSummary>>> {
    Ok(Json(state.directory.list_groups(user.user_id).await?))
}

async fn get_group(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupDetail>> {
    Ok(Json(
        state.directory.group_detail(user.user_id, &group_id).await?,
    ))
}

// ─── Members ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct AddMemberRequest {
    user_id: u64,
}

async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<AddMemberRequest>, AppError>,
) -> Result<(StatusCode, Json<Membership>)> {
    let membership = state
        .directory
        .add_member(user.user_id, &group_id, body.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path((group_id, member_id)), _): WithRejection<
        Path<(String, u64)>,
        AppError,
    >,
) -> Result<StatusCode> {
    state
        .directory
        .remove_member(user.user_id, &group_id, member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SetPointsRequest {
    points: i64,
}

async fn set_points(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path((group_id, member_id)), _): WithRejection<
        Path<(String, u64)>,
        AppError,
    >,
    WithRejection(Json(body), _): WithRejection<Json<SetPointsRequest>, AppError>,
) -> Result<Json<Membership>> {
    let membership = state
        .ledger
        .set_points(user.user_id, &group_id, member_id, body.points)
        .await?;
    Ok(Json(membership))
}

// ─── Activities ──────────────────────────────────────────────

async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<NewActivity>, AppError>,
) -> Result<(StatusCode, Json<Activity>)> {
    let activity = state
        .directory
        .create_activity(user.user_id, &group_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn list_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<Activity>>> {
    Ok(Json(
        state
            .directory
            .list_activities(user.user_id, &group_id)
            .await?,
    ))
}
