// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity and submission routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::submission::MAX_SUBMISSION_BODY_BYTES;
use crate::models::{Activity, ActivityUpdate, NewSubmission, SubmissionView};
use crate::services::ledger::ActivityDeleted;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/activities/{activity_id}",
            put(update_activity).delete(delete_activity),
        )
        .route(
            "/api/activities/{activity_id}/submissions",
            post(create_submission)
                .layer(DefaultBodyLimit::max(MAX_SUBMISSION_BODY_BYTES))
                .get(list_submissions),
        )
        .route(
            "/api/activities/{activity_id}/submissions/{user_id}",
            get(latest_submission),
        )
}

// ─── Activities ──────────────────────────────────────────────

async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<ActivityUpdate>, AppError>,
) -> Result<Json<Activity>> {
    Ok(Json(
        state
            .directory
            .update_activity(user.user_id, &activity_id, body)
            .await?,
    ))
}

/// Delete an activity and take back the points it awarded.
async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<String>,
) -> Result<Json<ActivityDeleted>> {
    Ok(Json(
        state
            .ledger
            .delete_activity(user.user_id, &activity_id)
            .await?,
    ))
}

// ─── Submissions ─────────────────────────────────────────────

async fn create_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<NewSubmission>, AppError>,
) -> Result<(StatusCode, Json<SubmissionView>)> {
    let view = state
        .submissions
        .create(user.user_id, &activity_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_submissions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(activity_id): Path<String>,
) -> Result<Json<Vec<SubmissionView>>> {
    Ok(Json(
        state
            .submissions
            .list_for_activity(user.user_id, &activity_id)
            .await?,
    ))
}

/// Latest submission of a member, or `null`.
async fn latest_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Path((activity_id, member_id)), _): WithRejection<
        Path<(String, u64)>,
        AppError,
    >,
) -> Result<Json<Option<SubmissionView>>> {
    Ok(Json(
        state
            .submissions
            .latest(user.user_id, &activity_id, member_id)
            .await?,
    ))
}
