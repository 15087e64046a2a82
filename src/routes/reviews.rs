// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Review routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{NewReview, Review, SubmissionView};
use crate::services::submission::PendingReview;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/submissions/{submission_id}/reviews",
            post(create_review).get(list_reviews),
        )
        .route("/api/reviews/pending", get(pending_reviews))
}

/// Cast a vote. Responds with the submission after re-evaluation.
async fn create_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(submission_id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<NewReview>, AppError>,
) -> Result<(StatusCode, Json<SubmissionView>)> {
    let view = state
        .reviews
        .record(user.user_id, &submission_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(submission_id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(
        state.reviews.list(user.user_id, &submission_id).await?,
    ))
}

async fn pending_reviews(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<PendingReview>>> {
    Ok(Json(state.submissions.pending_for_user(user.user_id).await?))
}
