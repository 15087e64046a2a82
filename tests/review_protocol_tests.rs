// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Peer review and quorum tests.
//!
//! A submission settles once approvals or rejections reach half the group
//! (rounded up), and an approval credits the submitter exactly once.

use axum::http::{Method, StatusCode};
use lyfez_backend::db::Store;
use lyfez_backend::error::{AppError, ConflictKind};
use lyfez_backend::models::SubmissionStatus;
use tower::ServiceExt;

mod common;
use common::{authed, body_json, create_test_app, points_of, seed_group, submit, vote};

const ADMIN: u64 = 1;
const SUBMITTER: u64 = 2;

#[tokio::test]
async fn test_majority_approval_credits_submitter() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    // Three members: two approvals needed
    let view = state.reviews.record(ADMIN, &sub, vote(true)).await.unwrap();
    assert_eq!(view.submission.status, SubmissionStatus::UnderReview);
    assert_eq!(points_of(&state, &f.group_id, SUBMITTER).await, 0);

    let view = state.reviews.record(3, &sub, vote(true)).await.unwrap();
    assert_eq!(view.submission.status, SubmissionStatus::Approved);
    assert!(view.submission.credited);
    assert_eq!(view.reviews.len(), 2);
    assert_eq!(points_of(&state, &f.group_id, SUBMITTER).await, 10);
}

#[tokio::test]
async fn test_two_member_group_settles_on_one_vote() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER], 4).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    let view = state.reviews.record(ADMIN, &sub, vote(true)).await.unwrap();

    assert_eq!(view.submission.status, SubmissionStatus::Approved);
    assert_eq!(points_of(&state, &f.group_id, SUBMITTER).await, 4);
}

#[tokio::test]
async fn test_majority_rejection_awards_nothing() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3, 4], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    state.reviews.record(ADMIN, &sub, vote(false)).await.unwrap();
    let view = state.reviews.record(3, &sub, vote(false)).await.unwrap();
    assert_eq!(view.submission.status, SubmissionStatus::Rejected);

    // A late approval does not overturn the majority
    let view = state.reviews.record(4, &sub, vote(true)).await.unwrap();
    assert_eq!(view.submission.status, SubmissionStatus::Rejected);
    assert_eq!(points_of(&state, &f.group_id, SUBMITTER).await, 0);
}

#[tokio::test]
async fn test_votes_after_approval_do_not_credit_again() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3, 4, 5], 7).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    // Five members: three approvals needed
    for reviewer in [ADMIN, 3, 4] {
        state.reviews.record(reviewer, &sub, vote(true)).await.unwrap();
    }
    assert_eq!(points_of(&state, &f.group_id, SUBMITTER).await, 7);

    let view = state.reviews.record(5, &sub, vote(true)).await.unwrap();
    assert_eq!(view.submission.status, SubmissionStatus::Approved);
    assert_eq!(view.reviews.len(), 4);
    assert_eq!(points_of(&state, &f.group_id, SUBMITTER).await, 7);
}

#[tokio::test]
async fn test_self_review_is_rejected() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    let err = state
        .reviews
        .record(SUBMITTER, &sub, vote(true))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::SelfReviewForbidden));
    assert!(state.reviews.list(ADMIN, &sub).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_outsider_cannot_review() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    let err = state.reviews.record(99, &sub, vote(true)).await.unwrap_err();

    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_second_vote_by_same_reviewer_is_a_conflict() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3, 4, 5], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    state.reviews.record(ADMIN, &sub, vote(true)).await.unwrap();
    let err = state
        .reviews
        .record(ADMIN, &sub, vote(false))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::Conflict(ConflictKind::AlreadyReviewed)
    ));
    let reviews = state.reviews.list(ADMIN, &sub).await.unwrap();
    assert_eq!(reviews.len(), 1);
    assert!(reviews[0].approved);
}

#[tokio::test]
async fn test_review_of_unknown_submission() {
    let (_, state) = create_test_app();
    seed_group(&state, ADMIN, &[SUBMITTER], 10).await;

    let err = state
        .reviews
        .record(ADMIN, "no-such-submission", vote(true))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_threshold_follows_current_group_size() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3, 4, 5], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    state.reviews.record(ADMIN, &sub, vote(true)).await.unwrap();

    // Shrinking the group does not settle anything by itself
    state.directory.remove_member(ADMIN, &f.group_id, 4).await.unwrap();
    state.directory.remove_member(ADMIN, &f.group_id, 5).await.unwrap();
    let latest = state
        .submissions
        .latest(ADMIN, &f.activity_id, SUBMITTER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.submission.status, SubmissionStatus::UnderReview);

    // Three members left: the next vote is measured against two
    let view = state.reviews.record(3, &sub, vote(true)).await.unwrap();
    assert_eq!(view.submission.status, SubmissionStatus::Approved);
    assert_eq!(points_of(&state, &f.group_id, SUBMITTER).await, 10);
}

#[tokio::test]
async fn test_submitter_who_left_is_not_credited() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    state
        .directory
        .remove_member(ADMIN, &f.group_id, SUBMITTER)
        .await
        .unwrap();

    let view = state.reviews.record(3, &sub, vote(true)).await.unwrap();

    assert_eq!(view.submission.status, SubmissionStatus::Approved);
    assert!(!view.submission.credited);
    assert!(state
        .db
        .get_membership(&f.group_id, SUBMITTER)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_pending_queue_excludes_own_and_reviewed() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3, 4, 5], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    assert!(state
        .submissions
        .pending_for_user(SUBMITTER)
        .await
        .unwrap()
        .is_empty());

    let pending = state.submissions.pending_for_user(3).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].submission.id, sub);
    assert_eq!(pending[0].activity_title, "Run 5k");
    assert_eq!(pending[0].tally.approvals, 0);

    state.reviews.record(3, &sub, vote(true)).await.unwrap();
    assert!(state.submissions.pending_for_user(3).await.unwrap().is_empty());

    let pending = state.submissions.pending_for_user(4).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].tally.approvals, 1);
}

#[tokio::test]
async fn test_settled_submission_leaves_pending_queue() {
    let (_, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER, 3], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    state.reviews.record(ADMIN, &sub, vote(false)).await.unwrap();
    state.reviews.record(3, &sub, vote(false)).await.unwrap();

    assert!(state.submissions.pending_for_user(ADMIN).await.unwrap().is_empty());
    assert!(state.submissions.pending_for_user(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_review_endpoint_returns_updated_submission() {
    let (app, state) = create_test_app();
    let f = seed_group(&state, ADMIN, &[SUBMITTER], 10).await;
    let sub = submit(&state, SUBMITTER, &f.activity_id).await;

    let response = app
        .clone()
        .oneshot(authed(
            &state,
            Method::POST,
            &format!("/api/submissions/{}/reviews", sub),
            ADMIN,
            Some(serde_json::json!({ "approved": true, "comment": "nice" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], sub.as_str());
    assert_eq!(body["status"], "APPROVED");
    assert_eq!(body["reviews"][0]["comment"], "nice");

    let response = app
        .oneshot(authed(
            &state,
            Method::POST,
            &format!("/api/submissions/{}/reviews", sub),
            SUBMITTER,
            Some(serde_json::json!({ "approved": true })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "self_review_forbidden");
}
