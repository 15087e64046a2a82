// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API input validation tests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

fn post_json(uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_group_name_too_long() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    let long_name = "a".repeat(101);
    let body = serde_json::json!({ "name": long_name }).to_string();

    let response = app
        .oneshot(post_json("/api/groups", &token, &body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        common::body_json(response).await["error"],
        "validation_error"
    );
}

#[tokio::test]
async fn test_blank_group_name() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json("/api/groups", &token, r#"{"name":"   "}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_activity_title() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[], 10).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            &format!("/api/groups/{}/activities", f.group_id),
            &token,
            r#"{"title":"","points":5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_negative_activity_points() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[], 10).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            &format!("/api/groups/{}/activities", f.group_id),
            &token,
            r#"{"title":"Plank","points":-5}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        common::body_json(response).await["error"],
        "validation_error"
    );
    assert!(state
        .directory
        .list_activities(1, &f.group_id)
        .await
        .unwrap()
        .iter()
        .all(|a| a.title != "Plank"));
}

#[tokio::test]
async fn test_mistyped_vote_is_validation_error() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[2], 10).await;
    let sub = common::submit(&state, 2, &f.activity_id).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json(
            &format!("/api/submissions/{}/reviews", sub),
            &token,
            r#"{"approved":"yes"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = common::body_json(response).await;
    assert_eq!(body["error"], "validation_error");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn test_malformed_json_body() {
    let (app, state) = common::create_test_app();
    let token = common::create_test_jwt(12345, &state.config.jwt_signing_key);

    let response = app
        .oneshot(post_json("/api/groups", &token, r#"{"name": "#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        common::body_json(response).await["error"],
        "validation_error"
    );
}

#[tokio::test]
async fn test_non_numeric_member_id_in_path() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[2], 10).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(&format!("/api/groups/{}/members/abc", f.group_id))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        common::body_json(response).await["error"],
        "validation_error"
    );
    let detail = state.directory.group_detail(1, &f.group_id).await.unwrap();
    assert_eq!(detail.members.len(), 2);
}

#[tokio::test]
async fn test_non_numeric_month_query() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[], 10).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!(
                    "/api/calendar/groups/{}/daily-status?year=2026&month=march",
                    f.group_id
                ))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        common::body_json(response).await["error"],
        "validation_error"
    );
}

#[tokio::test]
async fn test_review_comment_too_long() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[2], 10).await;
    let sub = common::submit(&state, 2, &f.activity_id).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let body = serde_json::json!({ "approved": true, "comment": "x".repeat(1001) }).to_string();
    let response = app
        .oneshot(post_json(
            &format!("/api/submissions/{}/reviews", sub),
            &token,
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(state.reviews.list(1, &sub).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_proof_declaration() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[2], 10).await;
    let token = common::create_test_jwt(2, &state.config.jwt_signing_key);

    let body = serde_json::json!({
        "description": "huge",
        "proofs": [{
            "name": "big.png",
            "type": "image/png",
            "size": 64 * 1024 * 1024,
            "data": "aGVsbG8="
        }]
    })
    .to_string();

    let response = app
        .oneshot(post_json(
            &format!("/api/activities/{}/submissions", f.activity_id),
            &token,
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_date_format() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[], 10).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!(
                    "/api/calendar/groups/{}/day/invalid-date",
                    f.group_id
                ))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_month_out_of_range() {
    let (app, state) = common::create_test_app();
    let f = common::seed_group(&state, 1, &[], 10).await;
    let token = common::create_test_jwt(1, &state.config.jwt_signing_key);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(&format!(
                    "/api/calendar/groups/{}/daily-status?year=2026&month=0",
                    f.group_id
                ))
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
