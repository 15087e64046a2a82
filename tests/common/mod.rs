// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::NaiveDate;
use lyfez_backend::config::Config;
use lyfez_backend::db::{FirestoreDb, MemoryDb, Store};
use lyfez_backend::middleware::auth::create_jwt;
use lyfez_backend::models::{NewActivity, NewReview, NewSubmission};
use lyfez_backend::routes::create_router;
use lyfez_backend::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// The day every test app believes is today.
#[allow(dead_code)]
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

/// Create a test app backed by in-memory storage and a fixed clock.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::with_clock(
        Config::test_default(),
        Arc::new(MemoryDb::new()),
        today,
    ));

    (create_router(state.clone()), state)
}

/// Create a session token for a user.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: u64, signing_key: &[u8]) -> String {
    create_jwt(user_id, signing_key).expect("Failed to create JWT")
}

/// Build an authenticated JSON request.
#[allow(dead_code)]
pub fn authed(
    state: &AppState,
    method: Method,
    uri: &str,
    user_id: u64,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let token = create_test_jwt(user_id, &state.config.jwt_signing_key);
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A group administered by `admin` with the other users as plain members
/// and one activity worth `points`.
#[allow(dead_code)]
pub struct Fixture {
    pub group_id: String,
    pub activity_id: String,
}

#[allow(dead_code)]
pub async fn seed_group(state: &AppState, admin: u64, members: &[u64], points: u32) -> Fixture {
    let group = state
        .directory
        .create_group(admin, "Morning Crew")
        .await
        .unwrap();
    for &member in members {
        state
            .directory
            .add_member(admin, &group.group.id, member)
            .await
            .unwrap();
    }

    let activity = state
        .directory
        .create_activity(
            admin,
            &group.group.id,
            NewActivity {
                title: "Run 5k".to_string(),
                description: None,
                points,
            },
        )
        .await
        .unwrap();

    Fixture {
        group_id: group.group.id,
        activity_id: activity.id,
    }
}

/// Add another activity to an existing group.
#[allow(dead_code)]
pub async fn add_activity(state: &AppState, admin: u64, group_id: &str, title: &str, points: u32) -> String {
    state
        .directory
        .create_activity(
            admin,
            group_id,
            NewActivity {
                title: title.to_string(),
                description: None,
                points,
            },
        )
        .await
        .unwrap()
        .id
}

/// Submit today's completion of an activity and return the submission ID.
#[allow(dead_code)]
pub async fn submit(state: &AppState, user_id: u64, activity_id: &str) -> String {
    state
        .submissions
        .create(
            user_id,
            activity_id,
            NewSubmission {
                description: "done".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .submission
        .id
}

#[allow(dead_code)]
pub fn vote(approved: bool) -> NewReview {
    NewReview {
        approved,
        comment: None,
    }
}

/// Current balance of a member.
#[allow(dead_code)]
pub async fn points_of(state: &AppState, group_id: &str, user_id: u64) -> i64 {
    state
        .db
        .get_membership(group_id, user_id)
        .await
        .unwrap()
        .expect("member should exist")
        .points
}
