// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Peer review of a submission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One member's vote on one submission. Never updated once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    /// `{submission_id}_{reviewer_id}`; makes a second vote a key collision
    pub id: String,
    pub submission_id: String,
    pub reviewer_id: u64,
    pub approved: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(submission_id: &str, reviewer_id: u64, approved: bool, comment: Option<String>) -> Self {
        Self {
            id: Self::doc_id(submission_id, reviewer_id),
            submission_id: submission_id.to_string(),
            reviewer_id,
            approved,
            comment: comment.filter(|c| !c.trim().is_empty()),
            created_at: Utc::now(),
        }
    }

    pub fn doc_id(submission_id: &str, reviewer_id: u64) -> String {
        format!("{}_{}", submission_id, reviewer_id)
    }
}

/// Request body for a review.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReview {
    pub approved: bool,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}
