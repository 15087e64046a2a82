// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Submission model: one member's claim to have completed an activity on a day.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::models::{Activity, Review};

/// Largest accepted proof attachment (decoded bytes).
pub const MAX_PROOF_BYTES: u64 = 10 * 1024 * 1024;

/// Request body limit for creating a submission. Room for several proofs at
/// the full attachment size once base64 encoded.
pub const MAX_SUBMISSION_BODY_BYTES: usize = 50 * 1024 * 1024;

/// Review state of a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    UnderReview,
    Approved,
    Rejected,
    /// Legacy state written by older clients; handled like `UnderReview`
    /// for reviews and calendars but replaceable on resubmission.
    Pending,
}

impl SubmissionStatus {
    /// A live submission blocks another one for the same member/activity/day.
    pub fn blocks_resubmission(self) -> bool {
        matches!(self, SubmissionStatus::UnderReview | SubmissionStatus::Approved)
    }

    pub fn is_awaiting_review(self) -> bool {
        matches!(self, SubmissionStatus::UnderReview | SubmissionStatus::Pending)
    }
}

/// Opaque proof attachment as uploaded by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Proof {
    pub name: String,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Size in bytes of the decoded payload
    pub size: u64,
    /// Data URL (`data:<type>;base64,<payload>`) or bare base64 payload
    pub data: String,
}

impl Proof {
    /// Check the attachment is well-formed without interpreting its content.
    pub fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.name.len() > 255 {
            return Err(AppError::Validation(
                "Proof name must be 1-255 characters".to_string(),
            ));
        }
        if self.size > MAX_PROOF_BYTES {
            return Err(AppError::Validation(format!(
                "Proof {} exceeds {} bytes",
                self.name, MAX_PROOF_BYTES
            )));
        }

        let payload = match self.data.split_once(',') {
            Some((header, payload)) if header.starts_with("data:") && header.ends_with(";base64") => {
                payload
            }
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "Proof {} is not a base64 data URL",
                    self.name
                )))
            }
            None => self.data.as_str(),
        };

        let decoded = STANDARD.decode(payload).map_err(|_| {
            AppError::Validation(format!("Proof {} is not valid base64", self.name))
        })?;

        if decoded.len() as u64 != self.size {
            return Err(AppError::Validation(format!(
                "Proof {} size mismatch: declared {}, got {}",
                self.name,
                self.size,
                decoded.len()
            )));
        }

        Ok(())
    }
}

/// Request body for creating a submission.
///
/// Accepts the original client's `proofImages`/`taggedUsers` field names.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewSubmission {
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    #[serde(default, alias = "proofImages")]
    #[validate(length(max = 10))]
    pub proofs: Vec<Proof>,
    #[serde(default, alias = "taggedUsers")]
    #[validate(length(max = 50))]
    pub tagged_users: Vec<u64>,
}

impl NewSubmission {
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        self.proofs.iter().try_for_each(Proof::check)
    }
}

/// One attempt by one member to claim one activity on one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: String,
    pub activity_id: String,
    /// Owning group of the activity (denormalised for queries)
    pub group_id: String,
    /// Submitter
    pub user_id: u64,
    /// Calendar day the submission counts for
    pub day: NaiveDate,
    pub description: String,
    pub proofs: Vec<Proof>,
    pub tagged_users: Vec<u64>,
    pub status: SubmissionStatus,
    /// Set in the same atomic step as the ledger credit; never cleared
    pub credited: bool,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(activity: &Activity, user_id: u64, day: NaiveDate, input: NewSubmission) -> Self {
        let mut tagged_users = input.tagged_users;
        tagged_users.sort_unstable();
        tagged_users.dedup();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            activity_id: activity.id.clone(),
            group_id: activity.group_id.clone(),
            user_id,
            day,
            description: input.description,
            proofs: input.proofs,
            tagged_users,
            status: SubmissionStatus::UnderReview,
            credited: false,
            created_at: Utc::now(),
        }
    }

    pub fn slot_key(&self) -> String {
        slot_key(&self.activity_id, self.user_id, self.day)
    }
}

/// Key of the (activity, submitter, day) slot that holds at most one live submission.
pub fn slot_key(activity_id: &str, user_id: u64, day: NaiveDate) -> String {
    format!("{}_{}_{}", activity_id, user_id, day.format("%Y-%m-%d"))
}

/// Most recent submission regardless of day.
pub fn latest(submissions: Vec<Submission>) -> Option<Submission> {
    submissions
        .into_iter()
        .max_by(|a, b| a.day.cmp(&b.day).then_with(|| a.created_at.cmp(&b.created_at)))
}

/// Submission together with its reviews, as returned by the API.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub reviews: Vec<Review>,
}

impl SubmissionView {
    pub fn new(submission: Submission, mut reviews: Vec<Review>) -> Self {
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            submission,
            reviews,
        }
    }
}
