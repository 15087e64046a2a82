// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Vote recording.

use std::sync::Arc;

use validator::Validate;

use crate::db::{ReviewOutcome, Store};
use crate::error::{AppError, ConflictKind, Result};
use crate::models::{NewReview, Review, SubmissionView, VoteRejection};
use crate::services::directory::require_member;
use crate::services::locks::KeyedLocks;

#[derive(Clone)]
pub struct ReviewService {
    db: Arc<dyn Store>,
    /// Per-submission locks so local votes queue instead of racing the store
    submission_locks: KeyedLocks,
}

impl ReviewService {
    pub fn new(db: Arc<dyn Store>) -> Self {
        Self {
            db,
            submission_locks: KeyedLocks::new(),
        }
    }

    /// Record a vote and return the submission as it stands afterwards.
    pub async fn record(
        &self,
        reviewer_id: u64,
        submission_id: &str,
        input: NewReview,
    ) -> Result<SubmissionView> {
        input.validate()?;

        let _guard = self.submission_locks.acquire(submission_id).await;

        let review = Review::new(submission_id, reviewer_id, input.approved, input.comment);

        let recorded = match self.db.record_review(&review).await? {
            ReviewOutcome::Recorded(recorded) => recorded,
            ReviewOutcome::SubmissionNotFound => {
                return Err(AppError::NotFound(format!("Submission {}", submission_id)))
            }
            ReviewOutcome::Rejected(VoteRejection::SelfReview) => {
                return Err(AppError::SelfReviewForbidden)
            }
            ReviewOutcome::Rejected(VoteRejection::NotAMember) => {
                return Err(AppError::not_a_member())
            }
            ReviewOutcome::Rejected(VoteRejection::AlreadyReviewed) => {
                return Err(AppError::Conflict(ConflictKind::AlreadyReviewed))
            }
        };

        let decision = &recorded.decision;
        tracing::info!(
            submission_id,
            reviewer_id,
            approved = review.approved,
            approvals = decision.tally.approvals,
            rejections = decision.tally.rejections,
            required = decision.required,
            members = decision.member_count,
            status = ?decision.status,
            "Review recorded"
        );
        if decision.changed() {
            tracing::info!(
                submission_id,
                from = ?decision.previous,
                to = ?decision.status,
                "Submission status changed"
            );
        }
        if let Some(entry) = &recorded.credit {
            entry.log();
        }

        let recorded = *recorded;
        Ok(SubmissionView::new(recorded.submission, recorded.reviews))
    }

    /// Reviews of a submission, newest first.
    pub async fn list(&self, viewer_id: u64, submission_id: &str) -> Result<Vec<Review>> {
        let submission = self
            .db
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {}", submission_id)))?;
        require_member(self.db.as_ref(), &submission.group_id, viewer_id).await?;

        let mut reviews = self.db.list_reviews(submission_id).await?;
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }
}
