// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Quorum decision for peer-reviewed submissions.
//!
//! Every vote re-evaluates the submission against *all* reviews recorded so
//! far and the group's *current* size. Both storage backends run
//! [`cast_vote`] inside their atomic read-decide-write unit, so the decision
//! and any resulting ledger credit commit together.
//!
//! Membership changes alone never trigger a re-evaluation; a shrinking group
//! only lowers the threshold for the next vote.

use serde::Serialize;

use crate::models::{Membership, Review, Submission, SubmissionStatus};

/// Votes needed in one direction to settle a submission: `ceil(N / 2)`.
pub fn required_votes(member_count: usize) -> usize {
    member_count.div_ceil(2).max(1)
}

/// Cumulative vote counts for one submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub approvals: usize,
    pub rejections: usize,
}

impl Tally {
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let mut tally = Self::default();
        for review in reviews {
            tally.record(review.approved);
        }
        tally
    }

    pub fn record(&mut self, approved: bool) {
        if approved {
            self.approvals += 1;
        } else {
            self.rejections += 1;
        }
    }
}

/// Outcome of re-evaluating a submission after a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub previous: SubmissionStatus,
    pub status: SubmissionStatus,
    pub tally: Tally,
    pub member_count: usize,
    pub required: usize,
    /// The ledger must credit the submitter in this atomic step.
    pub award_points: bool,
}

impl Decision {
    pub fn changed(&self) -> bool {
        self.previous != self.status
    }
}

/// Decide the target status for `submission` given the full tally.
///
/// Approval wins when both sides reach the threshold. Points are awarded
/// only on a transition into `Approved` from another state, and never twice
/// for the same submission.
pub fn decide(submission: &Submission, tally: Tally, member_count: usize) -> Decision {
    let required = required_votes(member_count);

    let status = if tally.approvals >= required {
        SubmissionStatus::Approved
    } else if tally.rejections >= required {
        SubmissionStatus::Rejected
    } else {
        SubmissionStatus::UnderReview
    };

    let award_points = status == SubmissionStatus::Approved
        && submission.status != SubmissionStatus::Approved
        && !submission.credited;

    Decision {
        previous: submission.status,
        status,
        tally,
        member_count,
        required,
        award_points,
    }
}

/// Why a vote was refused. Checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteRejection {
    SelfReview,
    NotAMember,
    AlreadyReviewed,
}

/// Validate `review` against the current state and decide the new status.
///
/// `existing` must hold every review already stored for the submission and
/// `memberships` every current member of its group.
pub fn cast_vote(
    submission: &Submission,
    existing: &[Review],
    memberships: &[Membership],
    review: &Review,
) -> Result<Decision, VoteRejection> {
    if review.reviewer_id == submission.user_id {
        return Err(VoteRejection::SelfReview);
    }
    if !memberships.iter().any(|m| m.user_id == review.reviewer_id) {
        return Err(VoteRejection::NotAMember);
    }
    if existing.iter().any(|r| r.reviewer_id == review.reviewer_id) {
        return Err(VoteRejection::AlreadyReviewed);
    }

    let mut tally = Tally::from_reviews(existing);
    tally.record(review.approved);

    Ok(decide(submission, tally, memberships.len()))
}
