// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Services talk to a [`Store`]. Operations that must read, decide and write
//! as one unit (voting, submission slots, membership removal, activity
//! deletion) are store methods, so each backend can make them atomic its own
//! way: a Firestore transaction or the memory store's lock.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    ledger, quorum, Activity, Decision, Group, LedgerEntry, Membership, Review, Submission,
    VoteRejection,
};

/// Collection names as constants.
pub mod collections {
    pub const GROUPS: &str = "groups";
    /// Keyed by `{group_id}_{user_id}`
    pub const MEMBERSHIPS: &str = "memberships";
    pub const ACTIVITIES: &str = "activities";
    pub const SUBMISSIONS: &str = "submissions";
    /// One document per (activity, user, day); the contention point for creation
    pub const SUBMISSION_SLOTS: &str = "submission_slots";
    /// Keyed by `{submission_id}_{reviewer_id}`
    pub const REVIEWS: &str = "reviews";
}

/// Result of removing a member.
#[derive(Debug, Clone, PartialEq)]
pub enum MembershipRemoval {
    Removed(Membership),
    NotFound,
    LastAdmin,
    RequesterNotAdmin,
}

/// Result of inserting a submission into its daily slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionInsert {
    /// Inserted; `replaced` holds the rejected or legacy submissions it
    /// displaced, whose reviews were deleted with them.
    Created { replaced: Vec<Submission> },
    /// A live submission already holds the slot.
    Duplicate(Submission),
    /// The activity was deleted before the slot was claimed.
    ActivityMissing,
}

/// Everything committed by one accepted vote.
#[derive(Debug, Clone)]
pub struct RecordedReview {
    pub submission: Submission,
    /// All reviews of the submission, including the new one
    pub reviews: Vec<Review>,
    pub decision: Decision,
    pub credit: Option<LedgerEntry>,
}

/// Result of a vote attempt.
#[derive(Debug, Clone)]
pub enum ReviewOutcome {
    Recorded(Box<RecordedReview>),
    SubmissionNotFound,
    Rejected(VoteRejection),
}

/// Summary of an activity deletion.
#[derive(Debug, Clone)]
pub struct ActivityDeletion {
    pub activity: Activity,
    pub entries: Vec<LedgerEntry>,
    pub submissions_deleted: usize,
    pub reviews_deleted: usize,
}

/// Persistence operations used by the services.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Groups & Memberships ────────────────────────────────────

    /// Create a group together with its founding admin.
    async fn create_group(&self, group: &Group, founder: &Membership) -> Result<()>;

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>>;

    async fn get_membership(&self, group_id: &str, user_id: u64) -> Result<Option<Membership>>;

    async fn list_memberships(&self, group_id: &str) -> Result<Vec<Membership>>;

    async fn list_memberships_for_user(&self, user_id: u64) -> Result<Vec<Membership>>;

    /// Returns `false` if the user is already a member.
    async fn add_membership(&self, membership: &Membership) -> Result<bool>;

    /// Remove `user_id`, checking the requester's role and the admin count
    /// against the same snapshot.
    async fn remove_membership(
        &self,
        group_id: &str,
        user_id: u64,
        requested_by: u64,
    ) -> Result<MembershipRemoval>;

    /// Admin override of a balance. `None` if the user is not a member.
    async fn set_points(
        &self,
        group_id: &str,
        user_id: u64,
        value: i64,
    ) -> Result<Option<(Membership, LedgerEntry)>>;

    // ─── Activities ──────────────────────────────────────────────

    async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>>;

    async fn list_activities(&self, group_id: &str) -> Result<Vec<Activity>>;

    async fn upsert_activity(&self, activity: &Activity) -> Result<()>;

    /// Revert credits for approved submissions, delete the activity, then
    /// remove its submissions, slots and reviews.
    async fn delete_activity(&self, activity_id: &str) -> Result<Option<ActivityDeletion>>;

    // ─── Submissions ─────────────────────────────────────────────

    async fn insert_submission(&self, submission: &Submission) -> Result<SubmissionInsert>;

    async fn get_submission(&self, submission_id: &str) -> Result<Option<Submission>>;

    async fn list_submissions_for_activity(&self, activity_id: &str) -> Result<Vec<Submission>>;

    async fn list_submissions_for_user(
        &self,
        activity_id: &str,
        user_id: u64,
    ) -> Result<Vec<Submission>>;

    async fn list_submissions_for_group(&self, group_id: &str) -> Result<Vec<Submission>>;

    /// One user's submissions in a group with `from <= day <= to`.
    async fn list_user_submissions_between(
        &self,
        group_id: &str,
        user_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Submission>>;

    // ─── Reviews ─────────────────────────────────────────────────

    async fn list_reviews(&self, submission_id: &str) -> Result<Vec<Review>>;

    async fn list_reviews_by_reviewer(&self, reviewer_id: u64) -> Result<Vec<Review>>;

    /// Validate and persist a vote, re-evaluate the submission and credit the
    /// ledger, all in one atomic unit.
    async fn record_review(&self, review: &Review) -> Result<ReviewOutcome>;
}

/// Writes required by an accepted vote.
pub(crate) struct VoteWrite {
    pub recorded: RecordedReview,
    /// Submitter's membership with the credit applied
    pub credited_member: Option<Membership>,
}

/// Decide a vote against a consistent snapshot. Shared by both backends.
///
/// A submitter who has left the group is not credited and the submission
/// keeps its `credited` marker unset.
pub(crate) fn plan_vote(
    mut submission: Submission,
    existing: Vec<Review>,
    memberships: &[Membership],
    activity: &Activity,
    review: &Review,
) -> std::result::Result<VoteWrite, VoteRejection> {
    let decision = quorum::cast_vote(&submission, &existing, memberships, review)?;
    submission.status = decision.status;

    let mut credit = None;
    let mut credited_member = None;
    if decision.award_points {
        if let Some(member) = memberships.iter().find(|m| m.user_id == submission.user_id) {
            let mut member = member.clone();
            credit = Some(ledger::credit(&mut member, activity, &mut submission));
            credited_member = Some(member);
        } else {
            tracing::warn!(
                submission_id = %submission.id,
                user_id = submission.user_id,
                "Submitter left the group, approval not credited"
            );
        }
    }

    let mut reviews = existing;
    reviews.push(review.clone());

    Ok(VoteWrite {
        recorded: RecordedReview {
            submission,
            reviews,
            decision,
            credit,
        },
        credited_member,
    })
}

/// Decide what happens to a daily slot given the submissions already in it.
pub(crate) fn plan_slot(existing: Vec<Submission>) -> SubmissionInsert {
    match existing.iter().find(|s| s.status.blocks_resubmission()) {
        Some(live) => SubmissionInsert::Duplicate(live.clone()),
        None => SubmissionInsert::Created { replaced: existing },
    }
}
