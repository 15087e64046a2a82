// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! In-process store for local runs and tests.
//!
//! All state sits behind one async mutex, so every trait method is a single
//! atomic unit.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::db::{
    plan_slot, plan_vote, ActivityDeletion, MembershipRemoval, ReviewOutcome, Store,
    SubmissionInsert,
};
use crate::error::Result;
use crate::models::{group, ledger, Activity, Group, LedgerEntry, Membership, Review, Submission};

#[derive(Default)]
struct MemoryState {
    groups: HashMap<String, Group>,
    /// Keyed by [`Membership::doc_id`]
    memberships: HashMap<String, Membership>,
    activities: HashMap<String, Activity>,
    submissions: HashMap<String, Submission>,
    /// Keyed by [`Review::doc_id`]
    reviews: HashMap<String, Review>,
}

impl MemoryState {
    fn group_members(&self, group_id: &str) -> Vec<Membership> {
        self.memberships
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect()
    }

    fn submission_reviews(&self, submission_id: &str) -> Vec<Review> {
        self.reviews
            .values()
            .filter(|r| r.submission_id == submission_id)
            .cloned()
            .collect()
    }

    fn delete_submission(&mut self, submission_id: &str) -> usize {
        self.submissions.remove(submission_id);
        let before = self.reviews.len();
        self.reviews.retain(|_, r| r.submission_id != submission_id);
        before - self.reviews.len()
    }
}

/// Memory-backed [`Store`].
#[derive(Clone, Default)]
pub struct MemoryDb {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn create_group(&self, group: &Group, founder: &Membership) -> Result<()> {
        let mut state = self.state.lock().await;
        state.groups.insert(group.id.clone(), group.clone());
        state.memberships.insert(
            Membership::doc_id(&founder.group_id, founder.user_id),
            founder.clone(),
        );
        Ok(())
    }

    async fn get_group(&self, group_id: &str) -> Result<Option<Group>> {
        Ok(self.state.lock().await.groups.get(group_id).cloned())
    }

    async fn get_membership(&self, group_id: &str, user_id: u64) -> Result<Option<Membership>> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .get(&Membership::doc_id(group_id, user_id))
            .cloned())
    }

    async fn list_memberships(&self, group_id: &str) -> Result<Vec<Membership>> {
        Ok(self.state.lock().await.group_members(group_id))
    }

    async fn list_memberships_for_user(&self, user_id: u64) -> Result<Vec<Membership>> {
        let state = self.state.lock().await;
        Ok(state
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_membership(&self, membership: &Membership) -> Result<bool> {
        let mut state = self.state.lock().await;
        let key = Membership::doc_id(&membership.group_id, membership.user_id);
        if state.memberships.contains_key(&key) {
            return Ok(false);
        }
        state.memberships.insert(key, membership.clone());
        Ok(true)
    }

    async fn remove_membership(
        &self,
        group_id: &str,
        user_id: u64,
        requested_by: u64,
    ) -> Result<MembershipRemoval> {
        let mut state = self.state.lock().await;
        let members = state.group_members(group_id);

        if !members.iter().any(|m| m.user_id == requested_by && m.is_admin()) {
            return Ok(MembershipRemoval::RequesterNotAdmin);
        }
        if !members.iter().any(|m| m.user_id == user_id) {
            return Ok(MembershipRemoval::NotFound);
        }
        if group::is_last_admin(&members, user_id) {
            return Ok(MembershipRemoval::LastAdmin);
        }

        match state
            .memberships
            .remove(&Membership::doc_id(group_id, user_id))
        {
            Some(removed) => Ok(MembershipRemoval::Removed(removed)),
            None => Ok(MembershipRemoval::NotFound),
        }
    }

    async fn set_points(
        &self,
        group_id: &str,
        user_id: u64,
        value: i64,
    ) -> Result<Option<(Membership, LedgerEntry)>> {
        let mut state = self.state.lock().await;
        Ok(state
            .memberships
            .get_mut(&Membership::doc_id(group_id, user_id))
            .map(|member| {
                let entry = ledger::admin_set(member, value);
                (member.clone(), entry)
            }))
    }

    async fn get_activity(&self, activity_id: &str) -> Result<Option<Activity>> {
        Ok(self.state.lock().await.activities.get(activity_id).cloned())
    }

    async fn list_activities(&self, group_id: &str) -> Result<Vec<Activity>> {
        let state = self.state.lock().await;
        Ok(state
            .activities
            .values()
            .filter(|a| a.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn upsert_activity(&self, activity: &Activity) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .activities
            .insert(activity.id.clone(), activity.clone());
        Ok(())
    }

    async fn delete_activity(&self, activity_id: &str) -> Result<Option<ActivityDeletion>> {
        let mut state = self.state.lock().await;

        let Some(activity) = state.activities.remove(activity_id) else {
            return Ok(None);
        };

        let submissions: Vec<Submission> = state
            .submissions
            .values()
            .filter(|s| s.activity_id == activity_id)
            .cloned()
            .collect();

        let mut members = state.group_members(&activity.group_id);
        let entries = ledger::revert_for_activity_deletion(&activity, &submissions, &mut members);
        for member in members {
            state
                .memberships
                .insert(Membership::doc_id(&member.group_id, member.user_id), member);
        }

        let reviews_deleted: usize = submissions
            .iter()
            .map(|s| state.delete_submission(&s.id))
            .sum();

        Ok(Some(ActivityDeletion {
            activity,
            entries,
            submissions_deleted: submissions.len(),
            reviews_deleted,
        }))
    }

    async fn insert_submission(&self, submission: &Submission) -> Result<SubmissionInsert> {
        let mut state = self.state.lock().await;
        if !state.activities.contains_key(&submission.activity_id) {
            return Ok(SubmissionInsert::ActivityMissing);
        }
        let slot = submission.slot_key();

        let existing: Vec<Submission> = state
            .submissions
            .values()
            .filter(|s| s.slot_key() == slot)
            .cloned()
            .collect();

        let outcome = plan_slot(existing);
        if let SubmissionInsert::Created { replaced } = &outcome {
            for old in replaced {
                state.delete_submission(&old.id);
            }
            state
                .submissions
                .insert(submission.id.clone(), submission.clone());
        }

        Ok(outcome)
    }

    async fn get_submission(&self, submission_id: &str) -> Result<Option<Submission>> {
        Ok(self.state.lock().await.submissions.get(submission_id).cloned())
    }

    async fn list_submissions_for_activity(&self, activity_id: &str) -> Result<Vec<Submission>> {
        let state = self.state.lock().await;
        Ok(state
            .submissions
            .values()
            .filter(|s| s.activity_id == activity_id)
            .cloned()
            .collect())
    }

    async fn list_submissions_for_user(
        &self,
        activity_id: &str,
        user_id: u64,
    ) -> Result<Vec<Submission>> {
        let state = self.state.lock().await;
        Ok(state
            .submissions
            .values()
            .filter(|s| s.activity_id == activity_id && s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_submissions_for_group(&self, group_id: &str) -> Result<Vec<Submission>> {
        let state = self.state.lock().await;
        Ok(state
            .submissions
            .values()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn list_user_submissions_between(
        &self,
        group_id: &str,
        user_id: u64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Submission>> {
        let state = self.state.lock().await;
        Ok(state
            .submissions
            .values()
            .filter(|s| {
                s.group_id == group_id && s.user_id == user_id && s.day >= from && s.day <= to
            })
            .cloned()
            .collect())
    }

    async fn list_reviews(&self, submission_id: &str) -> Result<Vec<Review>> {
        Ok(self.state.lock().await.submission_reviews(submission_id))
    }

    async fn list_reviews_by_reviewer(&self, reviewer_id: u64) -> Result<Vec<Review>> {
        let state = self.state.lock().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.reviewer_id == reviewer_id)
            .cloned()
            .collect())
    }

    async fn record_review(&self, review: &Review) -> Result<ReviewOutcome> {
        let mut state = self.state.lock().await;

        let Some(submission) = state.submissions.get(&review.submission_id).cloned() else {
            return Ok(ReviewOutcome::SubmissionNotFound);
        };
        let Some(activity) = state.activities.get(&submission.activity_id).cloned() else {
            return Ok(ReviewOutcome::SubmissionNotFound);
        };

        let existing = state.submission_reviews(&submission.id);
        let members = state.group_members(&submission.group_id);

        let write = match plan_vote(submission, existing, &members, &activity, review) {
            Ok(write) => write,
            Err(rejection) => return Ok(ReviewOutcome::Rejected(rejection)),
        };

        state.reviews.insert(review.id.clone(), review.clone());
        state.submissions.insert(
            write.recorded.submission.id.clone(),
            write.recorded.submission.clone(),
        );
        if let Some(member) = write.credited_member {
            state
                .memberships
                .insert(Membership::doc_id(&member.group_id, member.user_id), member);
        }

        Ok(ReviewOutcome::Recorded(Box::new(write.recorded)))
    }
}
