// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Submission store operations.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::db::{Store, SubmissionInsert};
use crate::error::{AppError, ConflictKind, Result};
use crate::models::submission::latest;
use crate::models::{Activity, NewSubmission, Submission, SubmissionView, Tally};
use crate::services::directory::require_member;
use crate::services::locks::KeyedLocks;
use crate::time_utils::Clock;

/// A submission waiting for the caller's vote.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReview {
    #[serde(flatten)]
    pub submission: Submission,
    pub activity_title: String,
    pub activity_points: u32,
    /// Votes cast so far
    pub tally: Tally,
}

#[derive(Clone)]
pub struct SubmissionService {
    db: Arc<dyn Store>,
    /// Per (activity, user, day) slot locks
    slot_locks: KeyedLocks,
    clock: Clock,
}

impl SubmissionService {
    pub fn new(db: Arc<dyn Store>, clock: Clock) -> Self {
        Self {
            db,
            slot_locks: KeyedLocks::new(),
            clock,
        }
    }

    async fn get_activity(&self, activity_id: &str) -> Result<Activity> {
        self.db
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))
    }

    /// Submit today's completion of an activity.
    ///
    /// A rejected (or legacy pending) submission for today is replaced; a
    /// live one is a conflict.
    pub async fn create(
        &self,
        user_id: u64,
        activity_id: &str,
        input: NewSubmission,
    ) -> Result<SubmissionView> {
        let activity = self.get_activity(activity_id).await?;
        require_member(self.db.as_ref(), &activity.group_id, user_id).await?;
        input.check()?;

        let day = (self.clock)();
        let submission = Submission::new(&activity, user_id, day, input);

        let _guard = self.slot_locks.acquire(&submission.slot_key()).await;

        match self.db.insert_submission(&submission).await? {
            SubmissionInsert::Duplicate(existing) => {
                tracing::debug!(
                    activity_id,
                    user_id,
                    existing_id = %existing.id,
                    status = ?existing.status,
                    "Live submission already exists"
                );
                Err(AppError::Conflict(ConflictKind::DuplicateSubmission))
            }
            SubmissionInsert::ActivityMissing => {
                Err(AppError::NotFound(format!("Activity {}", activity_id)))
            }
            SubmissionInsert::Created { replaced } => {
                tracing::info!(
                    submission_id = %submission.id,
                    activity_id,
                    user_id,
                    day = %submission.day,
                    replaced = replaced.len(),
                    "Submission created"
                );
                Ok(SubmissionView::new(submission, Vec::new()))
            }
        }
    }

    /// Most recent submission of `user_id` for an activity, on any day.
    pub async fn latest(
        &self,
        viewer_id: u64,
        activity_id: &str,
        user_id: u64,
    ) -> Result<Option<SubmissionView>> {
        let activity = self.get_activity(activity_id).await?;
        require_member(self.db.as_ref(), &activity.group_id, viewer_id).await?;

        let submissions = self
            .db
            .list_submissions_for_user(activity_id, user_id)
            .await?;

        match latest(submissions) {
            Some(submission) => {
                let reviews = self.db.list_reviews(&submission.id).await?;
                Ok(Some(SubmissionView::new(submission, reviews)))
            }
            None => Ok(None),
        }
    }

    /// All submissions of an activity with their reviews, newest first.
    pub async fn list_for_activity(
        &self,
        viewer_id: u64,
        activity_id: &str,
    ) -> Result<Vec<SubmissionView>> {
        let activity = self.get_activity(activity_id).await?;
        require_member(self.db.as_ref(), &activity.group_id, viewer_id).await?;

        let mut submissions = self.db.list_submissions_for_activity(activity_id).await?;
        submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let mut views = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let reviews = self.db.list_reviews(&submission.id).await?;
            views.push(SubmissionView::new(submission, reviews));
        }
        Ok(views)
    }

    /// Submissions across the user's groups still awaiting their vote,
    /// oldest first.
    pub async fn pending_for_user(&self, user_id: u64) -> Result<Vec<PendingReview>> {
        let reviewed: HashSet<String> = self
            .db
            .list_reviews_by_reviewer(user_id)
            .await?
            .into_iter()
            .map(|r| r.submission_id)
            .collect();

        let mut pending = Vec::new();
        for membership in self.db.list_memberships_for_user(user_id).await? {
            let activities: HashMap<String, Activity> = self
                .db
                .list_activities(&membership.group_id)
                .await?
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect();

            for submission in self
                .db
                .list_submissions_for_group(&membership.group_id)
                .await?
            {
                if !submission.status.is_awaiting_review()
                    || submission.user_id == user_id
                    || reviewed.contains(&submission.id)
                {
                    continue;
                }
                // Orphans of a deleted activity are skipped.
                let Some(activity) = activities.get(&submission.activity_id) else {
                    continue;
                };

                let reviews = self.db.list_reviews(&submission.id).await?;
                pending.push(PendingReview {
                    activity_title: activity.title.clone(),
                    activity_points: activity.points,
                    tally: Tally::from_reviews(&reviews),
                    submission,
                });
            }
        }

        pending.sort_by(|a, b| a.submission.created_at.cmp(&b.submission.created_at));
        Ok(pending)
    }
}
