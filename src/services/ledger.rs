// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Admin-driven ledger operations.
//!
//! Credits for approved submissions happen inside the vote itself
//! (see [`crate::services::ReviewService`]); this service covers the
//! overrides and the revert on activity deletion.

use std::sync::Arc;

use serde::Serialize;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{LedgerEntry, Membership};
use crate::services::directory::require_admin;
use crate::services::locks::KeyedLocks;

/// Result of deleting an activity.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityDeleted {
    pub activity_id: String,
    pub submissions_deleted: usize,
    pub reviews_deleted: usize,
    /// Balance changes applied to members who had approved submissions
    pub reverted: Vec<LedgerEntry>,
}

#[derive(Clone)]
pub struct LedgerService {
    db: Arc<dyn Store>,
    group_locks: KeyedLocks,
}

impl LedgerService {
    /// `group_locks` is shared with the directory so balance and
    /// membership changes on one group run one at a time.
    pub fn new(db: Arc<dyn Store>, group_locks: KeyedLocks) -> Self {
        Self { db, group_locks }
    }

    /// Set a member's balance to an absolute value.
    pub async fn set_points(
        &self,
        admin_id: u64,
        group_id: &str,
        user_id: u64,
        value: i64,
    ) -> Result<Membership> {
        require_admin(self.db.as_ref(), group_id, admin_id).await?;

        let _guard = self.group_locks.acquire(group_id).await;

        let (membership, entry) = self
            .db
            .set_points(group_id, user_id, value)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Member {} in group {}", user_id, group_id))
            })?;

        entry.log();
        Ok(membership)
    }

    /// Delete an activity, its submissions and reviews, and take back the
    /// points credited for it.
    pub async fn delete_activity(&self, admin_id: u64, activity_id: &str) -> Result<ActivityDeleted> {
        let activity = self
            .db
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;
        require_admin(self.db.as_ref(), &activity.group_id, admin_id).await?;

        let _guard = self.group_locks.acquire(&activity.group_id).await;

        // A concurrent delete may have won the race.
        let deletion = self
            .db
            .delete_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;

        for entry in &deletion.entries {
            entry.log();
        }

        tracing::info!(
            activity_id,
            group_id = %deletion.activity.group_id,
            submissions = deletion.submissions_deleted,
            reviews = deletion.reviews_deleted,
            reverted = deletion.entries.len(),
            "Activity deleted"
        );

        Ok(ActivityDeleted {
            activity_id: deletion.activity.id,
            submissions_deleted: deletion.submissions_deleted,
            reviews_deleted: deletion.reviews_deleted,
            reverted: deletion.entries,
        })
    }
}
