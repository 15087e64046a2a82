// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Groups, members and activity definitions.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::db::{MembershipRemoval, Store};
use crate::error::{AppError, ConflictKind, Result};
use crate::models::activity::sort_for_display;
use crate::models::{Activity, ActivityUpdate, Group, Membership, NewActivity, Role};
use crate::services::locks::KeyedLocks;

/// Membership of `user_id`, or `Forbidden` if they are not in the group.
pub async fn require_member(db: &dyn Store, group_id: &str, user_id: u64) -> Result<Membership> {
    db.get_membership(group_id, user_id)
        .await?
        .ok_or_else(AppError::not_a_member)
}

/// Like [`require_member`], but the member must also be an admin.
pub async fn require_admin(db: &dyn Store, group_id: &str, user_id: u64) -> Result<Membership> {
    let membership = require_member(db, group_id, user_id).await?;
    if !membership.is_admin() {
        return Err(AppError::Forbidden(
            "Only group admins can do this".to_string(),
        ));
    }
    Ok(membership)
}

/// Group the caller belongs to, with their role and balance.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    #[serde(flatten)]
    pub group: Group,
    pub role: Role,
    pub points: i64,
    pub member_count: usize,
}

/// Full view of a group for its members.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    #[serde(flatten)]
    pub group: Group,
    pub members: Vec<Membership>,
    pub activities: Vec<Activity>,
}

#[derive(Clone)]
pub struct DirectoryService {
    db: Arc<dyn Store>,
    /// Per-group locks, shared with the ledger
    group_locks: KeyedLocks,
}

impl DirectoryService {
    pub fn new(db: Arc<dyn Store>, group_locks: KeyedLocks) -> Self {
        Self { db, group_locks }
    }

    // ─── Groups ──────────────────────────────────────────────────

    pub async fn create_group(&self, user_id: u64, name: &str) -> Result<GroupSummary> {
        let name = name.trim();
        if name.is_empty() || name.len() > 100 {
            return Err(AppError::Validation(
                "Group name must be 1-100 characters".to_string(),
            ));
        }

        let group = Group {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let founder = Membership::new(&group.id, user_id, Role::Admin);

        self.db.create_group(&group, &founder).await?;

        Ok(GroupSummary {
            group,
            role: founder.role,
            points: founder.points,
            member_count: 1,
        })
    }

    /// Groups the user belongs to, by name.
    pub async fn list_groups(&self, user_id: u64) -> Result<Vec<GroupSummary>> {
        let memberships = self.db.list_memberships_for_user(user_id).await?;

        let mut groups = Vec::with_capacity(memberships.len());
        for membership in memberships {
            // Membership rows can briefly outlive a deleted group.
            let Some(group) = self.db.get_group(&membership.group_id).await? else {
                continue;
            };
            let member_count = self.db.list_memberships(&group.id).await?.len();
            groups.push(GroupSummary {
                group,
                role: membership.role,
                points: membership.points,
                member_count,
            });
        }

        groups.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        Ok(groups)
    }

    pub async fn group_detail(&self, user_id: u64, group_id: &str) -> Result<GroupDetail> {
        let group = self.get_group(group_id).await?;
        require_member(self.db.as_ref(), group_id, user_id).await?;

        let mut members = self.db.list_memberships(group_id).await?;
        members.sort_by(|a, b| b.points.cmp(&a.points).then(a.user_id.cmp(&b.user_id)));

        let mut activities = self.db.list_activities(group_id).await?;
        sort_for_display(&mut activities);

        Ok(GroupDetail {
            group,
            members,
            activities,
        })
    }

    async fn get_group(&self, group_id: &str) -> Result<Group> {
        self.db
            .get_group(group_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {}", group_id)))
    }

    // ─── Members ─────────────────────────────────────────────────

    pub async fn add_member(
        &self,
        admin_id: u64,
        group_id: &str,
        user_id: u64,
    ) -> Result<Membership> {
        self.get_group(group_id).await?;
        require_admin(self.db.as_ref(), group_id, admin_id).await?;

        let membership = Membership::new(group_id, user_id, Role::Member);
        if !self.db.add_membership(&membership).await? {
            return Err(AppError::Conflict(ConflictKind::AlreadyMember));
        }

        tracing::info!(group_id, user_id, added_by = admin_id, "Member added");
        Ok(membership)
    }

    pub async fn remove_member(&self, admin_id: u64, group_id: &str, user_id: u64) -> Result<()> {
        self.get_group(group_id).await?;
        if admin_id == user_id {
            return Err(AppError::Validation(
                "You cannot remove yourself from the group".to_string(),
            ));
        }

        let _guard = self.group_locks.acquire(group_id).await;

        match self
            .db
            .remove_membership(group_id, user_id, admin_id)
            .await?
        {
            MembershipRemoval::Removed(removed) => {
                tracing::info!(
                    group_id,
                    user_id,
                    removed_by = admin_id,
                    forfeited_points = removed.points,
                    "Member removed"
                );
                Ok(())
            }
            MembershipRemoval::RequesterNotAdmin => Err(AppError::Forbidden(
                "Only group admins can do this".to_string(),
            )),
            MembershipRemoval::NotFound => Err(AppError::NotFound(format!(
                "Member {} in group {}",
                user_id, group_id
            ))),
            MembershipRemoval::LastAdmin => Err(AppError::Conflict(ConflictKind::LastAdmin)),
        }
    }

    // ─── Activities ──────────────────────────────────────────────

    pub async fn create_activity(
        &self,
        admin_id: u64,
        group_id: &str,
        input: NewActivity,
    ) -> Result<Activity> {
        self.get_group(group_id).await?;
        require_admin(self.db.as_ref(), group_id, admin_id).await?;
        input.validate()?;

        let activity = Activity::new(group_id, input);
        self.db.upsert_activity(&activity).await?;

        tracing::info!(
            group_id,
            activity_id = %activity.id,
            points = activity.points,
            "Activity created"
        );
        Ok(activity)
    }

    /// Activities of a group, most points first then newest first.
    pub async fn list_activities(&self, user_id: u64, group_id: &str) -> Result<Vec<Activity>> {
        self.get_group(group_id).await?;
        require_member(self.db.as_ref(), group_id, user_id).await?;

        let mut activities = self.db.list_activities(group_id).await?;
        sort_for_display(&mut activities);
        Ok(activities)
    }

    /// Apply a partial update. Already-credited points are not adjusted.
    pub async fn update_activity(
        &self,
        admin_id: u64,
        activity_id: &str,
        update: ActivityUpdate,
    ) -> Result<Activity> {
        let mut activity = self
            .db
            .get_activity(activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;
        require_admin(self.db.as_ref(), &activity.group_id, admin_id).await?;
        update.validate()?;

        activity.apply(update);
        self.db.upsert_activity(&activity).await?;

        tracing::info!(activity_id, points = activity.points, "Activity updated");
        Ok(activity)
    }
}
