// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Groups and memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A group of members sharing a set of activities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    /// Group ID (uuid, also used as document ID)
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Role of a member within a group.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Member,
}

/// Links a user to a group, with a points balance scoped to that group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Membership {
    pub group_id: String,
    pub user_id: u64,
    pub role: Role,
    /// Balance maintained by the points ledger
    pub points: i64,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn new(group_id: &str, user_id: u64, role: Role) -> Self {
        Self {
            group_id: group_id.to_string(),
            user_id,
            role,
            points: 0,
            joined_at: Utc::now(),
        }
    }

    /// Document ID: one membership per (group, user).
    pub fn doc_id(group_id: &str, user_id: u64) -> String {
        format!("{}_{}", group_id, user_id)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Whether removing `user_id` would leave the group without an admin.
pub fn is_last_admin(memberships: &[Membership], user_id: u64) -> bool {
    let target_is_admin = memberships
        .iter()
        .any(|m| m.user_id == user_id && m.is_admin());
    let admins = memberships.iter().filter(|m| m.is_admin()).count();

    target_is_admin && admins <= 1
}
