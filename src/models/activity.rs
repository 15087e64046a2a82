// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Recurring group activity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An activity members complete for points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    /// Activity ID (uuid, also used as document ID)
    pub id: String,
    /// Owning group
    pub group_id: String,
    pub title: String,
    pub description: Option<String>,
    /// Points credited when a submission is approved
    pub points: u32,
    pub created_at: DateTime<Utc>,
}

/// Sort activities the way the group page lists them: most points first,
/// then newest first.
pub fn sort_for_display(activities: &mut [Activity]) {
    activities.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

/// Request body for creating an activity.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewActivity {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub points: u32,
}

/// Partial update of an activity. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ActivityUpdate {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub points: Option<u32>,
}

impl Activity {
    pub fn new(group_id: &str, input: NewActivity) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            group_id: group_id.to_string(),
            title: input.title.trim().to_string(),
            description: input.description.filter(|d| !d.trim().is_empty()),
            points: input.points,
            created_at: Utc::now(),
        }
    }

    pub fn apply(&mut self, update: ActivityUpdate) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            self.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(points) = update.points {
            self.points = points;
        }
    }
}
