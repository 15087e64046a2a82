// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Calendar views over submissions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::calendar::{classify_day, month_status};
use crate::models::{Activity, DayStatus, Review, SubmissionStatus};
use crate::services::directory::require_member;
use crate::time_utils::{month_bounds, Clock};

/// Activity as listed next to the month grid.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitySummary {
    pub id: String,
    pub title: String,
    pub points: u32,
}

impl From<&Activity> for ActivitySummary {
    fn from(activity: &Activity) -> Self {
        Self {
            id: activity.id.clone(),
            title: activity.title.clone(),
            points: activity.points,
        }
    }
}

/// Month view for one user in one group.
#[derive(Debug, Clone, Serialize)]
pub struct MonthStatus {
    pub activities: Vec<ActivitySummary>,
    pub daily_status: BTreeMap<NaiveDate, DayStatus>,
}

/// Vote as shown in the day view.
#[derive(Debug, Clone, Serialize)]
pub struct DayReview {
    pub reviewer_id: u64,
    pub approved: bool,
    pub comment: Option<String>,
}

impl From<Review> for DayReview {
    fn from(review: Review) -> Self {
        Self {
            reviewer_id: review.reviewer_id,
            approved: review.approved,
            comment: review.comment,
        }
    }
}

/// One submission in the day view.
#[derive(Debug, Clone, Serialize)]
pub struct DaySubmission {
    pub id: String,
    pub activity: ActivitySummary,
    pub description: String,
    pub status: SubmissionStatus,
    pub reviews: Vec<DayReview>,
}

/// Single-day view for one user in one group.
#[derive(Debug, Clone, Serialize)]
pub struct DayDetail {
    pub date: NaiveDate,
    pub group_id: String,
    pub status: DayStatus,
    pub submissions: Vec<DaySubmission>,
}

#[derive(Clone)]
pub struct CalendarService {
    db: Arc<dyn Store>,
    clock: Clock,
}

impl CalendarService {
    pub fn new(db: Arc<dyn Store>, clock: Clock) -> Self {
        Self { db, clock }
    }

    async fn authorize(&self, user_id: u64, group_id: &str) -> Result<()> {
        if self.db.get_group(group_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Group {}", group_id)));
        }
        require_member(self.db.as_ref(), group_id, user_id).await?;
        Ok(())
    }

    pub async fn daily_status(
        &self,
        user_id: u64,
        group_id: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthStatus> {
        let (first, last) = month_bounds(year, month)?;
        self.authorize(user_id, group_id).await?;

        let activities = self.db.list_activities(group_id).await?;
        if activities.is_empty() {
            return Ok(MonthStatus {
                activities: Vec::new(),
                daily_status: BTreeMap::new(),
            });
        }

        let submissions = self
            .db
            .list_user_submissions_between(group_id, user_id, first, last)
            .await?;

        let daily_status = month_status(year, month, (self.clock)(), &activities, &submissions)?;

        Ok(MonthStatus {
            activities: activities.iter().map(ActivitySummary::from).collect(),
            daily_status,
        })
    }

    pub async fn day_detail(&self, user_id: u64, group_id: &str, date: NaiveDate) -> Result<DayDetail> {
        self.authorize(user_id, group_id).await?;

        let activities = self.db.list_activities(group_id).await?;
        let submissions = self
            .db
            .list_user_submissions_between(group_id, user_id, date, date)
            .await?;

        let status = classify_day(date, (self.clock)(), &activities, &submissions);

        let by_id: HashMap<&str, &Activity> =
            activities.iter().map(|a| (a.id.as_str(), a)).collect();

        let mut day_submissions = Vec::new();
        for submission in &submissions {
            let Some(activity) = by_id.get(submission.activity_id.as_str()) else {
                continue;
            };
            let mut reviews = self.db.list_reviews(&submission.id).await?;
            reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            day_submissions.push(DaySubmission {
                id: submission.id.clone(),
                activity: ActivitySummary::from(*activity),
                description: submission.description.clone(),
                status: submission.status,
                reviews: reviews.into_iter().map(DayReview::from).collect(),
            });
        }

        Ok(DayDetail {
            date,
            group_id: group_id.to_string(),
            status,
            submissions: day_submissions,
        })
    }
}
