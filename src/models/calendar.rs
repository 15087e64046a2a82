// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Per-day completion classification.
//!
//! Derived at read time from the group's current activities and one user's
//! submissions. Nothing here is stored.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::models::{Activity, Submission, SubmissionStatus};
use crate::time_utils::month_bounds;

/// Completion state of one calendar day.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Complete,
    Partial,
    Incomplete,
    Future,
}

/// Classify `day` for one user.
///
/// `submissions` may contain other days and activities; only those dated
/// `day` against a current activity count. An activity counts as approved
/// if any of its submissions that day is approved, and as pending if one is
/// still awaiting review.
pub fn classify_day(
    day: NaiveDate,
    today: NaiveDate,
    activities: &[Activity],
    submissions: &[Submission],
) -> DayStatus {
    if day > today {
        return DayStatus::Future;
    }

    let current: HashSet<&str> = activities.iter().map(|a| a.id.as_str()).collect();
    let mut approved = HashSet::new();
    let mut pending = HashSet::new();

    for submission in submissions
        .iter()
        .filter(|s| s.day == day && current.contains(s.activity_id.as_str()))
    {
        if submission.status == SubmissionStatus::Approved {
            approved.insert(submission.activity_id.as_str());
        } else if submission.status.is_awaiting_review() {
            pending.insert(submission.activity_id.as_str());
        }
    }

    if approved.len() == current.len() {
        DayStatus::Complete
    } else if !approved.is_empty() || !pending.is_empty() {
        DayStatus::Partial
    } else {
        DayStatus::Incomplete
    }
}

/// Classify every day of a month. A group without activities yields an
/// empty map.
pub fn month_status(
    year: i32,
    month: u32,
    today: NaiveDate,
    activities: &[Activity],
    submissions: &[Submission],
) -> Result<BTreeMap<NaiveDate, DayStatus>> {
    let (first, last) = month_bounds(year, month)?;

    if activities.is_empty() {
        return Ok(BTreeMap::new());
    }

    Ok(first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| (d, classify_day(d, today, activities, submissions)))
        .collect())
}
