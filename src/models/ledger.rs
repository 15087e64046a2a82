// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Points ledger: the only code that changes membership balances.
//!
//! Nothing here is persisted on its own. Callers apply these mutations
//! inside the same atomic unit as the status change that caused them.

use serde::Serialize;

use crate::models::{Activity, Membership, Submission, SubmissionStatus};

/// Why a balance changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerReason {
    SubmissionApproved { submission_id: String },
    ActivityDeleted { activity_id: String },
    AdminOverride,
}

/// A single balance mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub group_id: String,
    pub user_id: u64,
    pub delta: i64,
    /// Balance after the mutation
    pub balance: i64,
    pub reason: LedgerReason,
}

impl LedgerEntry {
    pub fn log(&self) {
        tracing::info!(
            group_id = %self.group_id,
            user_id = self.user_id,
            delta = self.delta,
            balance = self.balance,
            reason = ?self.reason,
            "Ledger updated"
        );
    }
}

fn apply(membership: &mut Membership, delta: i64, reason: LedgerReason) -> LedgerEntry {
    membership.points = membership.points.saturating_add(delta);
    LedgerEntry {
        group_id: membership.group_id.clone(),
        user_id: membership.user_id,
        delta,
        balance: membership.points,
        reason,
    }
}

/// Credit the submitter for an approved submission and mark it credited.
pub fn credit(
    membership: &mut Membership,
    activity: &Activity,
    submission: &mut Submission,
) -> LedgerEntry {
    submission.credited = true;
    apply(
        membership,
        i64::from(activity.points),
        LedgerReason::SubmissionApproved {
            submission_id: submission.id.clone(),
        },
    )
}

/// Compensate balances before an activity and its submissions are deleted.
///
/// Every `Approved` submission costs its submitter `activity.points`,
/// regardless of how or when it was credited. Submitters who already left
/// the group are skipped.
pub fn revert_for_activity_deletion(
    activity: &Activity,
    submissions: &[Submission],
    memberships: &mut [Membership],
) -> Vec<LedgerEntry> {
    let mut entries = Vec::new();

    for submission in submissions
        .iter()
        .filter(|s| s.activity_id == activity.id && s.status == SubmissionStatus::Approved)
    {
        if let Some(membership) = memberships
            .iter_mut()
            .find(|m| m.user_id == submission.user_id)
        {
            entries.push(apply(
                membership,
                -i64::from(activity.points),
                LedgerReason::ActivityDeleted {
                    activity_id: activity.id.clone(),
                },
            ));
        }
    }

    entries
}

/// Admin override: set an absolute balance.
pub fn admin_set(membership: &mut Membership, value: i64) -> LedgerEntry {
    let delta = value.saturating_sub(membership.points);
    apply(membership, delta, LedgerReason::AdminOverride)
}
