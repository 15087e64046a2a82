// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models and the pure review protocol.

pub mod activity;
pub mod calendar;
pub mod group;
pub mod ledger;
pub mod quorum;
pub mod review;
pub mod submission;

pub use activity::{Activity, ActivityUpdate, NewActivity};
pub use calendar::DayStatus;
pub use group::{Group, Membership, Role};
pub use ledger::{LedgerEntry, LedgerReason};
pub use quorum::{Decision, Tally, VoteRejection};
pub use review::{NewReview, Review};
pub use submission::{NewSubmission, Proof, Submission, SubmissionStatus, SubmissionView};
