// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod directory;
pub mod ledger;
pub mod locks;
pub mod review;
pub mod submission;

pub use calendar::CalendarService;
pub use directory::DirectoryService;
pub use ledger::LedgerService;
pub use locks::KeyedLocks;
pub use review::ReviewService;
pub use submission::SubmissionService;
