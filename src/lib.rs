// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Lyfez: peer-reviewed activity points for small groups
//!
//! This crate provides the backend API. Members submit proof of completing
//! a group activity, other members vote on it, and an approved submission
//! credits the submitter's points exactly once.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::Store;
use services::{
    CalendarService, DirectoryService, KeyedLocks, LedgerService, ReviewService, SubmissionService,
};
use time_utils::Clock;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub directory: DirectoryService,
    pub submissions: SubmissionService,
    pub reviews: ReviewService,
    pub ledger: LedgerService,
    pub calendar: CalendarService,
    /// Per-group locks held by membership and balance changes
    pub group_locks: KeyedLocks,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn Store>) -> Self {
        Self::with_clock(config, db, time_utils::today_utc)
    }

    /// Build state with a fixed source of "today".
    pub fn with_clock(config: Config, db: Arc<dyn Store>, clock: Clock) -> Self {
        let group_locks = KeyedLocks::new();

        Self {
            config,
            directory: DirectoryService::new(db.clone(), group_locks.clone()),
            submissions: SubmissionService::new(db.clone(), clock),
            reviews: ReviewService::new(db.clone()),
            ledger: LedgerService::new(db.clone(), group_locks.clone()),
            calendar: CalendarService::new(db.clone(), clock),
            db,
            group_locks,
        }
    }
}
