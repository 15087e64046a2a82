// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Calendar routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::calendar::{DayDetail, MonthStatus};
use crate::time_utils::parse_day_key;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/calendar/groups/{group_id}/daily-status",
            get(daily_status),
        )
        .route("/api/calendar/groups/{group_id}/day/{date}", get(day_detail))
}

#[derive(Deserialize)]
struct MonthQuery {
    year: Option<i32>,
    month: Option<u32>,
}

async fn daily_status(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(group_id): Path<String>,
    WithRejection(Query(params), _): WithRejection<Query<MonthQuery>, AppError>,
) -> Result<Json<MonthStatus>> {
    let (Some(year), Some(month)) = (params.year, params.month) else {
        return Err(AppError::Validation(
            "year and month are required".to_string(),
        ));
    };

    Ok(Json(
        state
            .calendar
            .daily_status(user.user_id, &group_id, year, month)
            .await?,
    ))
}

async fn day_detail(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((group_id, date)): Path<(String, String)>,
) -> Result<Json<DayDetail>> {
    let date = parse_day_key(&date)?;
    Ok(Json(
        state
            .calendar
            .day_detail(user.user_id, &group_id, date)
            .await?,
    ))
}
