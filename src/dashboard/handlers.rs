use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{
        DashboardStats, RecentBookingsResponse, RecentQuery, StatsResponse,
        TodayOperationsResponse,
    },
    repo::{self, BookingCounts},
};
use crate::{
    auth::extractors::{Actor, STAFF_OR_ADMIN},
    bookings,
    errors::AppResult,
    extract::AppQuery,
    state::AppState,
};

const PENDING_QUEUE_LIMIT: i64 = 20;

pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(stats))
        .route("/dashboard/recent-bookings", get(recent_bookings))
        .route("/dashboard/today-operations", get(today_operations))
}

/// Share of bookings that are confirmed, as a whole percentage.
pub fn occupancy_rate(confirmed: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (confirmed as f64 / total as f64 * 100.0).round() as i64
}

fn to_stats(c: BookingCounts, users_count: i64) -> DashboardStats {
    DashboardStats {
        total_bookings: c.total,
        pending_bookings: c.pending,
        confirmed_bookings: c.confirmed,
        cancelled_bookings: c.cancelled,
        completed_bookings: c.completed,
        today_bookings: c.today_check_ins,
        occupancy_rate: occupancy_rate(c.confirmed, c.total),
        users_count,
        confirmed_revenue: c.confirmed_revenue,
    }
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn stats(State(state): State<AppState>, actor: Actor) -> AppResult<Json<StatsResponse>> {
    actor.require(STAFF_OR_ADMIN)?;
    let today = OffsetDateTime::now_utc().date();
    let counts = repo::booking_counts(&state.db, today).await?;
    let users = repo::active_users(&state.db).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats: to_stats(counts, users),
    }))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn recent_bookings(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(q): AppQuery<RecentQuery>,
) -> AppResult<Json<RecentBookingsResponse>> {
    actor.require(STAFF_OR_ADMIN)?;
    let bookings = bookings::repo::list(&state.db, None, None, q.limit.clamp(1, 100), 0).await?;
    Ok(Json(RecentBookingsResponse {
        success: true,
        bookings,
    }))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn today_operations(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<TodayOperationsResponse>> {
    actor.require(STAFF_OR_ADMIN)?;
    let today = OffsetDateTime::now_utc().date();
    Ok(Json(TodayOperationsResponse {
        success: true,
        check_ins: repo::check_ins_on(&state.db, today).await?,
        check_outs: repo::check_outs_on(&state.db, today).await?,
        pending_bookings: repo::pending(&state.db, PENDING_QUEUE_LIMIT).await?,
    }))
}
