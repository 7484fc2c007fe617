use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};
use tracing::{info, instrument};

use super::{
    dto::{AuditListResponse, AuditStats, AuditStatsResponse, ListAuditQuery, SearchAuditQuery},
    repo::{self, SearchFilter},
};
use crate::{
    auth::extractors::{Actor, ADMIN_ONLY},
    errors::{AppError, AppResult},
    extract::AppQuery,
    state::AppState,
};

const BREAKDOWN_WINDOW: i64 = 1000;

pub fn audit_routes() -> Router<AppState> {
    Router::new()
        .route("/audit-logs", get(list_logs))
        .route("/audit-logs/search", get(search_logs))
        .route("/audit-logs/stats", get(stats))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn list_logs(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(q): AppQuery<ListAuditQuery>,
) -> AppResult<Json<AuditListResponse>> {
    actor.require(ADMIN_ONLY)?;
    let logs = repo::list(&state.db, q.limit.clamp(1, 500), q.offset.max(0)).await?;
    Ok(Json(AuditListResponse {
        success: true,
        logs,
    }))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn search_logs(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(q): AppQuery<SearchAuditQuery>,
) -> AppResult<Json<AuditListResponse>> {
    actor.require(ADMIN_ONLY)?;

    let filter = SearchFilter {
        action: q.action.as_deref().map(str::trim).filter(|a| !a.is_empty()),
        user_id: q.user_id,
        start: parse_timestamp(q.start_date.as_deref(), "start_date")?,
        end: parse_timestamp(q.end_date.as_deref(), "end_date")?,
    };

    let logs = repo::search(&state.db, &filter, q.limit.clamp(1, 500), q.offset.max(0)).await?;
    info!(count = logs.len(), "audit search");
    Ok(Json(AuditListResponse {
        success: true,
        logs,
    }))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn stats(State(state): State<AppState>, actor: Actor) -> AppResult<Json<AuditStatsResponse>> {
    actor.require(ADMIN_ONLY)?;

    let week_ago = OffsetDateTime::now_utc() - Duration::days(7);
    let total_logs = repo::count_all(&state.db).await?;
    let recent_logs = repo::count_since(&state.db, week_ago).await?;
    let action_breakdown = repo::action_breakdown(&state.db, BREAKDOWN_WINDOW)
        .await?
        .into_iter()
        .map(|row| (row.action_type, row.count))
        .collect();

    Ok(Json(AuditStatsResponse {
        success: true,
        stats: AuditStats {
            total_logs,
            recent_logs,
            action_breakdown,
        },
    }))
}

fn parse_timestamp(raw: Option<&str>, field: &str) -> AppResult<Option<OffsetDateTime>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => OffsetDateTime::parse(s, &Rfc3339)
            .map(Some)
            .map_err(|_| AppError::bad_request(format!("Invalid {field}, expected RFC 3339"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_parse_as_rfc3339() {
        let parsed = parse_timestamp(Some("2025-03-05T08:30:00Z"), "start_date")
            .unwrap()
            .unwrap();
        assert_eq!(parsed.unix_timestamp(), 1_741_163_400);
        assert_eq!(parse_timestamp(Some("  "), "start_date").unwrap(), None);
        assert_eq!(parse_timestamp(None, "start_date").unwrap(), None);
    }

    #[test]
    fn bad_timestamp_is_a_bad_request() {
        let err = parse_timestamp(Some("05/03/2025"), "end_date").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("end_date")));
    }
}
