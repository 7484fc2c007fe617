use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::AuditLogView;

#[derive(Debug, Deserialize)]
pub struct ListAuditQuery {
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_list_limit() -> i64 {
    100
}

/// Dates are RFC 3339 timestamps.
#[derive(Debug, Deserialize)]
pub struct SearchAuditQuery {
    pub action: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<Uuid>,
    #[serde(alias = "startDate")]
    pub start_date: Option<String>,
    #[serde(alias = "endDate")]
    pub end_date: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_search_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
pub struct AuditListResponse {
    pub success: bool,
    pub logs: Vec<AuditLogView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditStats {
    pub total_logs: i64,
    pub recent_logs: i64,
    pub action_breakdown: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct AuditStatsResponse {
    pub success: bool,
    pub stats: AuditStats,
}
