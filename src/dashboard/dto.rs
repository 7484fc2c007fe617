use serde::{Deserialize, Serialize};

use crate::bookings::repo_types::Booking;

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_bookings: i64,
    pub pending_bookings: i64,
    pub confirmed_bookings: i64,
    pub cancelled_bookings: i64,
    pub completed_bookings: i64,
    pub today_bookings: i64,
    pub occupancy_rate: i64,
    pub users_count: i64,
    pub confirmed_revenue: i64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: DashboardStats,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}
fn default_recent_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
pub struct RecentBookingsResponse {
    pub success: bool,
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayOperationsResponse {
    pub success: bool,
    pub check_ins: Vec<Booking>,
    pub check_outs: Vec<Booking>,
    pub pending_bookings: Vec<Booking>,
}
