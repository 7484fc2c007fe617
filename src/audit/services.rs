use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header::USER_AGENT, request::Parts},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error};
use uuid::Uuid;

use super::{repo, repo_types::NewAuditLog};

/// What happened and who did it.
#[derive(Debug, Clone, Default)]
pub struct AuditEntry {
    pub user_id: Option<Uuid>,
    pub user_role: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub table_name: Option<&'static str>,
    pub record_id: Option<String>,
    pub new_values: Option<serde_json::Value>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn by(mut self, user_id: Uuid, role: &str) -> Self {
        self.user_id = Some(user_id);
        self.user_role = Some(role.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.user_role = Some(role.to_string());
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Table the action touched, instead of guessing it from the action.
    pub fn table(mut self, table_name: &'static str) -> Self {
        self.table_name = Some(table_name);
        self
    }

    pub fn record(mut self, record_id: impl ToString) -> Self {
        self.record_id = Some(record_id.to_string());
        self
    }

    pub fn new_values(mut self, values: serde_json::Value) -> Self {
        self.new_values = Some(values);
        self
    }
}

/// Client address and agent, taken from the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let user_agent = parts
            .headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(RequestMeta {
            ip: forwarded.or(peer).map(|ip| clean_ip(&ip)),
            user_agent,
        })
    }
}

pub fn clean_ip(ip: &str) -> String {
    ip.strip_prefix("::ffff:").unwrap_or(ip).to_string()
}

pub fn infer_table(action: &str) -> Option<&'static str> {
    let action = action.to_lowercase();
    if action.contains("booking") {
        Some("bookings")
    } else if action.contains("user") {
        Some("users")
    } else if action.contains("package") {
        Some("packages")
    } else {
        None
    }
}

pub fn infer_record_id(details: &str) -> Option<String> {
    lazy_static! {
        static ref UUID_RE: Regex = Regex::new(
            r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
        )
        .expect("uuid regex compiles");
        static ref NUMBER_RE: Regex = Regex::new(r"\b\d+\b").expect("number regex compiles");
    }

    if let Some(m) = UUID_RE.find(details) {
        return Some(m.as_str().to_string());
    }
    if details.to_lowercase().contains("booking") {
        return NUMBER_RE.find(details).map(|m| m.as_str().to_string());
    }
    None
}

/// Fills in the derived columns for `entry`.
pub fn build_log(entry: AuditEntry, meta: RequestMeta) -> NewAuditLog {
    let table_name = entry.table_name.or_else(|| infer_table(&entry.action));
    let record_id = entry
        .record_id
        .or_else(|| entry.details.as_deref().and_then(infer_record_id));
    let new_values = entry
        .new_values
        .or_else(|| entry.user_role.as_ref().map(|r| json!({ "role": r })));

    NewAuditLog {
        user_id: entry.user_id,
        user_role: entry.user_role,
        action: entry.action,
        details: entry.details,
        table_name,
        record_id,
        new_values,
        ip_address: meta.ip,
        user_agent: meta.user_agent,
    }
}

/// Writes an audit row. Failures are logged and swallowed.
pub async fn record(db: &PgPool, entry: AuditEntry, meta: RequestMeta) {
    let log = build_log(entry, meta);
    match repo::insert(db, &log).await {
        Ok(()) => debug!(action = %log.action, "audit recorded"),
        Err(e) => error!(error = %e, action = %log.action, "audit write failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn table_follows_action_keyword() {
        assert_eq!(infer_table("booking_create"), Some("bookings"));
        assert_eq!(infer_table("user_delete"), Some("users"));
        assert_eq!(infer_table("package_update"), Some("packages"));
        assert_eq!(infer_table("settings_change"), None);
    }

    #[test]
    fn record_id_prefers_uuid() {
        let details = "Updated booking 7 (A1B2C3D4-0000-4000-8000-00000000ABCD)";
        assert_eq!(
            infer_record_id(details).as_deref(),
            Some("A1B2C3D4-0000-4000-8000-00000000ABCD")
        );
    }

    #[test]
    fn record_id_falls_back_to_number_for_bookings() {
        assert_eq!(infer_record_id("Deleted booking 42").as_deref(), Some("42"));
        assert_eq!(infer_record_id("User 42 logged in"), None);
        assert_eq!(infer_record_id("Booking without id"), None);
    }

    #[test]
    fn new_values_default_to_role() {
        let log = build_log(
            AuditEntry::new("user_login").role("staff"),
            RequestMeta::default(),
        );
        assert_eq!(log.new_values, Some(json!({ "role": "staff" })));
        assert_eq!(log.table_name, Some("users"));

        let log = build_log(
            AuditEntry::new("booking_payment")
                .role("guest")
                .new_values(json!({ "method": "gcash" })),
            RequestMeta::default(),
        );
        assert_eq!(log.new_values, Some(json!({ "method": "gcash" })));

        let log = build_log(AuditEntry::new("system_tick"), RequestMeta::default());
        assert_eq!(log.new_values, None);
    }

    #[test]
    fn ipv4_mapped_prefix_is_stripped() {
        assert_eq!(clean_ip("::ffff:10.0.0.7"), "10.0.0.7");
        assert_eq!(clean_ip("2001:db8::1"), "2001:db8::1");
    }

    #[tokio::test]
    async fn meta_prefers_first_forwarded_address() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .header(USER_AGENT, "curl/8.0")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))))
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let meta = RequestMeta::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(meta.ip.as_deref(), Some("203.0.113.9"));
        assert_eq!(meta.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[tokio::test]
    async fn meta_falls_back_to_peer_address() {
        let req = Request::builder()
            .extension(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 4000))))
            .body(())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let meta = RequestMeta::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(meta.ip.as_deref(), Some("192.168.1.20"));
        assert_eq!(meta.user_agent, None);
    }

    #[test]
    fn explicit_table_and_record_win_over_inference() {
        let id = Uuid::new_v4();
        let log = build_log(
            AuditEntry::new("booking_payment")
                .role("guest")
                .table("bookings")
                .record(id)
                .details("Payment for booking 42 via gcash"),
            RequestMeta::default(),
        );
        assert_eq!(log.table_name, Some("bookings"));
        assert_eq!(log.record_id, Some(id.to_string()));

        let log = build_log(
            AuditEntry::new("profile_edit")
                .table("users")
                .details("Changed user 7"),
            RequestMeta::default(),
        );
        assert_eq!(log.table_name, Some("users"));
        assert_eq!(log.record_id, None);
    }

    #[tokio::test]
    async fn record_never_fails_the_caller() {
        let state = crate::state::AppState::fake();
        record(&state.db, AuditEntry::new("user_logout"), RequestMeta::default()).await;
    }
}
