use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Audit row joined with the acting user's email and name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_role: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub table_name: Option<String>,
    pub record_id: Option<String>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user_email: Option<String>,
    pub user_name: String,
}

/// Row ready for insertion, with inferred fields already filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditLog {
    pub user_id: Option<Uuid>,
    pub user_role: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub table_name: Option<&'static str>,
    pub record_id: Option<String>,
    pub new_values: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActionCount {
    pub action_type: String,
    pub count: i64,
}
