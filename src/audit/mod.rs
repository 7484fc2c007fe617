//! Append-only trail of administrative actions.

use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use services::{record, AuditEntry, RequestMeta};

pub fn router() -> Router<AppState> {
    handlers::audit_routes()
}
