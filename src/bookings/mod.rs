use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod pricing;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    handlers::booking_routes()
}
