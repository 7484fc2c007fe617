//! Guest payment flow reached through the signed link in booking receipts.

use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod pages;
pub mod token;

/// Routes under `/api`.
pub fn router() -> Router<AppState> {
    handlers::payment_routes()
}

pub fn pay_page_router() -> Router<AppState> {
    handlers::pay_page_routes()
}
