use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{
        BookingListResponse, BookingResponse, CreateBookingRequest, ListBookingsQuery,
        UpdateBookingRequest,
    },
    repo,
    repo_types::BookingStatus,
    services,
};
use crate::{
    app::MessageResponse,
    audit::RequestMeta,
    auth::extractors::{Actor, ADMIN_ONLY, STAFF_OR_ADMIN},
    errors::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    payments::token,
    state::AppState,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route(
            "/bookings/:id",
            get(get_booking)
                .patch(update_booking)
                .put(update_booking)
                .delete(delete_booking),
        )
}

fn status_filter(raw: Option<&str>) -> AppResult<Option<BookingStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        None => Ok(None),
        Some(s) => BookingStatus::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::bad_request(format!("Unknown status: {s}"))),
    }
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn list_bookings(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(q): AppQuery<ListBookingsQuery>,
) -> AppResult<Json<BookingListResponse>> {
    actor.require(STAFF_OR_ADMIN)?;

    let status = status_filter(q.status.as_deref())?;
    let room_type = q.room_type.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let bookings = repo::list(
        &state.db,
        status,
        room_type,
        q.limit.clamp(1, 500),
        q.offset.max(0),
    )
    .await?;

    Ok(Json(BookingListResponse {
        success: true,
        bookings,
    }))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn get_booking(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    actor.require(STAFF_OR_ADMIN)?;
    let booking = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;
    Ok(Json(booking.into()))
}

#[instrument(skip(state, actor, meta, headers, payload), fields(user_id = %actor.id))]
pub async fn create_booking(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
    headers: HeaderMap,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingResponse>)> {
    let base = token::base_url(state.config.public_base_url.as_deref(), &headers);
    let booking = services::create_booking(&state, &actor, meta, payload, &base).await?;
    Ok((StatusCode::CREATED, Json(booking.into())))
}

#[instrument(skip(state, actor, meta, payload), fields(user_id = %actor.id))]
pub async fn update_booking(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateBookingRequest>,
) -> AppResult<Json<BookingResponse>> {
    actor.require(STAFF_OR_ADMIN)?;
    let booking = services::update_booking(&state, &actor, meta, id, payload).await?;
    Ok(Json(booking.into()))
}

#[instrument(skip(state, actor, meta), fields(user_id = %actor.id))]
pub async fn delete_booking(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    actor.require(ADMIN_ONLY)?;
    services::delete_booking(&state, &actor, meta, id).await?;
    Ok(Json(MessageResponse::new("Booking deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_ignores_all_and_blank() {
        assert_eq!(status_filter(None).unwrap(), None);
        assert_eq!(status_filter(Some("all")).unwrap(), None);
        assert_eq!(status_filter(Some(" ")).unwrap(), None);
        assert_eq!(
            status_filter(Some("confirmed")).unwrap(),
            Some(BookingStatus::Confirmed)
        );
        assert!(status_filter(Some("archived")).is_err());
    }
}
