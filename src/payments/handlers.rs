use axum::{
    async_trait,
    extract::{FromRequest, Path, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{pages, token};
use crate::{
    audit::{self, AuditEntry, RequestMeta},
    bookings::{repo, repo_types::BookingStatus},
    email::{self, templates, OutgoingEmail},
    errors::{AppError, AppResult},
    state::AppState,
};

/// Guest facing page, mounted outside `/api`.
pub fn pay_page_routes() -> Router<AppState> {
    Router::new().route("/pay/:id", get(pay_page))
}

pub fn payment_routes() -> Router<AppState> {
    Router::new().route("/payments/confirm", post(confirm_payment))
}

#[derive(Debug, Deserialize)]
pub struct PayPageQuery {
    pub t: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentForm {
    pub booking_id: Option<String>,
    pub token: Option<String>,
    pub method: Option<String>,
}

/// Accepts either a JSON body or an urlencoded form, chosen by `Content-Type`.
pub struct FormOrJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for FormOrJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state).await?;
            Ok(Self(value))
        }
    }
}

fn html_error(status: StatusCode, text: &str) -> Response {
    (status, Html(pages::message(text))).into_response()
}

#[instrument(skip(state, headers, q))]
pub async fn pay_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<PayPageQuery>,
    headers: HeaderMap,
) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return html_error(StatusCode::NOT_FOUND, "Booking not found.");
    };

    let booking = match repo::find_by_id(&state.db, id).await {
        Ok(Some(b)) => b,
        Ok(None) => return html_error(StatusCode::NOT_FOUND, "Booking not found."),
        Err(e) => {
            error!(error = %e, booking_id = %id, "load booking for pay page");
            return html_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to load payment page.",
            );
        }
    };

    let token = q.t.unwrap_or_default();
    if !token::verify(&state.config.payment_secret, id, &booking.guest_email, &token) {
        warn!(booking_id = %id, "pay page with bad token");
        return html_error(StatusCode::BAD_REQUEST, "Invalid or expired payment link.");
    }

    let base = token::base_url(state.config.public_base_url.as_deref(), &headers);
    Html(pages::payment_form(&booking, &token, &base)).into_response()
}

fn required(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[instrument(skip(state, meta, form))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    meta: RequestMeta,
    FormOrJson(form): FormOrJson<ConfirmPaymentForm>,
) -> AppResult<Html<String>> {
    let (Some(booking_id), Some(token), Some(method)) = (
        required(form.booking_id),
        required(form.token),
        required(form.method),
    ) else {
        return Err(AppError::bad_request("Missing payment details"));
    };

    if !pages::PAYMENT_METHODS.iter().any(|(value, _)| *value == method) {
        return Err(AppError::bad_request("Unknown payment method"));
    }

    let id = Uuid::parse_str(&booking_id).map_err(|_| AppError::not_found("Booking not found"))?;
    let mut booking = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;

    if !token::verify(&state.config.payment_secret, id, &booking.guest_email, &token) {
        warn!(booking_id = %id, "payment confirm with bad token");
        return Err(AppError::bad_request("Invalid or expired payment link"));
    }
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::bad_request("Cancelled bookings cannot be paid"));
    }

    if booking.status != BookingStatus::Confirmed {
        repo::set_status(&state.db, id, BookingStatus::Confirmed).await?;
        booking.status = BookingStatus::Confirmed;
    }

    email::send_and_log(
        &state.db,
        state.mailer.as_ref(),
        OutgoingEmail {
            to: booking.guest_email.clone(),
            subject: "Payment Confirmation - Kina Resort".into(),
            html: templates::payment_confirmation(&booking, &method),
        },
    )
    .await;

    audit::record(
        &state.db,
        AuditEntry::new("booking_payment")
            .role("guest")
            .table("bookings")
            .record(id)
            .details(format!("Payment confirmed for booking {id} via {method}"))
            .new_values(json!({ "method": method, "status": booking.status.as_str() })),
        meta,
    )
    .await;

    info!(booking_id = %id, method = %method, "payment recorded");
    Ok(Html(pages::thank_you(&booking)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(required(None), None);
        assert_eq!(required(Some("   ".into())), None);
        assert_eq!(required(Some(" gcash ".into())).as_deref(), Some("gcash"));
    }
}
