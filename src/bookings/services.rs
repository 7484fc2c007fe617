use time::{Date, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateBookingRequest, UpdateBookingRequest},
    pricing::{self, Fees},
    repo,
    repo_types::{Booking, BookingDraft, BookingStatus},
};
use crate::{
    audit::{self, AuditEntry, RequestMeta},
    auth::{
        extractors::{Actor, STAFF_OR_ADMIN},
        password::is_valid_email,
        repo_types::Role,
    },
    email::{self, templates, OutgoingEmail},
    errors::{AppError, AppResult},
    payments::token,
    state::AppState,
};

/// Half-open ranges `[a_in, a_out)` and `[b_in, b_out)` share a day.
pub fn overlaps(a_in: Date, a_out: Date, b_in: Date, b_out: Date) -> bool {
    a_in < b_out && a_out > b_in
}

pub fn validate_dates(check_in: Date, check_out: Date, today: Option<Date>) -> AppResult<()> {
    if let Some(today) = today {
        if check_in < today {
            return Err(AppError::bad_request("Check-in date cannot be in the past"));
        }
    }
    if check_out < check_in {
        return Err(AppError::bad_request(
            "Check-out date cannot be before check-in date",
        ));
    }
    Ok(())
}

fn validate_guest(name: &str, email: &str, room_type: &str) -> AppResult<()> {
    if name.trim().is_empty() || email.trim().is_empty() || room_type.trim().is_empty() {
        return Err(AppError::bad_request(
            "Guest name, guest email and room type are required",
        ));
    }
    if !is_valid_email(email.trim()) {
        return Err(AppError::bad_request("Invalid guest email"));
    }
    Ok(())
}

fn validate_counts(adults: i32, kids: i32, guests: i32) -> AppResult<()> {
    if adults < 0 || kids < 0 || guests < 0 {
        return Err(AppError::bad_request("Guest counts cannot be negative"));
    }
    Ok(())
}

fn apply_fees(draft: &mut BookingDraft) {
    let fees = Fees::compute(
        draft.visit_time,
        draft.cottage,
        draft.adults,
        draft.kids,
        draft.guest_count,
    );
    draft.entrance_fee = fees.entrance_fee;
    draft.cottage_fee = fees.cottage_fee;
    draft.extra_guest_charge = fees.extra_guest_charge;
}

/// Status a new booking starts in. Only staff and admins may pick one.
pub fn initial_status(role: Role, requested: Option<BookingStatus>) -> BookingStatus {
    match requested {
        Some(status) if STAFF_OR_ADMIN.contains(&role) => status,
        _ => BookingStatus::Pending,
    }
}

/// Validated draft for a new booking, priced from the fee tables.
pub fn draft_from_create(req: CreateBookingRequest, today: Date) -> AppResult<BookingDraft> {
    validate_guest(&req.guest_name, &req.guest_email, &req.room_type)?;
    validate_dates(req.check_in, req.check_out, Some(today))?;

    let adults = req.adults.unwrap_or(0);
    let kids = req.kids.unwrap_or(0);
    validate_counts(adults, kids, req.guest_count.unwrap_or(0))?;
    let guest_count = pricing::guest_count(req.adults, req.kids, req.guest_count)
        .ok_or_else(|| AppError::bad_request("Guest count is too large"))?;

    let mut draft = BookingDraft {
        guest_name: req.guest_name.trim().to_string(),
        guest_email: req.guest_email.trim().to_string(),
        guest_phone: req.guest_phone.filter(|p| !p.trim().is_empty()),
        room_type: req.room_type.trim().to_string(),
        check_in: req.check_in,
        check_out: req.check_out,
        booking_time: req.booking_time.filter(|t| !t.trim().is_empty()),
        visit_time: req.visit_time,
        cottage: req.cottage,
        adults,
        kids,
        guest_count,
        entrance_fee: 0,
        cottage_fee: 0,
        extra_guest_charge: 0,
        status: req.status.unwrap_or(BookingStatus::Pending),
    };
    apply_fees(&mut draft);
    Ok(draft)
}

/// Stored booking with the changes in `req` laid over it, re-validated and re-priced.
pub fn merge_update(existing: &Booking, req: UpdateBookingRequest) -> AppResult<BookingDraft> {
    let mut draft = BookingDraft::from(existing.clone());

    if let Some(v) = req.guest_name {
        draft.guest_name = v.trim().to_string();
    }
    if let Some(v) = req.guest_email {
        draft.guest_email = v.trim().to_string();
    }
    if let Some(v) = req.guest_phone {
        draft.guest_phone = Some(v).filter(|p| !p.trim().is_empty());
    }
    if let Some(v) = req.room_type {
        draft.room_type = v.trim().to_string();
    }
    if let Some(v) = req.check_in {
        draft.check_in = v;
    }
    if let Some(v) = req.check_out {
        draft.check_out = v;
    }
    if let Some(v) = req.booking_time {
        draft.booking_time = Some(v).filter(|t| !t.trim().is_empty());
    }
    if let Some(v) = req.status {
        draft.status = v;
    }
    if req.visit_time.is_some() {
        draft.visit_time = req.visit_time;
    }
    if req.cottage.is_some() {
        draft.cottage = req.cottage;
    }

    if req.adults.is_some() || req.kids.is_some() {
        draft.adults = req.adults.unwrap_or(draft.adults);
        draft.kids = req.kids.unwrap_or(draft.kids);
        validate_counts(draft.adults, draft.kids, 0)?;
        draft.guest_count = draft
            .adults
            .checked_add(draft.kids)
            .ok_or_else(|| AppError::bad_request("Guest count is too large"))?;
    } else if let Some(g) = req.guest_count {
        draft.guest_count = g;
    }

    validate_guest(&draft.guest_name, &draft.guest_email, &draft.room_type)?;
    validate_dates(draft.check_in, draft.check_out, None)?;
    validate_counts(draft.adults, draft.kids, draft.guest_count)?;

    apply_fees(&mut draft);
    Ok(draft)
}

/// Whether an update has to be checked against other bookings.
pub fn needs_conflict_check(before: &Booking, after: &BookingDraft) -> bool {
    after.status.blocks_dates()
        && (before.check_in != after.check_in
            || before.check_out != after.check_out
            || before.room_type != after.room_type
            || before.status != after.status)
}

/// Bookings in `existing` that hold the same room on any day of `draft`.
pub fn conflicting<'a>(
    existing: &'a [Booking],
    draft: &BookingDraft,
    exclude: Option<Uuid>,
) -> Vec<&'a Booking> {
    existing
        .iter()
        .filter(|b| Some(b.id) != exclude)
        .filter(|b| b.status.blocks_dates() && b.room_type == draft.room_type)
        .filter(|b| overlaps(draft.check_in, draft.check_out, b.check_in, b.check_out))
        .collect()
}

async fn ensure_available(
    state: &AppState,
    draft: &BookingDraft,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let held = repo::holding_room(&state.db, &draft.room_type, exclude).await?;
    let conflicts = conflicting(&held, draft, exclude);
    if !conflicts.is_empty() {
        warn!(
            room_type = %draft.room_type,
            conflicts = conflicts.len(),
            "booking dates unavailable"
        );
        return Err(AppError::bad_request("Room is already booked for these dates"));
    }
    Ok(())
}

fn utc_today() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Pay link for the receipt, when there is something left to pay.
fn receipt_pay_link(state: &AppState, booking: &Booking, base_url: &str) -> Option<String> {
    if booking.status == BookingStatus::Cancelled || booking.total() <= 0 {
        return None;
    }
    token::payment_link(
        base_url,
        &state.config.payment_secret,
        booking.id,
        &booking.guest_email,
    )
}

#[instrument(skip(state, actor, meta, req, base_url), fields(user_id = %actor.id))]
pub async fn create_booking(
    state: &AppState,
    actor: &Actor,
    meta: RequestMeta,
    req: CreateBookingRequest,
    base_url: &str,
) -> AppResult<Booking> {
    let mut req = req;
    req.status = Some(initial_status(actor.role, req.status));
    let draft = draft_from_create(req, utc_today())?;
    if draft.status.blocks_dates() {
        ensure_available(state, &draft, None).await?;
    }

    let booking = repo::insert(&state.db, &draft, actor.id).await?;
    if let Err(e) = repo::increment_user_bookings(&state.db, actor.id).await {
        warn!(error = %e, "could not bump booking counter");
    }

    audit::record(
        &state.db,
        AuditEntry::new("booking_create")
            .by(actor.id, actor.role.as_str())
            .details(format!(
                "Created booking {} for {}",
                booking.id, booking.guest_name
            )),
        meta,
    )
    .await;

    let pay_link = receipt_pay_link(state, &booking, base_url);
    email::send_and_log(
        &state.db,
        state.mailer.as_ref(),
        OutgoingEmail {
            to: booking.guest_email.clone(),
            subject: booking.status.receipt_subject().to_string(),
            html: templates::booking_receipt(&booking, pay_link.as_deref()),
        },
    )
    .await;

    info!(booking_id = %booking.id, total = booking.total(), "booking created");
    Ok(booking)
}

#[instrument(skip(state, actor, meta, req), fields(user_id = %actor.id))]
pub async fn update_booking(
    state: &AppState,
    actor: &Actor,
    meta: RequestMeta,
    id: Uuid,
    req: UpdateBookingRequest,
) -> AppResult<Booking> {
    let existing = repo::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;

    let draft = merge_update(&existing, req)?;
    if needs_conflict_check(&existing, &draft) {
        ensure_available(state, &draft, Some(id)).await?;
    }

    let booking = repo::update(&state.db, id, &draft)
        .await?
        .ok_or_else(|| AppError::not_found("Booking not found"))?;

    audit::record(
        &state.db,
        AuditEntry::new("booking_update")
            .by(actor.id, actor.role.as_str())
            .details(format!("Updated booking {id}")),
        meta,
    )
    .await;

    if existing.status != BookingStatus::Confirmed && booking.status == BookingStatus::Confirmed {
        email::send_and_log(
            &state.db,
            state.mailer.as_ref(),
            OutgoingEmail {
                to: booking.guest_email.clone(),
                subject: "Booking Confirmed - Kina Resort".into(),
                html: templates::booking_confirmation(&booking),
            },
        )
        .await;
    }

    info!(booking_id = %id, status = booking.status.as_str(), "booking updated");
    Ok(booking)
}

#[instrument(skip(state, actor, meta), fields(user_id = %actor.id))]
pub async fn delete_booking(
    state: &AppState,
    actor: &Actor,
    meta: RequestMeta,
    id: Uuid,
) -> AppResult<()> {
    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("Booking not found"));
    }

    audit::record(
        &state.db,
        AuditEntry::new("booking_delete")
            .by(actor.id, actor.role.as_str())
            .details(format!("Deleted booking {id}")),
        meta,
    )
    .await;

    info!(booking_id = %id, "booking deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::repo_types::{Cottage, VisitTime};
    use time::macros::{date, datetime};

    fn create_req() -> CreateBookingRequest {
        CreateBookingRequest {
            guest_name: "Ana Reyes".into(),
            guest_email: "ana@example.com".into(),
            guest_phone: Some("0917 000 0000".into()),
            room_type: "Standard Room".into(),
            check_in: date!(2025 - 03 - 10),
            check_out: date!(2025 - 03 - 12),
            booking_time: None,
            status: None,
            guest_count: None,
            adults: Some(4),
            kids: Some(2),
            visit_time: Some(VisitTime::Morning),
            cottage: Some(Cottage::Barkads),
        }
    }

    fn stored(draft: BookingDraft) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            guest_name: draft.guest_name,
            guest_email: draft.guest_email,
            guest_phone: draft.guest_phone,
            room_type: draft.room_type,
            check_in: draft.check_in,
            check_out: draft.check_out,
            booking_time: draft.booking_time,
            visit_time: draft.visit_time,
            cottage: draft.cottage,
            adults: draft.adults,
            kids: draft.kids,
            guest_count: draft.guest_count,
            entrance_fee: draft.entrance_fee,
            cottage_fee: draft.cottage_fee,
            extra_guest_charge: draft.extra_guest_charge,
            status: draft.status,
            created_by: None,
            created_at: datetime!(2025-03-01 09:00 UTC),
            updated_at: datetime!(2025-03-01 09:00 UTC),
        }
    }

    #[test]
    fn overlapping_ranges() {
        let (a, b) = (date!(2025 - 03 - 10), date!(2025 - 03 - 12));
        assert!(overlaps(a, b, date!(2025 - 03 - 11), date!(2025 - 03 - 13)));
        assert!(overlaps(a, b, date!(2025 - 03 - 09), date!(2025 - 03 - 11)));
        assert!(overlaps(a, b, date!(2025 - 03 - 10), date!(2025 - 03 - 12)));
        assert!(overlaps(a, b, date!(2025 - 03 - 01), date!(2025 - 03 - 20)));
    }

    #[test]
    fn back_to_back_ranges_do_not_overlap() {
        let (a, b) = (date!(2025 - 03 - 10), date!(2025 - 03 - 12));
        assert!(!overlaps(a, b, date!(2025 - 03 - 12), date!(2025 - 03 - 14)));
        assert!(!overlaps(a, b, date!(2025 - 03 - 08), date!(2025 - 03 - 10)));
    }

    fn held(room: &str, check_in: Date, check_out: Date, status: BookingStatus) -> Booking {
        let mut b = stored(draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap());
        b.room_type = room.into();
        b.check_in = check_in;
        b.check_out = check_out;
        b.status = status;
        b
    }

    #[test]
    fn conflicts_need_same_room_and_a_holding_status() {
        let draft = draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap();
        let (d_in, d_out) = (date!(2025 - 03 - 11), date!(2025 - 03 - 13));
        let existing = vec![
            held("Standard Room", d_in, d_out, BookingStatus::Pending),
            held("Standard Room", d_in, d_out, BookingStatus::Confirmed),
            held("Standard Room", d_in, d_out, BookingStatus::Cancelled),
            held("Standard Room", d_in, d_out, BookingStatus::Completed),
            held("Family Villa", d_in, d_out, BookingStatus::Confirmed),
        ];

        let found = conflicting(&existing, &draft, None);
        let ids: Vec<Uuid> = found.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![existing[0].id, existing[1].id]);
    }

    #[test]
    fn back_to_back_bookings_do_not_conflict() {
        let draft = draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap();
        let existing = vec![
            held("Standard Room", date!(2025 - 03 - 12), date!(2025 - 03 - 14), BookingStatus::Confirmed),
            held("Standard Room", date!(2025 - 03 - 08), date!(2025 - 03 - 10), BookingStatus::Pending),
        ];
        assert!(conflicting(&existing, &draft, None).is_empty());
    }

    #[test]
    fn update_is_not_in_conflict_with_itself() {
        let draft = draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap();
        let own = stored(draft.clone());
        let existing = vec![own.clone()];
        assert_eq!(conflicting(&existing, &draft, None).len(), 1);
        assert!(conflicting(&existing, &draft, Some(own.id)).is_empty());
    }

    #[test]
    fn split_counts_that_overflow_are_rejected() {
        let mut req = create_req();
        req.adults = Some(i32::MAX);
        req.kids = Some(1);
        let err = draft_from_create(req, date!(2025 - 03 - 01)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("too large")));

        let existing = stored(draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap());
        let err = merge_update(
            &existing,
            UpdateBookingRequest {
                adults: Some(i32::MAX),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn only_staff_choose_the_starting_status() {
        let asked = Some(BookingStatus::Confirmed);
        assert_eq!(initial_status(Role::Customer, asked), BookingStatus::Pending);
        assert_eq!(initial_status(Role::Staff, asked), BookingStatus::Confirmed);
        assert_eq!(initial_status(Role::Admin, asked), BookingStatus::Confirmed);
        assert_eq!(initial_status(Role::Admin, None), BookingStatus::Pending);
    }

    #[test]
    fn dates_in_the_past_are_rejected_on_create() {
        let today = date!(2025 - 03 - 10);
        assert!(validate_dates(date!(2025 - 03 - 10), date!(2025 - 03 - 10), Some(today)).is_ok());
        let err = validate_dates(date!(2025 - 03 - 09), date!(2025 - 03 - 11), Some(today)).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("past")));
    }

    #[test]
    fn check_out_before_check_in_is_rejected() {
        let err = validate_dates(date!(2025 - 03 - 12), date!(2025 - 03 - 11), None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("before check-in")));
    }

    #[test]
    fn create_draft_is_priced_on_the_server() {
        let draft = draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap();
        assert_eq!(draft.guest_count, 6);
        assert_eq!(draft.entrance_fee, 4 * 70 + 2 * 60);
        assert_eq!(draft.cottage_fee, 400);
        assert_eq!(draft.extra_guest_charge, 200);
        assert_eq!(draft.status, BookingStatus::Pending);
    }

    #[test]
    fn create_requires_guest_fields() {
        let mut req = create_req();
        req.guest_name = "  ".into();
        assert!(draft_from_create(req, date!(2025 - 03 - 01)).is_err());

        let mut req = create_req();
        req.guest_email = "nope".into();
        assert!(draft_from_create(req, date!(2025 - 03 - 01)).is_err());
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut req = create_req();
        req.adults = Some(-1);
        req.kids = None;
        assert!(draft_from_create(req, date!(2025 - 03 - 01)).is_err());
    }

    #[test]
    fn update_merges_and_reprices() {
        let existing = stored(draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap());
        let draft = merge_update(
            &existing,
            UpdateBookingRequest {
                visit_time: Some(VisitTime::Night),
                kids: Some(0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(draft.guest_name, "Ana Reyes");
        assert_eq!(draft.adults, 4);
        assert_eq!(draft.kids, 0);
        assert_eq!(draft.guest_count, 4);
        assert_eq!(draft.entrance_fee, 4 * 120);
        assert_eq!(draft.cottage_fee, 400);
        assert_eq!(draft.extra_guest_charge, 0);
    }

    #[test]
    fn update_revalidates_merged_dates() {
        let existing = stored(draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap());
        let err = merge_update(
            &existing,
            UpdateBookingRequest {
                check_out: Some(date!(2025 - 03 - 09)),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn conflict_check_only_when_holding_dates_and_something_moved() {
        let existing = stored(draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap());

        let same = merge_update(
            &existing,
            UpdateBookingRequest {
                guest_phone: Some("0918 111 1111".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!needs_conflict_check(&existing, &same));

        let moved = merge_update(
            &existing,
            UpdateBookingRequest {
                check_out: Some(date!(2025 - 03 - 13)),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(needs_conflict_check(&existing, &moved));

        let cancelled = merge_update(
            &existing,
            UpdateBookingRequest {
                status: Some(BookingStatus::Cancelled),
                check_out: Some(date!(2025 - 03 - 13)),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(!needs_conflict_check(&existing, &cancelled));

        let reopened_from = stored(cancelled);
        let reopened = merge_update(
            &reopened_from,
            UpdateBookingRequest {
                status: Some(BookingStatus::Pending),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(needs_conflict_check(&reopened_from, &reopened));
    }

    #[tokio::test]
    async fn pay_link_only_for_payable_bookings() {
        let state = AppState::fake();
        let booking = stored(draft_from_create(create_req(), date!(2025 - 03 - 01)).unwrap());
        let link = receipt_pay_link(&state, &booking, "https://kina.example").unwrap();
        assert!(link.starts_with(&format!("https://kina.example/pay/{}?t=", booking.id)));

        let mut cancelled = booking.clone();
        cancelled.status = BookingStatus::Cancelled;
        assert!(receipt_pay_link(&state, &cancelled, "https://kina.example").is_none());

        let mut free = booking;
        free.visit_time = None;
        free.cottage = None;
        free.entrance_fee = 0;
        free.cottage_fee = 0;
        free.extra_guest_charge = 0;
        assert!(receipt_pay_link(&state, &free, "https://kina.example").is_none());
    }
}
