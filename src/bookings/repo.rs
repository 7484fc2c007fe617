use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Booking, BookingDraft, BookingStatus};

pub(crate) const BOOKING_COLUMNS: &str = r#"
    id, guest_name, guest_email, guest_phone, room_type, check_in, check_out,
    booking_time, visit_time, cottage, adults, kids, guest_count,
    entrance_fee, cottage_fee, extra_guest_charge, status, created_by,
    created_at, updated_at
"#;

/// Newest first, optionally filtered by status and room.
pub async fn list(
    db: &PgPool,
    status: Option<BookingStatus>,
    room_type: Option<&str>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, Booking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE ($1::booking_status IS NULL OR status = $1)
          AND ($2::text IS NULL OR room_type = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#
    ))
    .bind(status)
    .bind(room_type)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Booking>> {
    let row = sqlx::query_as::<_, Booking>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

/// Pending and confirmed bookings on `room_type`, optionally leaving one out.
pub async fn holding_room(
    db: &PgPool,
    room_type: &str,
    exclude: Option<Uuid>,
) -> anyhow::Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, Booking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE room_type = $1
          AND status IN ('pending', 'confirmed')
          AND ($2::uuid IS NULL OR id <> $2)
        ORDER BY check_in
        "#
    ))
    .bind(room_type)
    .bind(exclude)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert(db: &PgPool, d: &BookingDraft, created_by: Uuid) -> anyhow::Result<Booking> {
    let row = sqlx::query_as::<_, Booking>(&format!(
        r#"
        INSERT INTO bookings (
            guest_name, guest_email, guest_phone, room_type, check_in, check_out,
            booking_time, visit_time, cottage, adults, kids, guest_count,
            entrance_fee, cottage_fee, extra_guest_charge, status, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(&d.guest_name)
    .bind(&d.guest_email)
    .bind(&d.guest_phone)
    .bind(&d.room_type)
    .bind(d.check_in)
    .bind(d.check_out)
    .bind(&d.booking_time)
    .bind(d.visit_time)
    .bind(d.cottage)
    .bind(d.adults)
    .bind(d.kids)
    .bind(d.guest_count)
    .bind(d.entrance_fee)
    .bind(d.cottage_fee)
    .bind(d.extra_guest_charge)
    .bind(d.status)
    .bind(created_by)
    .fetch_one(db)
    .await?;
    Ok(row)
}

/// Overwrite every editable column. `None` if the booking is gone.
pub async fn update(db: &PgPool, id: Uuid, d: &BookingDraft) -> anyhow::Result<Option<Booking>> {
    let row = sqlx::query_as::<_, Booking>(&format!(
        r#"
        UPDATE bookings SET
            guest_name = $2, guest_email = $3, guest_phone = $4, room_type = $5,
            check_in = $6, check_out = $7, booking_time = $8, visit_time = $9,
            cottage = $10, adults = $11, kids = $12, guest_count = $13,
            entrance_fee = $14, cottage_fee = $15, extra_guest_charge = $16,
            status = $17, updated_at = now()
        WHERE id = $1
        RETURNING {BOOKING_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(&d.guest_name)
    .bind(&d.guest_email)
    .bind(&d.guest_phone)
    .bind(&d.room_type)
    .bind(d.check_in)
    .bind(d.check_out)
    .bind(&d.booking_time)
    .bind(d.visit_time)
    .bind(d.cottage)
    .bind(d.adults)
    .bind(d.kids)
    .bind(d.guest_count)
    .bind(d.entrance_fee)
    .bind(d.cottage_fee)
    .bind(d.extra_guest_charge)
    .bind(d.status)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn set_status(db: &PgPool, id: Uuid, status: BookingStatus) -> anyhow::Result<()> {
    sqlx::query("UPDATE bookings SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(db)
        .await?;
    Ok(())
}

/// Returns whether a row was removed.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM bookings WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}

/// Bump the creator's booking counter used for loyalty.
pub async fn increment_user_bookings(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET total_bookings = total_bookings + 1 WHERE id = $1")
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}
