use sqlx::{FromRow, PgPool};
use time::Date;

use crate::bookings::{
    repo::BOOKING_COLUMNS,
    repo_types::Booking,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct BookingCounts {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
    pub completed: i64,
    pub today_check_ins: i64,
    pub confirmed_revenue: i64,
}

pub async fn booking_counts(db: &PgPool, today: Date) -> anyhow::Result<BookingCounts> {
    let row = sqlx::query_as::<_, BookingCounts>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'pending') AS pending,
            COUNT(*) FILTER (WHERE status = 'confirmed') AS confirmed,
            COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled,
            COUNT(*) FILTER (WHERE status = 'completed') AS completed,
            COUNT(*) FILTER (WHERE check_in = $1) AS today_check_ins,
            COALESCE(
                SUM(entrance_fee + cottage_fee + extra_guest_charge) FILTER (WHERE status = 'confirmed'),
                0
            )::BIGINT AS confirmed_revenue
        FROM bookings
        "#,
    )
    .bind(today)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn active_users(db: &PgPool) -> anyhow::Result<i64> {
    let (n,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users WHERE is_active = TRUE")
        .fetch_one(db)
        .await?;
    Ok(n)
}

pub async fn check_ins_on(db: &PgPool, day: Date) -> anyhow::Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, Booking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE check_in = $1 AND status IN ('pending', 'confirmed')
        ORDER BY booking_time NULLS LAST, created_at
        "#
    ))
    .bind(day)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn check_outs_on(db: &PgPool, day: Date) -> anyhow::Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, Booking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE check_out = $1 AND status = 'confirmed'
        ORDER BY created_at
        "#
    ))
    .bind(day)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Oldest pending bookings first, so the queue drains in order.
pub async fn pending(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Booking>> {
    let rows = sqlx::query_as::<_, Booking>(&format!(
        r#"
        SELECT {BOOKING_COLUMNS}
        FROM bookings
        WHERE status = 'pending'
        ORDER BY created_at
        LIMIT $1
        "#
    ))
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
