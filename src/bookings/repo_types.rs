use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Only pending and confirmed bookings hold their dates.
    pub fn blocks_dates(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            _ => None,
        }
    }

    pub fn receipt_subject(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Booking Confirmation - Kina Resort",
            BookingStatus::Cancelled => "Booking Cancellation - Kina Resort",
            BookingStatus::Pending | BookingStatus::Completed => "Booking Receipt - Kina Resort",
        }
    }

    pub fn receipt_message(self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Your booking has been confirmed!",
            BookingStatus::Pending => {
                "Your booking request has been received and is pending confirmation."
            }
            BookingStatus::Cancelled => "Your booking has been cancelled.",
            BookingStatus::Completed => "Your stay has been completed. We hope to see you again!",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "visit_time", rename_all = "lowercase")]
pub enum VisitTime {
    Morning,
    Night,
}

impl VisitTime {
    pub fn as_str(self) -> &'static str {
        match self {
            VisitTime::Morning => "morning",
            VisitTime::Night => "night",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "cottage_kind", rename_all = "lowercase")]
pub enum Cottage {
    Tropahan,
    Barkads,
    Family,
}

impl Cottage {
    pub fn as_str(self) -> &'static str {
        match self {
            Cottage::Tropahan => "tropahan",
            Cottage::Barkads => "barkads",
            Cottage::Family => "family",
        }
    }
}

/// Booking record in the database. Fees are whole pesos.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub room_type: String,
    pub check_in: Date,
    pub check_out: Date,
    pub booking_time: Option<String>,
    pub visit_time: Option<VisitTime>,
    pub cottage: Option<Cottage>,
    pub adults: i32,
    pub kids: i32,
    pub guest_count: i32,
    pub entrance_fee: i64,
    pub cottage_fee: i64,
    pub extra_guest_charge: i64,
    pub status: BookingStatus,
    pub created_by: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Booking {
    pub fn total(&self) -> i64 {
        super::pricing::total(self.entrance_fee, self.cottage_fee, self.extra_guest_charge)
    }
}

/// Values to write for a new booking or a full update.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub room_type: String,
    pub check_in: Date,
    pub check_out: Date,
    pub booking_time: Option<String>,
    pub visit_time: Option<VisitTime>,
    pub cottage: Option<Cottage>,
    pub adults: i32,
    pub kids: i32,
    pub guest_count: i32,
    pub entrance_fee: i64,
    pub cottage_fee: i64,
    pub extra_guest_charge: i64,
    pub status: BookingStatus,
}

impl From<Booking> for BookingDraft {
    fn from(b: Booking) -> Self {
        Self {
            guest_name: b.guest_name,
            guest_email: b.guest_email,
            guest_phone: b.guest_phone,
            room_type: b.room_type,
            check_in: b.check_in,
            check_out: b.check_out,
            booking_time: b.booking_time,
            visit_time: b.visit_time,
            cottage: b.cottage,
            adults: b.adults,
            kids: b.kids,
            guest_count: b.guest_count,
            entrance_fee: b.entrance_fee,
            cottage_fee: b.cottage_fee,
            extra_guest_charge: b.extra_guest_charge,
            status: b.status,
        }
    }
}
