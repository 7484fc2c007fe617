use serde::{Deserialize, Serialize};
use time::Date;

use super::repo_types::{Booking, BookingStatus, Cottage, VisitTime};

/// Request body for a new booking.
#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub guest_name: String,
    pub guest_email: String,
    pub guest_phone: Option<String>,
    pub room_type: String,
    pub check_in: Date,
    pub check_out: Date,
    pub booking_time: Option<String>,
    pub status: Option<BookingStatus>,
    pub guest_count: Option<i32>,
    pub adults: Option<i32>,
    pub kids: Option<i32>,
    pub visit_time: Option<VisitTime>,
    pub cottage: Option<Cottage>,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub guest_phone: Option<String>,
    pub room_type: Option<String>,
    pub check_in: Option<Date>,
    pub check_out: Option<Date>,
    pub booking_time: Option<String>,
    pub status: Option<BookingStatus>,
    pub guest_count: Option<i32>,
    pub adults: Option<i32>,
    pub kids: Option<i32>,
    pub visit_time: Option<VisitTime>,
    pub cottage: Option<Cottage>,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub status: Option<String>,
    pub room_type: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    100
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub success: bool,
    pub booking: Booking,
    pub total_cost: i64,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            success: true,
            total_cost: booking.total(),
            booking,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub success: bool,
    pub bookings: Vec<Booking>,
}
