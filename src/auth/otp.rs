use rand::Rng;
use time::{Duration, OffsetDateTime};

pub const OTP_VALID_MINUTES: i64 = 15;
/// How long a verified OTP may be used to set a new password.
pub const RESET_WINDOW_MINUTES: i64 = 5;

/// Six digit numeric code.
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}

pub fn expiry_from(now: OffsetDateTime) -> OffsetDateTime {
    now + Duration::minutes(OTP_VALID_MINUTES)
}

pub fn is_expired(expires_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    now > expires_at
}

pub fn within_reset_window(verified_at: Option<OffsetDateTime>, now: OffsetDateTime) -> bool {
    match verified_at {
        Some(at) => at <= now && now - at <= Duration::minutes(RESET_WINDOW_MINUTES),
        None => false,
    }
}
