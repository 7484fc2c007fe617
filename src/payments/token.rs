//! Signed payment links.
//!
//! A link carries `t = hex(HMAC-SHA256(secret, "{booking_id}.{guest_email}"))`,
//! so it only works for the booking and guest it was issued to.

use axum::http::{header::HOST, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str, booking_id: Uuid, email: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{booking_id}.{email}").as_bytes());
    Some(mac)
}

pub fn sign(secret: &str, booking_id: Uuid, email: &str) -> Option<String> {
    let mac = mac_for(secret, booking_id, email)?;
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of `token` against the expected signature.
pub fn verify(secret: &str, booking_id: Uuid, email: &str, token: &str) -> bool {
    let Ok(bytes) = hex::decode(token.trim()) else {
        return false;
    };
    let Some(mac) = mac_for(secret, booking_id, email) else {
        return false;
    };
    mac.verify_slice(&bytes).is_ok()
}

pub fn payment_link(base_url: &str, secret: &str, booking_id: Uuid, email: &str) -> Option<String> {
    let token = sign(secret, booking_id, email)?;
    Some(format!(
        "{}/pay/{}?t={}",
        base_url.trim_end_matches('/'),
        booking_id,
        token
    ))
}

/// Public base URL: the configured one, else built from the `Host` header.
pub fn base_url(configured: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(url) = configured {
        return url.trim_end_matches('/').to_string();
    }
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost:8080");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}")
}
