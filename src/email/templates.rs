use time::{macros::format_description, Date};

use crate::bookings::{pricing, repo_types::Booking};

/// Minimal HTML escaping for values interpolated into templates.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn format_peso(amount: i64) -> String {
    format!("₱{amount}.00")
}

/// "March 5, 2025"
pub fn long_date(d: Date) -> String {
    let fmt = format_description!("[month repr:long] [day padding:none], [year]");
    d.format(&fmt).unwrap_or_else(|_| d.to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn row(label: &str, value: &str) -> String {
    format!(
        r#"<div class="detail-row"><span class="detail-label">{label}:</span><span class="detail-value">{value}</span></div>"#
    )
}

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; }
    .container { max-width: 600px; margin: 0 auto; padding: 20px; }
    .header { background: #4e8fff; color: white; padding: 30px; text-align: center; border-radius: 8px 8px 0 0; }
    .header h1 { margin: 0; font-size: 24px; }
    .content { background: #f9fafb; padding: 30px; border-radius: 0 0 8px 8px; }
    .details-box { background: white; padding: 20px; border-radius: 8px; margin: 20px 0; }
    .details-box h2 { margin-top: 0; color: #4e8fff; border-bottom: 2px solid #4e8fff; padding-bottom: 10px; }
    .detail-row { display: flex; justify-content: space-between; padding: 10px 0; border-bottom: 1px solid #eee; }
    .detail-label { font-weight: 600; color: #666; }
    .detail-value { color: #333; text-align: right; }
    .total-box { background: #4e8fff; color: white; padding: 20px; border-radius: 8px; margin-top: 20px; }
    .total-amount { font-size: 32px; font-weight: 700; margin: 0; }
    .actions { text-align: center; margin-top: 20px; }
    .btn { display: inline-block; padding: 12px 20px; background: #27ae60; color: #fff; text-decoration: none; border-radius: 6px; font-weight: 700; }
    .footer { text-align: center; margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; color: #666; font-size: 14px; }
"#;

fn wrap(title: &str, inner: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>{STYLE}</style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Kina Resort</h1>
            <p style="margin: 10px 0 0 0;">{title}</p>
        </div>
        <div class="content">
{inner}
            <div class="footer">
                <p><strong>Thank you for choosing Kina Resort!</strong></p>
                <p style="margin-top: 20px; font-size: 12px;">This is an automated email. Please do not reply directly to this message.</p>
            </div>
        </div>
    </div>
</body>
</html>"#
    )
}

fn booking_details(b: &Booking) -> String {
    let mut rows = vec![
        row("Room Type", &escape_html(&capitalize(&b.room_type))),
        row("Total Guests", &b.guest_count.to_string()),
    ];
    if b.adults > 0 || b.kids > 0 {
        rows.push(row(
            "Guest Breakdown",
            &format!("{} Adult(s), {} Kid(s)", b.adults, b.kids),
        ));
    }
    if let Some(v) = b.visit_time {
        rows.push(row("Visit Time", &capitalize(v.as_str())));
    }
    if let Some(c) = b.cottage {
        rows.push(row("Cottage", &capitalize(c.as_str())));
    }
    rows.push(row("Check-in", &long_date(b.check_in)));
    rows.push(row("Check-out", &long_date(b.check_out)));
    if let Some(t) = &b.booking_time {
        rows.push(row("Booking Time", &escape_html(t)));
    }
    rows.concat()
}

fn cost_breakdown(b: &Booking) -> String {
    let total = pricing::total(b.entrance_fee, b.cottage_fee, b.extra_guest_charge);
    if total == 0 {
        return String::new();
    }
    let mut rows = Vec::new();
    if b.entrance_fee > 0 {
        rows.push(row("Entrance Fee", &format_peso(b.entrance_fee)));
    }
    if b.cottage_fee > 0 {
        rows.push(row("Cottage Fee", &format_peso(b.cottage_fee)));
    }
    if b.extra_guest_charge > 0 {
        rows.push(row("Extra Guest Charge", &format_peso(b.extra_guest_charge)));
    }
    format!(
        r#"<div class="details-box"><h2>Cost Breakdown</h2>{}</div>
<div class="total-box"><h3>Total Amount</h3><p class="total-amount">{}</p></div>"#,
        rows.concat(),
        format_peso(total)
    )
}

/// Receipt sent right after a booking is created.
pub fn booking_receipt(b: &Booking, pay_link: Option<&str>) -> String {
    let status_message = b.status.receipt_message();
    let mut guest_rows = vec![
        row("Name", &escape_html(&b.guest_name)),
        row("Email", &escape_html(&b.guest_email)),
    ];
    if let Some(phone) = b.guest_phone.as_deref().filter(|p| !p.is_empty()) {
        guest_rows.push(row("Phone", &escape_html(phone)));
    }
    guest_rows.push(row("Booking Status", b.status.as_str()));

    let actions = match pay_link {
        Some(link) => format!(
            r#"<div class="actions"><a href="{}" class="btn">Pay Now</a></div>"#,
            escape_html(link)
        ),
        None => String::new(),
    };

    let inner = format!(
        r#"<p>Dear {name},</p>
<p><strong>{status_message}</strong></p>
<div class="details-box"><h2>Guest Information</h2>{guest}</div>
<div class="details-box"><h2>Booking Details</h2>{details}</div>
{costs}
{actions}"#,
        name = escape_html(&b.guest_name),
        guest = guest_rows.concat(),
        details = booking_details(b),
        costs = cost_breakdown(b),
    );
    wrap("Booking Receipt", &inner)
}

/// Sent when staff move a booking into `confirmed`.
pub fn booking_confirmation(b: &Booking) -> String {
    let inner = format!(
        r#"<p>Dear {name},</p>
<p><strong>Your booking has been confirmed!</strong></p>
<div class="details-box"><h2>Booking Details</h2>{booking_id}{details}</div>
{costs}"#,
        name = escape_html(&b.guest_name),
        booking_id = row("Booking ID", &b.id.to_string()),
        details = booking_details(b),
        costs = cost_breakdown(b),
    );
    wrap("Booking Confirmation", &inner)
}

pub fn payment_confirmation(b: &Booking, method: &str) -> String {
    let total = pricing::total(b.entrance_fee, b.cottage_fee, b.extra_guest_charge);
    let inner = format!(
        r#"<p>Dear {name},</p>
<p>Your payment has been recorded successfully.</p>
<div class="details-box"><h2>Payment</h2>{method}{booking_id}{amount}</div>
<div class="details-box"><h2>Booking Details</h2>{details}</div>"#,
        name = escape_html(&b.guest_name),
        method = row("Payment Method", &escape_html(&method.to_uppercase())),
        booking_id = row("Booking ID", &b.id.to_string()),
        amount = row("Amount Paid", &format_peso(total)),
        details = booking_details(b),
    );
    wrap("Payment Confirmed", &inner)
}

pub fn password_reset_otp(full_name: &str, otp: &str, valid_minutes: i64) -> String {
    let inner = format!(
        r#"<h2>Password Reset Request</h2>
<p>Dear {name},</p>
<p>You requested to reset your password. Please use the code below:</p>
<div style="background: #667eea; color: white; padding: 20px; text-align: center; font-size: 32px; letter-spacing: 5px; margin: 20px 0;">{otp}</div>
<p>This code will expire in {valid_minutes} minutes.</p>
<p>If you didn't request this, please ignore this email.</p>"#,
        name = escape_html(full_name),
        otp = escape_html(otp),
    );
    wrap("Password Reset", &inner)
}
