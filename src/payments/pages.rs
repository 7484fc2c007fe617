use crate::{
    bookings::repo_types::Booking,
    email::templates::{escape_html, format_peso, long_date},
};

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; background: #f5f7fb; padding: 20px; color: #333; }
    .card { max-width: 520px; margin: 0 auto; background: #fff; border-radius: 10px; box-shadow: 0 10px 25px rgba(0,0,0,0.08); padding: 24px; }
    h1 { margin: 0 0 8px 0; font-size: 22px; }
    .muted { color: #666; margin-top: 0; }
    .amount { background: #4e8fff; color: #fff; padding: 12px 16px; border-radius: 8px; font-weight: 700; display: inline-block; margin: 12px 0 18px; }
    .methods { display: grid; gap: 10px; margin: 12px 0 18px; }
    .option { border: 1px solid #e5e7eb; border-radius: 8px; padding: 12px; display: flex; align-items: center; gap: 10px; cursor: pointer; }
    .submit { display: inline-block; padding: 12px 18px; background: #27ae60; color: #fff; border-radius: 8px; font-weight: 700; border: none; cursor: pointer; }
"#;

/// Methods offered on the pay page.
pub const PAYMENT_METHODS: &[(&str, &str)] = &[
    ("bank", "Bank Payment"),
    ("gcash", "GCash Payment"),
    ("cashier", "Pay at Counter/Cashier"),
];

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{title}</title>
    <style>{STYLE}</style>
  </head>
  <body>
    <div class="card">
{body}
    </div>
  </body>
</html>"#
    )
}

pub fn message(text: &str) -> String {
    page("Kina Resort", &format!("<h2>{}</h2>", escape_html(text)))
}

pub fn payment_form(b: &Booking, token: &str, base_url: &str) -> String {
    let methods: String = PAYMENT_METHODS
        .iter()
        .enumerate()
        .map(|(i, (value, label))| {
            let required = if i == 0 { " required" } else { "" };
            format!(
                r#"<label class="option"><input type="radio" name="method" value="{value}"{required} /> {label}</label>"#
            )
        })
        .collect();

    let body = format!(
        r#"<h1>Kina Resort Payment</h1>
<p class="muted">Booking for {name} &bull; {check_in} - {check_out}</p>
<div class="amount">Amount Due: {amount}</div>
<form method="POST" action="{action}">
  <input type="hidden" name="booking_id" value="{id}" />
  <input type="hidden" name="token" value="{token}" />
  <div class="methods">{methods}</div>
  <button type="submit" class="submit">Confirm Payment</button>
</form>"#,
        name = escape_html(&b.guest_name),
        check_in = long_date(b.check_in),
        check_out = long_date(b.check_out),
        amount = format_peso(b.total()),
        action = escape_html(&format!("{base_url}/api/payments/confirm")),
        id = b.id,
        token = escape_html(token),
    );
    page("Pay for Booking - Kina Resort", &body)
}

pub fn thank_you(b: &Booking) -> String {
    let body = format!(
        r#"<h2>Thank you! Your payment has been recorded.</h2>
<p>A confirmation receipt was sent to {email}.</p>"#,
        email = escape_html(&b.guest_email),
    );
    page("Payment Recorded - Kina Resort", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookings::repo_types::{BookingStatus, VisitTime};
    use time::{macros::date, OffsetDateTime};
    use uuid::Uuid;

    fn booking() -> Booking {
        let now = OffsetDateTime::now_utc();
        Booking {
            id: Uuid::new_v4(),
            guest_name: "Ana <Reyes>".into(),
            guest_email: "ana@example.com".into(),
            guest_phone: None,
            room_type: "Standard Room".into(),
            check_in: date!(2025 - 03 - 05),
            check_out: date!(2025 - 03 - 06),
            booking_time: None,
            visit_time: Some(VisitTime::Morning),
            cottage: None,
            adults: 2,
            kids: 0,
            guest_count: 2,
            entrance_fee: 140,
            cottage_fee: 0,
            extra_guest_charge: 0,
            status: BookingStatus::Pending,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn form_posts_booking_token_and_methods() {
        let b = booking();
        let html = payment_form(&b, "abc123", "https://kina.example");
        assert!(html.contains(r#"action="https://kina.example/api/payments/confirm""#));
        assert!(html.contains(&format!(r#"name="booking_id" value="{}""#, b.id)));
        assert!(html.contains(r#"name="token" value="abc123""#));
        assert!(html.contains("Amount Due: ₱140.00"));
        for (value, _) in PAYMENT_METHODS {
            assert!(html.contains(&format!(r#"value="{value}""#)));
        }
        assert!(html.contains("Ana &lt;Reyes&gt;"));
    }

    #[test]
    fn thank_you_names_recipient() {
        assert!(thank_you(&booking()).contains("ana@example.com"));
    }
}
