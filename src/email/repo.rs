use sqlx::PgPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }
}

/// Append a delivery attempt to `email_logs`.
pub async fn insert_email_log(
    db: &PgPool,
    recipient: &str,
    subject: &str,
    status: EmailStatus,
    error_message: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO email_logs (recipient, subject, status, error_message)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(recipient)
    .bind(subject)
    .bind(status.as_str())
    .bind(error_message)
    .execute(db)
    .await?;
    Ok(())
}
