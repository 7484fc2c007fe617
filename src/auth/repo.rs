use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, PasswordResetOtp, Role, User};

pub(crate) const USER_COLUMNS: &str = r#"
    id, email, password_hash, first_name, last_name, full_name, role, is_active,
    last_login, member_since, loyalty_points, total_bookings, created_at, updated_at
"#;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with an already hashed password.
    pub async fn create(db: &PgPool, new: &NewUser<'_>) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, full_name, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.first_name.trim())
        .bind(new.last_name.trim())
        .bind(new.full_name())
        .bind(new.role)
        .fetch_one(db)
        .await
    }

    pub async fn touch_last_login(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_password_by_email(
        db: &PgPool,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = now() WHERE email = $1",
        )
        .bind(email)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

/// Role and active flag, looked up on every gated request.
pub async fn role_and_status(db: &PgPool, id: Uuid) -> anyhow::Result<Option<(String, Role, bool)>> {
    let row = sqlx::query_as::<_, (String, Role, bool)>(
        "SELECT email, role, is_active FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn insert_otp(
    db: &PgPool,
    email: &str,
    otp: &str,
    expires_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO password_reset_otps (email, otp, expires_at) VALUES ($1, $2, $3)")
        .bind(email)
        .bind(otp)
        .bind(expires_at)
        .execute(db)
        .await?;
    Ok(())
}

/// Newest unused OTP matching `email` and `otp`.
pub async fn find_unused_otp(
    db: &PgPool,
    email: &str,
    otp: &str,
) -> anyhow::Result<Option<PasswordResetOtp>> {
    let row = sqlx::query_as::<_, PasswordResetOtp>(
        r#"
        SELECT id, email, otp, expires_at, used, verified_at, created_at
        FROM password_reset_otps
        WHERE email = $1 AND otp = $2 AND used = FALSE
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(email)
    .bind(otp)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn mark_otp_verified(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE password_reset_otps SET used = TRUE, verified_at = now() WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

/// Newest OTP for `email` that has gone through verification.
pub async fn latest_verified_otp(
    db: &PgPool,
    email: &str,
) -> anyhow::Result<Option<PasswordResetOtp>> {
    let row = sqlx::query_as::<_, PasswordResetOtp>(
        r#"
        SELECT id, email, otp, expires_at, used, verified_at, created_at
        FROM password_reset_otps
        WHERE email = $1 AND used = TRUE AND verified_at IS NOT NULL
        ORDER BY verified_at DESC
        LIMIT 1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete_otps_for(db: &PgPool, email: &str) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM password_reset_otps WHERE email = $1")
        .bind(email)
        .execute(db)
        .await?;
    Ok(())
}
