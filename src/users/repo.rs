use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    repo::USER_COLUMNS,
    repo_types::{Role, User},
};

/// Column changes for an admin edit. `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub loyalty_points: Option<i32>,
    pub password_hash: Option<String>,
}

/// Newest first, optionally only one role.
pub async fn list(db: &PgPool, role: Option<Role>) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE ($1::user_role IS NULL OR role = $1)
        ORDER BY created_at DESC
        "#
    ))
    .bind(role)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn update(db: &PgPool, id: Uuid, c: &UserChanges) -> anyhow::Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            full_name = btrim(COALESCE($2, first_name) || ' ' || COALESCE($3, last_name)),
            role = COALESCE($4::user_role, role),
            is_active = COALESCE($5, is_active),
            loyalty_points = COALESCE($6, loyalty_points),
            password_hash = COALESCE($7, password_hash),
            updated_at = now()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(c.first_name.as_deref())
    .bind(c.last_name.as_deref())
    .bind(c.role)
    .bind(c.is_active)
    .bind(c.loyalty_points)
    .bind(c.password_hash.as_deref())
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn count_active_admins(db: &PgPool) -> anyhow::Result<i64> {
    let (n,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM users WHERE role = 'admin' AND is_active = TRUE",
    )
    .fetch_one(db)
    .await?;
    Ok(n)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected() > 0)
}
