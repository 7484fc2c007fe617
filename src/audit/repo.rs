use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{ActionCount, AuditLogView, NewAuditLog};

const VIEW_COLUMNS: &str = r#"
    a.id, a.user_id, a.user_role, a.action, a.details, a.table_name, a.record_id,
    a.new_values, a.ip_address, a.user_agent, a.created_at,
    u.email AS user_email,
    COALESCE(u.full_name, 'System') AS user_name
"#;

pub async fn insert(db: &PgPool, log: &NewAuditLog) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs
            (user_id, user_role, action, details, table_name, record_id, new_values, ip_address, user_agent)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(log.user_id)
    .bind(log.user_role.as_deref())
    .bind(&log.action)
    .bind(log.details.as_deref())
    .bind(log.table_name)
    .bind(log.record_id.as_deref())
    .bind(log.new_values.as_ref())
    .bind(log.ip_address.as_deref())
    .bind(log.user_agent.as_deref())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<AuditLogView>> {
    let rows = sqlx::query_as::<_, AuditLogView>(&format!(
        r#"
        SELECT {VIEW_COLUMNS}
        FROM audit_logs a
        LEFT JOIN users u ON u.id = a.user_id
        ORDER BY a.created_at DESC
        LIMIT $1 OFFSET $2
        "#
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[derive(Debug, Default)]
pub struct SearchFilter<'a> {
    pub action: Option<&'a str>,
    pub user_id: Option<Uuid>,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

/// `ILIKE` pattern matching `needle` anywhere, with wildcards taken literally.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub async fn search(
    db: &PgPool,
    filter: &SearchFilter<'_>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<AuditLogView>> {
    let pattern = filter.action.map(contains_pattern);
    let rows = sqlx::query_as::<_, AuditLogView>(&format!(
        r#"
        SELECT {VIEW_COLUMNS}
        FROM audit_logs a
        LEFT JOIN users u ON u.id = a.user_id
        WHERE ($1::text IS NULL OR a.action ILIKE $1 ESCAPE '\')
          AND ($2::uuid IS NULL OR a.user_id = $2)
          AND ($3::timestamptz IS NULL OR a.created_at >= $3)
          AND ($4::timestamptz IS NULL OR a.created_at <= $4)
        ORDER BY a.created_at DESC
        LIMIT $5 OFFSET $6
        "#
    ))
    .bind(pattern)
    .bind(filter.user_id)
    .bind(filter.start)
    .bind(filter.end)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count_all(db: &PgPool) -> anyhow::Result<i64> {
    let (n,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM audit_logs")
        .fetch_one(db)
        .await?;
    Ok(n)
}

pub async fn count_since(db: &PgPool, since: OffsetDateTime) -> anyhow::Result<i64> {
    let (n,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM audit_logs WHERE created_at >= $1")
        .bind(since)
        .fetch_one(db)
        .await?;
    Ok(n)
}

/// Counts per action prefix over the newest `window` entries.
pub async fn action_breakdown(db: &PgPool, window: i64) -> anyhow::Result<Vec<ActionCount>> {
    let rows = sqlx::query_as::<_, ActionCount>(
        r#"
        SELECT split_part(action, '_', 1) AS action_type, COUNT(*) AS count
        FROM (
            SELECT action FROM audit_logs ORDER BY created_at DESC LIMIT $1
        ) recent
        GROUP BY action_type
        ORDER BY count DESC, action_type
        "#,
    )
    .bind(window)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
