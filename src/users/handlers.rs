use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserListResponse, UserResponse},
    repo::{self, UserChanges},
    services,
};
use crate::{
    app::MessageResponse,
    audit::{self, AuditEntry, RequestMeta},
    auth::{
        extractors::{Actor, ADMIN_ONLY},
        handlers::{create_account, validate_new_account, validate_password},
        password::{hash_password, normalize_email},
        repo_types::{Role, User},
    },
    errors::{AppError, AppResult},
    extract::{AppJson, AppPath, AppQuery},
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user)
                .patch(update_user)
                .put(update_user)
                .delete(delete_user),
        )
}

/// Blank or `all` means every role.
fn role_filter(raw: Option<&str>) -> AppResult<Option<Role>> {
    match raw.map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
        None => Ok(None),
        Some(s) => Role::parse(s)
            .map(Some)
            .ok_or_else(|| AppError::bad_request(format!("Unknown role: {s}"))),
    }
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
    AppQuery(q): AppQuery<ListUsersQuery>,
) -> AppResult<Json<UserListResponse>> {
    actor.require(ADMIN_ONLY)?;
    let users = repo::list(&state.db, role_filter(q.role.as_deref())?).await?;
    Ok(Json(UserListResponse {
        success: true,
        users,
    }))
}

#[instrument(skip(state, actor, meta, payload), fields(user_id = %actor.id))]
pub async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
    AppJson(mut payload): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    actor.require(ADMIN_ONLY)?;

    payload.email = normalize_email(&payload.email);
    validate_new_account(
        &payload.email,
        &payload.password,
        &payload.first_name,
        &payload.last_name,
    )?;

    let user = create_account(
        &state,
        &payload.email,
        &payload.password,
        &payload.first_name,
        &payload.last_name,
        payload.role,
    )
    .await?;

    audit::record(
        &state.db,
        AuditEntry::new("user_create")
            .by(actor.id, actor.role.as_str())
            .details(format!(
                "Created {} account: {} ({})",
                user.role.as_str(),
                user.email,
                user.id
            )),
        meta,
    )
    .await;

    info!(new_user_id = %user.id, "user created");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user,
        }),
    ))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn get_user(
    State(state): State<AppState>,
    actor: Actor,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<UserResponse>> {
    actor.require(ADMIN_ONLY)?;
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

fn changes_from(req: UpdateUserRequest) -> AppResult<UserChanges> {
    let trimmed = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    if req.loyalty_points.is_some_and(|p| p < 0) {
        return Err(AppError::bad_request("Loyalty points cannot be negative"));
    }

    let password_hash = match req.password.filter(|p| !p.is_empty()) {
        Some(p) => {
            validate_password(&p)?;
            Some(hash_password(&p)?)
        }
        None => None,
    };

    Ok(UserChanges {
        first_name: trimmed(req.first_name),
        last_name: trimmed(req.last_name),
        role: req.role,
        is_active: req.is_active,
        loyalty_points: req.loyalty_points,
        password_hash,
    })
}

#[instrument(skip(state, actor, meta, payload), fields(user_id = %actor.id))]
pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    actor.require(ADMIN_ONLY)?;

    let changes = changes_from(payload)?;
    let user = repo::update(&state.db, id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    audit::record(
        &state.db,
        AuditEntry::new("user_update")
            .by(actor.id, actor.role.as_str())
            .table("users")
            .record(id)
            .details(format!("Updated user {id}")),
        meta,
    )
    .await;

    info!(target_user_id = %id, "user updated");
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

#[instrument(skip(state, actor, meta), fields(user_id = %actor.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    actor.require(ADMIN_ONLY)?;

    let target = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let active_admins = repo::count_active_admins(&state.db).await?;
    services::check_deletion(&target, actor.id, active_admins)?;

    if !repo::delete(&state.db, id).await? {
        return Err(AppError::not_found("User not found"));
    }

    audit::record(
        &state.db,
        AuditEntry::new("user_delete")
            .by(actor.id, actor.role.as_str())
            .details(format!("Deleted user account: {} ({})", target.email, target.id)),
        meta,
    )
    .await;

    info!(target_user_id = %id, "user deleted");
    Ok(Json(MessageResponse::new("Account deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_role_filter_lists_everyone() {
        assert_eq!(role_filter(None).unwrap(), None);
        assert_eq!(role_filter(Some("")).unwrap(), None);
        assert_eq!(role_filter(Some("all")).unwrap(), None);
        assert_eq!(role_filter(Some("staff")).unwrap(), Some(Role::Staff));
        assert!(matches!(
            role_filter(Some("owner")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn blank_names_are_left_unchanged() {
        let changes = changes_from(UpdateUserRequest {
            first_name: Some("  ".into()),
            last_name: Some(" Cruz ".into()),
            role: Some(Role::Staff),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(changes.first_name, None);
        assert_eq!(changes.last_name.as_deref(), Some("Cruz"));
        assert_eq!(changes.role, Some(Role::Staff));
        assert!(changes.password_hash.is_none());
    }

    #[test]
    fn new_password_is_checked_and_hashed() {
        assert!(changes_from(UpdateUserRequest {
            password: Some("short".into()),
            ..Default::default()
        })
        .is_err());

        let changes = changes_from(UpdateUserRequest {
            password: Some("a-long-password".into()),
            ..Default::default()
        })
        .unwrap();
        let hash = changes.password_hash.unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn negative_loyalty_points_are_rejected() {
        assert!(changes_from(UpdateUserRequest {
            loyalty_points: Some(-5),
            ..Default::default()
        })
        .is_err());
    }
}
