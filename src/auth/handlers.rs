use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use crate::{
    app::MessageResponse,
    audit::{self, AuditEntry, RequestMeta},
    auth::{
        dto::{
            AdminRegisterRequest, AuthResponse, ForgotPasswordRequest, LoginRequest, MeResponse,
            RefreshRequest, RegisterRequest, ResetPasswordRequest, VerifyOtpRequest,
        },
        extractors::{Actor, ADMIN_ONLY},
        jwt::JwtKeys,
        otp,
        password::{hash_password, is_valid_email, normalize_email, verify_password, MIN_PASSWORD_LEN},
        repo,
        repo_types::{NewUser, Role, User},
    },
    email::{self, templates, OutgoingEmail},
    errors::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
        .route("/auth/admin/register", post(admin_register))
}

pub fn password_reset_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/reset-password", post(reset_password))
}

fn issue_tokens(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id, &user.email)?;
    let refresh_token = keys.sign_refresh(user.id, &user.email)?;
    Ok(AuthResponse {
        success: true,
        access_token,
        refresh_token,
        user: user.into(),
    })
}

/// Shared checks for a new account's email, password and names.
pub(crate) fn validate_new_account(
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> AppResult<()> {
    if email.is_empty() || password.is_empty() || first_name.trim().is_empty() || last_name.trim().is_empty() {
        return Err(AppError::bad_request("All fields are required"));
    }
    if !is_valid_email(email) {
        return Err(AppError::bad_request("Invalid email"));
    }
    validate_password(password)
}

pub(crate) fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Hashes the password and inserts the account, mapping a taken email to 409.
pub(crate) async fn create_account(
    state: &AppState,
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
    role: Role,
) -> AppResult<User> {
    if User::find_by_email(&state.db, email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(password)?;
    let user = User::create(
        &state.db,
        &NewUser {
            email,
            password_hash: &hash,
            first_name,
            last_name,
            role,
        },
    )
    .await?;
    Ok(user)
}

#[instrument(skip(state, meta, payload))]
pub async fn register(
    State(state): State<AppState>,
    meta: RequestMeta,
    AppJson(mut payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
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
        Role::Customer,
    )
    .await?;

    audit::record(
        &state.db,
        AuditEntry::new("user_register")
            .by(user.id, user.role.as_str())
            .details(format!("New customer registered: {} ({})", user.email, user.id)),
        meta,
    )
    .await;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, meta, payload))]
pub async fn login(
    State(state): State<AppState>,
    meta: RequestMeta,
    AppJson(mut payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    payload.email = normalize_email(&payload.email);
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Email and password required"));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(invalid());
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on deactivated account");
        return Err(AppError::Forbidden("Account is deactivated".into()));
    }

    if let Some(expected) = payload.user_type {
        if expected != user.role {
            warn!(user_id = %user.id, role = user.role.as_str(), "login role mismatch");
            return Err(AppError::Forbidden(format!(
                "This account is not authorized as {}",
                expected.as_str()
            )));
        }
    }

    User::touch_last_login(&state.db, user.id).await?;

    audit::record(
        &state.db,
        AuditEntry::new("user_login")
            .by(user.id, user.role.as_str())
            .details(format!(
                "User logged in from {}",
                meta.ip.as_deref().unwrap_or("unknown address")
            )),
        meta,
    )
    .await;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify_refresh(&payload.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("Invalid refresh token".into())
    })?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".into()));
    }

    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, actor, meta), fields(user_id = %actor.id))]
pub async fn logout(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
) -> AppResult<Json<MessageResponse>> {
    audit::record(
        &state.db,
        AuditEntry::new("user_logout")
            .by(actor.id, actor.role.as_str())
            .details(format!("User logged out: {}", actor.email)),
        meta,
    )
    .await;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

#[instrument(skip(state, actor), fields(user_id = %actor.id))]
pub async fn get_me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<MeResponse>> {
    let user = User::find_by_id(&state.db, actor.id)
        .await?
        .ok_or_else(|| AppError::not_found("User profile not found"))?;
    Ok(Json(MeResponse {
        success: true,
        user: user.into(),
    }))
}

#[instrument(skip(state, actor, meta, payload), fields(user_id = %actor.id))]
pub async fn admin_register(
    State(state): State<AppState>,
    actor: Actor,
    meta: RequestMeta,
    AppJson(mut payload): AppJson<AdminRegisterRequest>,
) -> AppResult<(StatusCode, Json<MeResponse>)> {
    actor.require(ADMIN_ONLY)?;

    if !matches!(payload.role, Role::Admin | Role::Staff) {
        return Err(AppError::bad_request("Role must be admin or staff"));
    }
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

    info!(new_user_id = %user.id, role = user.role.as_str(), "account created by admin");
    Ok((
        StatusCode::CREATED,
        Json(MeResponse {
            success: true,
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() {
        return Err(AppError::bad_request("Email is required"));
    }

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::bad_request("No account found with this email"))?;

    let code = otp::generate_otp();
    let expires_at = otp::expiry_from(OffsetDateTime::now_utc());
    repo::insert_otp(&state.db, &email, &code, expires_at).await?;

    let sent = email::send_and_log(
        &state.db,
        state.mailer.as_ref(),
        OutgoingEmail {
            to: user.email.clone(),
            subject: "Password Reset OTP - Kina Resort".into(),
            html: templates::password_reset_otp(&user.full_name, &code, otp::OTP_VALID_MINUTES),
        },
    )
    .await;
    if !sent {
        return Err(anyhow::anyhow!("could not deliver OTP email").into());
    }

    info!(user_id = %user.id, "password reset OTP issued");
    Ok(Json(MessageResponse::new("OTP sent to your email")))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    AppJson(payload): AppJson<VerifyOtpRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    let code = payload.otp.trim();
    if email.is_empty() || code.is_empty() {
        return Err(AppError::bad_request("Email and OTP are required"));
    }

    let record = repo::find_unused_otp(&state.db, &email, code)
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid OTP"))?;

    if otp::is_expired(record.expires_at, OffsetDateTime::now_utc()) {
        return Err(AppError::bad_request("OTP has expired"));
    }

    repo::mark_otp_verified(&state.db, record.id).await?;
    Ok(Json(MessageResponse::new("OTP verified successfully")))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }
    validate_password(&payload.password)?;

    let verified = repo::latest_verified_otp(&state.db, &email).await?;
    let now = OffsetDateTime::now_utc();
    if !verified.is_some_and(|o| otp::within_reset_window(o.verified_at, now)) {
        return Err(AppError::bad_request("Please verify OTP first"));
    }

    let hash = hash_password(&payload.password)?;
    if !User::set_password_by_email(&state.db, &email, &hash).await? {
        return Err(AppError::not_found("User not found"));
    }
    repo::delete_otps_for(&state.db, &email).await?;

    info!(email = %email, "password reset");
    Ok(Json(MessageResponse::new("Password reset successful")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_requires_every_field() {
        let err = validate_new_account("a@kina.example", "longenough", " ", "Reyes").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "All fields are required"));
    }

    #[test]
    fn new_account_rejects_bad_email_and_short_password() {
        assert!(validate_new_account("not-an-email", "longenough", "Ana", "Reyes").is_err());
        let err = validate_new_account("a@kina.example", "short", "Ana", "Reyes").unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.contains("at least 8")));
        assert!(validate_new_account("a@kina.example", "longenough", "Ana", "Reyes").is_ok());
    }

    #[test]
    fn password_length_counts_characters() {
        assert!(validate_password("ñññññññ").is_err());
        assert!(validate_password("ññññññññ").is_ok());
    }
}
