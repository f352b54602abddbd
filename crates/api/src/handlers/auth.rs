//! Handlers for `/auth` (login, refresh, logout).

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use clubhouse_core::error::CoreError;
use clubhouse_db::models::session::NewSession;
use clubhouse_db::models::user::{User, UserResponse};
use clubhouse_db::repositories::{SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{generate_access_token, generate_refresh_token, hash_refresh_token};
use crate::auth::password::verify_password;
use crate::handlers::users::hash_checked;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Consecutive failures before the account is locked.
const MAX_FAILED_ATTEMPTS: i32 = 5;

const LOCK_DURATION_MINS: i64 = 15;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_username(&state.pool, input.username.trim())
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if user.locked_until.is_some_and(|until| until > Utc::now()) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is temporarily locked. Try again later.".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if user.failed_login_count + 1 >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, "Account locked after repeated failed logins");
        }
        return Err(invalid_credentials());
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    SessionRepo::purge_dead(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "User logged in");

    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok(Json(issue_tokens(&state, user, user_agent).await?))
}

/// POST /api/v1/auth/refresh
///
/// Refresh tokens are single use. Presenting a token that was already spent
/// revokes every session of its owner.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let Some(session) = SessionRepo::spend(&state.pool, &token_hash).await? else {
        if let Some(user_id) = SessionRepo::was_spent(&state.pool, &token_hash).await? {
            let revoked = SessionRepo::revoke_user(&state.pool, user_id).await?;
            tracing::warn!(user_id, revoked, "Refresh token replayed, sessions revoked");
        }
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        )));
    };

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    tracing::debug!(user_id = user.id, session_id = session.id, "Session refreshed");
    Ok(Json(issue_tokens(&state, user, session.user_agent).await?))
}

/// POST /api/v1/auth/logout
///
/// Revokes every session of the caller.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, revoked, "User logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/password
///
/// Changes the caller's own password. Every session is closed afterwards,
/// so other devices have to log in again.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    let current_ok = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_ok {
        return Err(AppError::Core(CoreError::Validation(
            "Current password is incorrect".into(),
        )));
    }
    if input.new_password == input.current_password {
        return Err(AppError::Core(CoreError::Validation(
            "New password must differ from the current one".into(),
        )));
    }

    let password_hash = hash_checked(&input.new_password)?;
    UserRepo::update_password(&state.pool, user.id, &password_hash).await?;
    let revoked = SessionRepo::revoke_user(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, revoked, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

/// Create access + refresh tokens and persist the session.
pub(crate) async fn issue_tokens(
    state: &AppState,
    user: User,
    user_agent: Option<String>,
) -> AppResult<AuthResponse> {
    let jwt = &state.config.jwt;
    let access_token = generate_access_token(user.id, user.role(), jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let (refresh_plaintext, refresh_hash) = generate_refresh_token();
    SessionRepo::open(
        &state.pool,
        &NewSession {
            user_id: user.id,
            token_hash: refresh_hash,
            user_agent,
            expires_at: Utc::now() + chrono::Duration::days(jwt.refresh_token_expiry_days),
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh_plaintext,
        expires_in: jwt.access_token_expiry_mins * 60,
        user: UserResponse::from(user),
    })
}
