//! Handlers for `/users` (own profile, user management, permission grants).
//!
//! Everything except `/users/me` requires a superuser via [`RequireAdmin`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_core::permissions::validate_codename;
use clubhouse_core::types::DbId;
use clubhouse_db::models::user::{CreateUser, UpdateUser, UserResponse};
use clubhouse_db::repositories::{PermissionRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{not_found, AppError, AppResult};
use crate::middleware::permissions::Principal;
use crate::middleware::rbac::RequireAdmin;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Request body for `POST /users/{id}/reset-password`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: String,
}

/// Body of `PUT /users/{id}/permissions`.
#[derive(Debug, Deserialize)]
pub struct PermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub user_id: DbId,
    pub is_superuser: bool,
    pub permissions: Vec<String>,
}

/// The caller plus their effective grants.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub permissions: Vec<String>,
}

pub(crate) fn hash_checked(password: &str) -> AppResult<String> {
    validate_password_strength(password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    hash_password(password).map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/users/me
pub async fn me(State(state): State<AppState>, principal: Principal) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, principal.user_id)
        .await?
        .ok_or_else(|| not_found("User", principal.user_id))?;
    Ok(Json(DataResponse {
        data: MeResponse {
            user: UserResponse::from(user),
            permissions: principal.granted(),
        },
    }))
}

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> AppResult<impl IntoResponse> {
    let users: Vec<UserResponse> = UserRepo::list(&state.pool)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect();
    Ok(Json(DataResponse { data: users }))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let password_hash = hash_checked(&input.password)?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.trim().to_string(),
            email: input.email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            is_staff: input.is_staff,
            is_superuser: input.is_superuser,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, created_by = admin.user_id, "User created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// PUT /api/v1/users/{id}
///
/// A superuser cannot remove their own superuser flag or deactivate
/// themselves; that would lock the last admin out.
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUser>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    if id == admin.user_id && (input.is_superuser == Some(false) || input.is_active == Some(false))
    {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot revoke your own admin access".into(),
        )));
    }

    let user = UserRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("User", id))?;

    if !user.is_active {
        SessionRepo::revoke_user(&state.pool, id).await?;
    }
    tracing::info!(user_id = id, updated_by = admin.user_id, "User updated");
    Ok(Json(DataResponse {
        data: UserResponse::from(user),
    }))
}

/// DELETE /api/v1/users/{id}
///
/// Soft delete: deactivates the account and revokes its sessions.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if id == admin.user_id {
        return Err(AppError::Core(CoreError::Validation(
            "You cannot deactivate your own account".into(),
        )));
    }
    if !UserRepo::deactivate(&state.pool, id).await? {
        return Err(not_found("User", id));
    }
    SessionRepo::revoke_user(&state.pool, id).await?;
    tracing::info!(user_id = id, deactivated_by = admin.user_id, "User deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<ResetPasswordRequest>,
) -> AppResult<StatusCode> {
    let password_hash = hash_checked(&input.new_password)?;
    if !UserRepo::update_password(&state.pool, id, &password_hash).await? {
        return Err(not_found("User", id));
    }
    SessionRepo::revoke_user(&state.pool, id).await?;
    tracing::info!(user_id = id, reset_by = admin.user_id, "Password reset");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/users/{id}/permissions
pub async fn get_permissions(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;
    let permissions = PermissionRepo::list_for_user(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: PermissionsResponse {
            user_id: id,
            is_superuser: user.is_superuser,
            permissions,
        },
    }))
}

/// PUT /api/v1/users/{id}/permissions
///
/// Replaces the full grant list.
pub async fn replace_permissions(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<PermissionsRequest>,
) -> AppResult<impl IntoResponse> {
    for codename in &input.permissions {
        validate_codename(codename)?;
    }
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("User", id))?;

    let permissions = PermissionRepo::replace(&state.pool, id, &input.permissions).await?;
    tracing::info!(
        user_id = id,
        granted = permissions.len(),
        changed_by = admin.user_id,
        "Permissions replaced"
    );
    Ok(Json(DataResponse {
        data: PermissionsResponse {
            user_id: id,
            is_superuser: user.is_superuser,
            permissions,
        },
    }))
}
