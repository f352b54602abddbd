//! Handlers for `/setup`: first-run bootstrap.
//!
//! These routes are exempt from the setup gate. Creating the initial
//! superuser only works while none exists.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use clubhouse_core::error::CoreError;
use clubhouse_db::models::user::{CreateUser, UserResponse};
use clubhouse_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SetupStatus {
    pub superuser_exists: bool,
    pub pending_migrations: usize,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSuperuserRequest {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

/// GET /api/v1/setup/status
pub async fn status(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let superuser_exists = UserRepo::superuser_exists(&state.pool).await?;
    let pending_migrations = clubhouse_db::pending_migrations(&state.pool).await?;
    Ok(Json(DataResponse {
        data: SetupStatus {
            superuser_exists,
            pending_migrations,
        },
    }))
}

/// POST /api/v1/setup/superuser
pub async fn create_superuser(
    State(state): State<AppState>,
    Json(input): Json<CreateSuperuserRequest>,
) -> AppResult<impl IntoResponse> {
    if UserRepo::superuser_exists(&state.pool).await? {
        state.mark_setup_complete();
        return Err(AppError::Core(CoreError::Conflict(
            "Setup already completed: a superuser exists".into(),
        )));
    }

    input.validate()?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;
    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: input.username.trim().to_string(),
            email: input.email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            is_staff: true,
            is_superuser: true,
        },
    )
    .await?;

    state.mark_setup_complete();
    tracing::info!(user_id = user.id, "Initial superuser created, setup complete");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(user),
        }),
    ))
}
