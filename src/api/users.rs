//! Administrator endpoints: user management and board totals.

use axum::extract::{Path, State};
use serde::Serialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::response::ApiResponse;
use super::validation::validate_profile_update;
use super::AppJson;
use crate::db::{ProfileUpdate, UserResponse, UserRole};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BoardStats {
    pub users: i64,
    pub job_seekers: usize,
    pub recruiters: usize,
    pub jobs: i64,
    pub applications: i64,
}

/// GET /api/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<UserResponse>>, ApiError> {
    let users = state.users.list().await?;
    Ok(ApiResponse::ok(
        "Users retrieved successfully",
        users.into_iter().map(UserResponse::from).collect(),
    ))
}

/// GET /api/users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let user = state.users.get(&id).await?;
    Ok(ApiResponse::ok("User retrieved successfully", user.into()))
}

/// GET /api/users/role/:role
pub async fn list_by_role(
    State(state): State<Arc<AppState>>,
    Path(role): Path<String>,
) -> Result<ApiResponse<Vec<UserResponse>>, ApiError> {
    let role: UserRole = role
        .parse()
        .map_err(|e: String| ApiError::validation_field("role", e))?;
    let users = state.users.list_by_role(role).await?;
    Ok(ApiResponse::ok(
        "Users retrieved successfully",
        users.into_iter().map(UserResponse::from).collect(),
    ))
}

/// PUT /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(update): AppJson<ProfileUpdate>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    validate_profile_update(&update)?;
    let user = state.users.update_profile(&id, update).await?;
    Ok(ApiResponse::ok("User updated successfully", user.into()))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    if admin.user_id == id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    state.users.delete(&id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}

/// GET /api/admin/stats
pub async fn board_stats(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<BoardStats>, ApiError> {
    let stats = BoardStats {
        users: state.users.count().await?,
        job_seekers: state.users.list_by_role(UserRole::JobSeeker).await?.len(),
        recruiters: state.users.list_by_role(UserRole::Recruiter).await?.len(),
        jobs: state.jobs.count().await?,
        applications: state.applications.count_all().await?,
    };
    Ok(ApiResponse::ok("Statistics retrieved successfully", stats))
}
