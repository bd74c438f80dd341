use axum::extract::{Path, State};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::response::ApiResponse;
use super::{AppJson, OptionalJson};
use crate::db::{ApplicationView, ApplyRequest, UpdateStatusRequest};
use crate::AppState;

/// POST /api/applications/apply/:job_id
///
/// The body is optional; an empty request applies with the profile resume.
pub async fn apply(
    State(state): State<Arc<AppState>>,
    CurrentUser(seeker): CurrentUser,
    Path(job_id): Path<String>,
    OptionalJson(body): OptionalJson<ApplyRequest>,
) -> Result<ApiResponse<ApplicationView>, ApiError> {
    let request = body.unwrap_or_default();
    let application = state.applications.apply(&job_id, &seeker, request).await?;
    Ok(ApiResponse::created(
        "Application submitted successfully",
        application,
    ))
}

/// GET /api/applications/job/:job_id
pub async fn list_for_job(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
    Path(job_id): Path<String>,
) -> Result<ApiResponse<Vec<ApplicationView>>, ApiError> {
    let applications = state.applications.list_for_job(&job_id, &recruiter).await?;
    Ok(ApiResponse::ok(
        "Applications retrieved successfully",
        applications,
    ))
}

/// GET /api/applications/my-applications
pub async fn my_applications(
    State(state): State<Arc<AppState>>,
    CurrentUser(seeker): CurrentUser,
) -> Result<ApiResponse<Vec<ApplicationView>>, ApiError> {
    let applications = state.applications.list_for_applicant(&seeker).await?;
    Ok(ApiResponse::ok(
        "Your applications retrieved successfully",
        applications,
    ))
}

/// GET /api/applications/:id
pub async fn get_application(
    State(state): State<Arc<AppState>>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<ApplicationView>, ApiError> {
    let application = state.applications.get_for_viewer(&id, &viewer).await?;
    Ok(ApiResponse::ok(
        "Application retrieved successfully",
        application,
    ))
}

/// PUT /api/applications/update-status/:id
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateStatusRequest>,
) -> Result<ApiResponse<ApplicationView>, ApiError> {
    let application = state
        .applications
        .update_status(&id, request, &recruiter)
        .await?;
    Ok(ApiResponse::ok(
        "Application status updated successfully",
        application,
    ))
}

/// DELETE /api/applications/withdraw/:id
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    CurrentUser(seeker): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.applications.withdraw(&id, &seeker).await?;
    Ok(ApiResponse::message("Application withdrawn successfully"))
}

/// GET /api/applications/stats/:job_id
pub async fn stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
    Path(job_id): Path<String>,
) -> Result<ApiResponse<BTreeMap<String, i64>>, ApiError> {
    let stats = state.applications.stats(&job_id, &recruiter).await?;
    Ok(ApiResponse::ok(
        "Application statistics retrieved successfully",
        stats,
    ))
}
