use axum::extract::{Path, Query, State};
use serde::Deserialize;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::response::ApiResponse;
use super::AppJson;
use crate::db::{Job, JobDraft, JobFilter, JobSearch, JobSummary};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_hours")]
    pub hours: i64,
}

fn default_recent_hours() -> i64 {
    24
}

/// POST /api/jobs/create
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
    AppJson(draft): AppJson<JobDraft>,
) -> Result<ApiResponse<Job>, ApiError> {
    let job = state.jobs.create(draft, &recruiter).await?;
    Ok(ApiResponse::created("Job posted successfully", job))
}

/// GET /api/jobs/all
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<Vec<JobSummary>>, ApiError> {
    let jobs = state.jobs.list_active().await?;
    Ok(ApiResponse::ok("Active jobs retrieved successfully", jobs))
}

/// GET /api/jobs/search
pub async fn search_jobs(
    State(state): State<Arc<AppState>>,
    Query(search): Query<JobSearch>,
) -> Result<ApiResponse<Vec<JobSummary>>, ApiError> {
    let jobs = state.jobs.search(&search).await?;
    Ok(ApiResponse::ok("Search results retrieved successfully", jobs))
}

/// GET /api/jobs/filter
pub async fn filter_jobs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<JobFilter>,
) -> Result<ApiResponse<Vec<JobSummary>>, ApiError> {
    let jobs = state.jobs.filter(&filter).await?;
    Ok(ApiResponse::ok("Filtered jobs retrieved successfully", jobs))
}

/// GET /api/jobs/recent?hours=N
pub async fn recent_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<ApiResponse<Vec<JobSummary>>, ApiError> {
    if query.hours <= 0 {
        return Err(ApiError::validation_field("hours", "Hours must be positive"));
    }
    let jobs = state.jobs.recent(query.hours).await?;
    Ok(ApiResponse::ok("Recent jobs retrieved successfully", jobs))
}

/// GET /api/jobs/my-jobs
pub async fn my_jobs(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
) -> Result<ApiResponse<Vec<JobSummary>>, ApiError> {
    let jobs = state.jobs.list_by_recruiter(&recruiter.user_id).await?;
    Ok(ApiResponse::ok("Your posted jobs retrieved successfully", jobs))
}

/// GET /api/jobs/:id
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<JobSummary>, ApiError> {
    let job = state.jobs.get_with_count(&id).await?;
    Ok(ApiResponse::ok("Job retrieved successfully", job))
}

/// PUT /api/jobs/update/:id
pub async fn update_job(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
    Path(id): Path<String>,
    AppJson(draft): AppJson<JobDraft>,
) -> Result<ApiResponse<Job>, ApiError> {
    let job = state.jobs.update(&id, draft, &recruiter).await?;
    Ok(ApiResponse::ok("Job updated successfully", job))
}

/// DELETE /api/jobs/delete/:id
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.jobs.delete(&id, &recruiter).await?;
    Ok(ApiResponse::message("Job deleted successfully"))
}

/// PUT /api/jobs/toggle-status/:id
pub async fn toggle_job_status(
    State(state): State<Arc<AppState>>,
    CurrentUser(recruiter): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<Job>, ApiError> {
    let job = state.jobs.toggle_status(&id, &recruiter).await?;
    let message = if job.is_active {
        "Job activated successfully"
    } else {
        "Job deactivated successfully"
    };
    Ok(ApiResponse::ok(message, job))
}
