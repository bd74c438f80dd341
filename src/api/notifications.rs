use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use super::auth::CurrentUser;
use super::error::ApiError;
use super::response::ApiResponse;
use super::OptionalJson;
use crate::db::{timestamp, Notification, NotificationType};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedCount {
    pub updated: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestNotificationRequest {
    /// Recipient; defaults to the caller
    pub user_id: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestNotificationResult {
    pub payload: serde_json::Value,
    pub delivered: usize,
}

/// GET /api/notifications/my-notifications
pub async fn my_notifications(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<Notification>>, ApiError> {
    let notifications = state.notifications.list_for_user(&user.user_id).await?;
    Ok(ApiResponse::ok(
        "Notifications retrieved successfully",
        notifications,
    ))
}

/// GET /api/notifications/unread
pub async fn unread(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<Vec<Notification>>, ApiError> {
    let notifications = state.notifications.unread_for_user(&user.user_id).await?;
    Ok(ApiResponse::ok(
        "Unread notifications retrieved successfully",
        notifications,
    ))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<UnreadCount>, ApiError> {
    let unread_count = state.notifications.unread_count(&user.user_id).await?;
    Ok(ApiResponse::ok(
        "Unread count retrieved successfully",
        UnreadCount { unread_count },
    ))
}

/// PUT /api/notifications/mark-as-read/:id
pub async fn mark_as_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<Notification>, ApiError> {
    let notification = state.notifications.mark_read(&id, &user.user_id).await?;
    Ok(ApiResponse::ok("Notification marked as read", notification))
}

/// PUT /api/notifications/mark-all-as-read
pub async fn mark_all_as_read(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<ApiResponse<MarkedCount>, ApiError> {
    let updated = state.notifications.mark_all_read(&user.user_id).await?;
    Ok(ApiResponse::ok(
        "All notifications marked as read",
        MarkedCount { updated },
    ))
}

/// DELETE /api/notifications/delete/:id
pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, ApiError> {
    state.notifications.delete(&id, &user.user_id).await?;
    Ok(ApiResponse::message("Notification deleted successfully"))
}

/// POST /api/notifications/test-notification
///
/// Pushes a GENERAL message straight to a private channel. Nothing is
/// written to the notification log.
pub async fn test_notification(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    OptionalJson(body): OptionalJson<TestNotificationRequest>,
) -> Result<ApiResponse<TestNotificationResult>, ApiError> {
    let request = body.unwrap_or_default();
    let recipient = request.user_id.unwrap_or(user.user_id);
    let payload = json!({
        "type": NotificationType::General,
        "message": request.message.unwrap_or_else(|| "Test notification".to_string()),
        "user_id": recipient,
        "timestamp": timestamp(),
    });

    let delivered = state.hub.send_to_user(&recipient, payload.clone());
    tracing::info!(user_id = %recipient, delivered, "Test notification pushed");
    Ok(ApiResponse::ok(
        "Test notification sent successfully",
        TestNotificationResult { payload, delivered },
    ))
}
