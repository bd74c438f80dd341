mod applications;
pub mod auth;
pub mod error;
mod jobs;
pub mod metrics;
mod notifications;
pub mod response;
mod users;
pub mod validation;
mod ws;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServerConfig;
use crate::AppState;
use error::ApiError;

/// JSON body extractor whose rejections use the standard failure envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// JSON body that may be left out entirely.
///
/// An empty body yields `None`. A body that is present must be well-formed
/// JSON sent as `application/json`, otherwise the request is rejected.
pub struct OptionalJson<T>(pub Option<T>);

fn has_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|content_type| {
            let essence = content_type.split(';').next().unwrap_or("").trim();
            essence.eq_ignore_ascii_case("application/json") || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = has_json_content_type(req.headers());
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self(None));
        }
        if !is_json {
            return Err(ApiError::bad_request(
                "Expected request with `Content-Type: application/json`",
            ));
        }
        let axum::Json(value) = axum::Json::<T>::from_bytes(&bytes)?;
        Ok(Self(Some(value)))
    }
}

pub fn create_router(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let job_routes = Router::new()
        .route("/create", post(jobs::create_job))
        .route("/all", get(jobs::list_jobs))
        .route("/search", get(jobs::search_jobs))
        .route("/filter", get(jobs::filter_jobs))
        .route("/recent", get(jobs::recent_jobs))
        .route("/my-jobs", get(jobs::my_jobs))
        .route("/:id", get(jobs::get_job))
        .route("/update/:id", put(jobs::update_job))
        .route("/delete/:id", delete(jobs::delete_job))
        .route("/toggle-status/:id", put(jobs::toggle_job_status));

    let application_routes = Router::new()
        .route("/apply/:job_id", post(applications::apply))
        .route("/job/:job_id", get(applications::list_for_job))
        .route("/my-applications", get(applications::my_applications))
        .route("/:id", get(applications::get_application))
        .route("/update-status/:id", put(applications::update_status))
        .route("/withdraw/:id", delete(applications::withdraw))
        .route("/stats/:job_id", get(applications::stats));

    let notification_routes = Router::new()
        .route("/my-notifications", get(notifications::my_notifications))
        .route("/unread", get(notifications::unread))
        .route("/unread-count", get(notifications::unread_count))
        .route("/mark-as-read/:id", put(notifications::mark_as_read))
        .route("/mark-all-as-read", put(notifications::mark_all_as_read))
        .route("/delete/:id", delete(notifications::delete_notification))
        .route("/test-notification", post(notifications::test_notification));

    // Every /api route passes through the access table
    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/jobs", job_routes)
        .nest("/applications", application_routes)
        .nest("/notifications", notification_routes)
        // Admin
        .route("/users", get(users::list_users))
        .route("/users/:id", get(users::get_user))
        .route("/users/:id", put(users::update_user))
        .route("/users/:id", delete(users::delete_user))
        .route("/users/role/:role", get(users::list_by_role))
        .route("/admin/stats", get(users::board_stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::access_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::metrics_endpoint))
        .route("/ws/notifications", get(ws::notifications_ws))
        .nest("/api", api_routes)
        .route_layer(middleware::from_fn(metrics::metrics_middleware))
        .layer(cors_layer(&state.config.server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if config.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn health_check() -> &'static str {
    "OK"
}
