use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::ApiError;
use super::response::ApiResponse;
use super::validation::{validate_login, validate_registration};
use super::AppJson;
use crate::auth::{token::bearer_token, Principal};
use crate::db::{LoginRequest, LoginResponse, RegisterRequest, UserResponse};
use crate::AppState;

/// Resolve a bearer token to a principal, or `None`.
///
/// The unverified subject only picks the candidate account; the token
/// must then pass signature and expiry checks and name that same account.
pub async fn resolve_principal(state: &AppState, token: &str) -> Option<Principal> {
    let subject = state.tokens.extract_identity(token)?;
    let user = match state.users.find_by_email(&subject).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            debug!("Token subject has no account");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "Failed to look up token subject");
            return None;
        }
    };
    let claims = state.tokens.validate(token).ok()?;
    if claims.sub != user.email {
        return None;
    }
    Some(Principal::from(&user))
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
}

/// Resolve the caller and apply the route access table.
///
/// Installed on the `/api` router, so paths are seen without that prefix.
/// The resolved [`Principal`] is stored in request extensions for handlers.
pub async fn access_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let principal = match extract_token(request.headers()) {
        Some(token) => resolve_principal(&state, token).await,
        None => None,
    };

    let path = request.uri().path();
    let path = path.strip_prefix("/api").filter(|p| !p.is_empty()).unwrap_or(path);
    if let Err(denied) = state.policy.evaluate(path, principal.as_ref()) {
        debug!(path = %path, ?denied, "Request denied");
        return ApiError::from(denied).into_response();
    }

    if let Some(principal) = principal {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

/// The authenticated caller. Rejects with 401 when the request carried no
/// usable token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    validate_registration(&request)?;
    let user = state.users.register(request).await?;
    Ok(ApiResponse::created(
        "User registered successfully",
        UserResponse::from(user),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiError> {
    validate_login(&request)?;
    let user = state
        .users
        .authenticate(&request.email, &request.password)
        .await?;
    let issued = state.tokens.issue(&user)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(ApiResponse::ok(
        "Login successful",
        LoginResponse {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
        },
    ))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout() -> ApiResponse<()> {
    ApiResponse::message("Logged out successfully")
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
) -> Result<ApiResponse<UserResponse>, ApiError> {
    let user = state.users.get(&principal.user_id).await?;
    Ok(ApiResponse::ok("Current user details", UserResponse::from(user)))
}
