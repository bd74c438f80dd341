//! Stateless HS256 bearer tokens.
//!
//! A token carries the subject email, the role at issue time and its
//! expiry. There is no server-side session; expiry is the only way a
//! token stops working, and logout is a client-side discard.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::config::{AuthConfig, MAX_TOKEN_TTL_HOURS};
use crate::db::{format_timestamp, User, UserRole};
use crate::error::{BoardError, BoardResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject email
    pub sub: String,
    pub role: UserRole,
    pub iat: i64,
    pub exp: i64,
}

/// Any parse, signature or expiry failure. Callers only learn that the
/// token is unusable.
#[derive(Debug, Error)]
#[error("invalid or expired token")]
pub struct InvalidToken;

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: String,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService").field("ttl", &self.ttl).finish()
    }
}

impl TokenService {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        let hours = config.token_ttl_hours.clamp(1, MAX_TOKEN_TTL_HOURS);
        Self::new(&config.jwt_secret, Duration::hours(hours))
    }

    pub fn issue(&self, user: &User) -> BoardResult<IssuedToken> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> BoardResult<IssuedToken> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| BoardError::Internal("Token lifetime out of range".to_string()))?;
        let claims = Claims {
            sub: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| BoardError::Internal(format!("Failed to sign token: {}", e)))?;
        Ok(IssuedToken {
            token,
            expires_at: format_timestamp(expires),
        })
    }

    /// Verify signature and expiry. Fails closed.
    pub fn validate(&self, token: &str) -> Result<Claims, InvalidToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "Rejected bearer token");
                InvalidToken
            })
    }

    /// Read the subject without checking signature or expiry.
    ///
    /// Only good for picking the candidate account; the token must still
    /// pass [`TokenService::validate`] before it is trusted.
    pub fn extract_identity(&self, token: &str) -> Option<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();

        decode::<Claims>(token, &self.decoding, &validation)
            .ok()
            .map(|data| data.claims.sub)
    }
}

/// Pull the token out of an `Authorization: Bearer ...` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
