use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use raceday_storage::models::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WebError;

/// Claims embedded in every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

/// Identity of the operator behind a verified request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
}

/// HS256 signing and verification keys.
#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<JwtKeysInner>,
}

struct JwtKeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiration_secs: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiration_secs: i64) -> Self {
        Self {
            inner: Arc::new(JwtKeysInner {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                expiration_secs,
            }),
        }
    }

    pub fn expiration_secs(&self) -> i64 {
        self.inner.expiration_secs
    }

    pub fn issue(&self, user: &User) -> Result<String, WebError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            exp: now + self.inner.expiration_secs,
            iat: now,
        };

        encode(&Header::default(), &claims, &self.inner.encoding)
            .map_err(|e| WebError::InternalServerError(format!("Token generation failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, WebError> {
        decode::<Claims>(token, &self.inner.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                WebError::Unauthorized
            })
    }
}

/// Reject requests without a valid bearer token; otherwise expose the caller
/// as an [`AuthUser`] request extension.
pub async fn require_auth(
    State(keys): State<JwtKeys>,
    mut request: Request,
    next: Next,
) -> Result<Response, WebError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    let Some(token) = token else {
        tracing::warn!(path = %request.uri().path(), "Missing bearer token");
        return Err(WebError::Unauthorized);
    };

    let claims = keys.verify(token)?;

    request.extensions_mut().insert(AuthUser {
        user_id: claims.sub,
        email: claims.email,
        name: claims.name,
    });

    Ok(next.run(request).await)
}
