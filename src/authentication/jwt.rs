use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, status::StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::identities::domain::users::{Role, User, UserId};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenClaims {
    sub: UserId,
    role: Role,
    exp: i64,
    iat: i64,
}

impl TokenClaims {
    /// Get the ID of the user that the token claims represent.
    ///
    /// This is the user who made the request.
    pub fn user_id(&self) -> UserId {
        self.sub
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The keys used to sign and verify session tokens.
#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<JwtKeysInner>,
}

struct JwtKeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl JwtKeys {
    /// Create keys from a shared HMAC secret.
    ///
    /// # Arguments
    ///
    /// * `secret` - The secret used to sign tokens with HS256.
    /// * `lifetime` - How long issued tokens stay valid.
    pub fn from_secret(secret: &[u8], lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(JwtKeysInner {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
                lifetime,
            }),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.inner.lifetime
    }

    /// Issue a token for a user.
    pub fn issue(&self, user: &User) -> anyhow::Result<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: user.id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.inner.lifetime).timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.inner.encoding,
        )?)
    }

    pub fn validate(&self, token: &str) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 10;

        jsonwebtoken::decode::<TokenClaims>(token, &self.inner.decoding, &validation)
            .map(|data| data.claims)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for TokenClaims
where
    JwtKeys: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = JwtError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = bearer_token(parts).ok_or_else(|| {
            debug!("Cannot extract token claims from request due to missing authentication token.");

            JwtError::Missing
        })?;

        keys.validate(token).map_err(|error| {
            debug!(?error, "Invalid authentication token received.");

            JwtError::Invalid
        })
    }
}

pub enum JwtError {
    Invalid,
    Missing,
}

impl IntoResponse for JwtError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            Self::Invalid => (StatusCode::UNAUTHORIZED, "Invalid authentication token."),
            Self::Missing => (
                StatusCode::UNAUTHORIZED,
                "No authentication token provided.",
            ),
        };

        let body = Json(json!({
            "message": message,
        }));

        (status, body).into_response()
    }
}
