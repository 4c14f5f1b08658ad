use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
};

/// Name of the cookie that carries the session token.
pub const SESSION_COOKIE: &str = "token";

/// Header accepted as a session principal in `Env::Local` only.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload of a session token. Tokens are issued elsewhere; this service only
/// verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The session principal.
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}

/// Session
///
/// The resolved principal of an authorized request. Taking it as a handler
/// argument is what gates the handler behind session validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: String,
}

/// SessionOutcome
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    Authorized(Session),
    Unauthorized(String),
}

/// SessionValidator
///
/// Capability check run before every todo operation. It only decides; writing
/// the 401 is left to the `Session` extractor.
#[async_trait]
pub trait SessionValidator: Send + Sync {
    async fn validate(&self, parts: &Parts) -> SessionOutcome;
}

pub type SessionState = Arc<dyn SessionValidator>;

/// JwtSessionValidator
///
/// Verifies an HS256 session token taken from the `token` cookie or, failing
/// that, from an `Authorization: Bearer` header.
///
/// In `Env::Local` an `x-user-id` header short-circuits verification so the
/// API can be driven by hand during development.
pub struct JwtSessionValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    env: Env,
}

impl JwtSessionValidator {
    pub fn new(secret: &str, env: Env) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            env,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.session_secret, config.env.clone())
    }

    /// Whether the `x-user-id` header is honoured.
    pub fn bypass_enabled(&self) -> bool {
        self.env == Env::Local
    }

    fn dev_bypass(&self, parts: &Parts) -> Option<Session> {
        if !self.bypass_enabled() {
            return None;
        }
        parts
            .headers
            .get(DEV_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|user_id| !user_id.is_empty())
            .map(|user_id| Session {
                user_id: user_id.to_string(),
            })
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, parts: &Parts) -> SessionOutcome {
        // 1. Local Development Bypass Check
        if let Some(session) = self.dev_bypass(parts) {
            return SessionOutcome::Authorized(session);
        }

        // 2. Token Extraction
        let Some(token) = session_token(parts) else {
            return SessionOutcome::Unauthorized("missing session token".to_string());
        };

        // 3. Decode and Validate the Token
        // A token without a subject names nobody.
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) if !data.claims.sub.is_empty() => SessionOutcome::Authorized(Session {
                user_id: data.claims.sub,
            }),
            Ok(_) => SessionOutcome::Unauthorized("invalid session token".to_string()),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => {
                    SessionOutcome::Unauthorized("session expired".to_string())
                }
                _ => SessionOutcome::Unauthorized("invalid session token".to_string()),
            },
        }
    }
}

/// Finds the session token, preferring the cookie over the bearer header.
fn session_token(parts: &Parts) -> Option<&str> {
    let from_cookie = parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
    })
}

/// Resolves the session for a handler that takes `Session` as an argument.
///
/// 1. Dependency Resolution: the validator comes out of application state.
/// 2. Validation: delegated to the `SessionValidator`.
/// 3. Rejection: any unauthorized outcome becomes a 401 carrying the reason.
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let validator = SessionState::from_ref(state);

        match validator.validate(parts).await {
            SessionOutcome::Authorized(session) => Ok(session),
            SessionOutcome::Unauthorized(reason) => {
                tracing::debug!(%reason, uri = %parts.uri, "rejected session");
                Err(ApiError::Unauthorized(reason))
            }
        }
    }
}
