//! JWT authentication for write requests.
//!
//! Reads (GET, HEAD, OPTIONS) pass through anonymously. Every other method
//! needs `Authorization: Bearer <jwt>` signed with the shared HS256 secret;
//! on success a [`WriteContext`] (principal plus the optional
//! `PDC-Change-Comment` header) is inserted as a request extension.

use axum::{
    extract::Request,
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use pdc_core::{
    error::PdcError,
    principal::{JwtClaims, Principal},
    service::WriteContext,
};

use crate::error::AppError;

pub const CHANGE_COMMENT_HEADER: &str = "pdc-change-comment";

#[derive(Clone)]
pub struct JwtConfig {
    key: DecodingKey,
    validation: Validation,
}

impl JwtConfig {
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // `exp` is checked when present but not demanded.
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn principal(&self, token: &str) -> Result<Principal, PdcError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| PdcError::Unauthorized(format!("Invalid token: {e}.")))?;
        Principal::from_jwt_claims(&data.claims)
    }
}

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn bearer(request: &Request) -> Result<&str, PdcError> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            PdcError::Unauthorized("Authentication credentials were not provided.".into())
        })
}

pub async fn jwt_auth(
    Extension(config): Extension<JwtConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_read(request.method()) {
        return next.run(request).await;
    }

    let principal = match bearer(&request).and_then(|token| config.principal(token)) {
        Ok(principal) => principal,
        Err(err) => return AppError(err).into_response(),
    };
    let comment = request
        .headers()
        .get(CHANGE_COMMENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    tracing::debug!(actor = %principal.actor_id, method = %request.method(), "authenticated write");
    request
        .extensions_mut()
        .insert(WriteContext::new(principal, comment));
    next.run(request).await
}
