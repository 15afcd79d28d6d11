//! HTTP middleware for asset-portal
//!
//! This module provides middleware layers for:
//! - Wallet authentication over the nonce handshake headers
//! - Per-IP request rate limiting

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::{RateLimiter, RequestAuthenticator};
use crate::database::Database;
use crate::error::AuthError;
use crate::models::{ApiResponse, AuthHeaders, Principal};

/// Header carrying the claimed wallet address
pub const X_ADDRESS: &str = "x-address";

/// Header carrying the signature over the nonce
pub const X_SIGNATURE: &str = "x-signature";

/// Header echoing the nonce obtained from `/nonce`
pub const X_MESSAGE: &str = "x-message";

/// Authenticated wallet extension for requests
#[derive(Clone, Debug)]
pub struct AuthenticatedWallet(pub Principal);

/// Pull the handshake headers out of a request
///
/// Missing or non-UTF-8 headers come back as empty strings; completeness
/// is judged downstream.
pub fn extract_auth_headers(headers: &HeaderMap) -> AuthHeaders {
    let value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };

    AuthHeaders::new(value(X_ADDRESS), value(X_SIGNATURE), value(X_MESSAGE))
}

/// Authentication middleware function
///
/// This middleware:
/// 1. Extracts the X-Address/X-Signature/X-Message headers
/// 2. Runs the nonce handshake under the configured policy
/// 3. Adds the authenticated wallet to the request extensions
pub async fn auth_middleware<D: Database + 'static>(
    State(authenticator): State<Arc<RequestAuthenticator<D>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthRejection> {
    let headers = extract_auth_headers(request.headers());

    let principal = authenticator
        .authenticate(&headers)
        .await
        .map_err(AuthRejection::from_error)?;

    request
        .extensions_mut()
        .insert(AuthenticatedWallet(principal));

    Ok(next.run(request).await)
}

/// Rate limiting middleware function
///
/// Counts each request against its source IP and rejects the remainder of
/// the window once the allowance is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.allow(addr.ip()) {
        let message = format!(
            "Too many requests: max is {} per second",
            limiter.max_requests()
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ApiResponse::error(message)),
        )
            .into_response();
    }

    next.run(request).await
}

/// Authentication failure response
pub struct AuthRejection {
    status: StatusCode,
    message: String,
}

impl AuthRejection {
    /// Map a handshake failure onto a status code and client message
    ///
    /// Rejections of the credential itself are 401; the service being
    /// unable to judge the credential is 503.
    fn from_error(error: AuthError) -> Self {
        let status = match error {
            AuthError::MissingHeaders
            | AuthError::UnknownToken
            | AuthError::TokenExpiredOrUsed
            | AuthError::SignatureInvalid(_) => StatusCode::UNAUTHORIZED,
            AuthError::VerifierUnavailable
            | AuthError::StoreUnavailable
            | AuthError::ConsumeFailure => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::RandomSourceFailure | AuthError::TokenPersistenceFailure => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::error(self.message))).into_response()
    }
}
