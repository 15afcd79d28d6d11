//! Request authentication gate
//!
//! Walks a presented credential bundle through the handshake in a fixed
//! order: headers, token lookup, validity precheck, signature verdict,
//! atomic consume. The signature must pass before the nonce is spent, and
//! the nonce must be spent before any business logic runs.

use std::sync::Arc;

use tracing::{error, warn};

use crate::auth::verifier::SignatureVerifier;
use crate::database::Database;
use crate::error::AuthError;
use crate::models::token::{AuthHeaders, ConsumeOutcome, Principal};

/// Authenticates requests against the token store and the external verifier
pub struct AuthGate<D: Database> {
    db: Arc<D>,
    verifier: Arc<dyn SignatureVerifier>,
}

impl<D: Database> AuthGate<D> {
    /// Create a gate over a token store and a signature verifier
    pub fn new(db: Arc<D>, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { db, verifier }
    }

    /// Run the full handshake for one request
    ///
    /// Returns the authenticated principal, or the first failure in
    /// handshake order. The nonce is only consumed after the signature
    /// verdict is positive, so a failed request leaves it spendable.
    pub async fn authenticate(&self, headers: &AuthHeaders) -> Result<Principal, AuthError> {
        if !headers.is_complete() {
            return Err(AuthError::MissingHeaders);
        }

        let token = match self.db.get_token(&headers.message).await {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "token lookup failed");
                return Err(AuthError::StoreUnavailable);
            }
        };

        let Some(token) = token else {
            return Err(AuthError::UnknownToken);
        };

        // Advisory precheck; the consume below re-checks under the store's
        // atomicity and remains the only authority on single use.
        if !token.is_valid() {
            return Err(AuthError::TokenExpiredOrUsed);
        }

        let verdict = match self
            .verifier
            .verify(&headers.message, &headers.address, &headers.signature)
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                error!(error = %e, "signature verifier unreachable");
                return Err(AuthError::VerifierUnavailable);
            }
        };

        if !verdict.ok {
            return Err(AuthError::SignatureInvalid(verdict.message));
        }

        let outcome = match self.db.consume_token(&token.value).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "token consume failed");
                return Err(AuthError::ConsumeFailure);
            }
        };

        match outcome {
            ConsumeOutcome::Consumed => Ok(Principal {
                address: headers.address.clone(),
            }),
            ConsumeOutcome::NotFound => Err(AuthError::UnknownToken),
            ConsumeOutcome::AlreadyUsed | ConsumeOutcome::Expired => {
                warn!(
                    token = %token.value,
                    "token lost the consume race or expired in flight"
                );
                Err(AuthError::TokenExpiredOrUsed)
            }
        }
    }
}

/// Authentication policy selected once at startup
///
/// When disabled, every request passes with whatever address it claims;
/// no token store or verifier round trips happen at all.
pub enum RequestAuthenticator<D: Database> {
    /// Accept every request unauthenticated
    Disabled,
    /// Run the full handshake
    Enforced(AuthGate<D>),
}

impl<D: Database> RequestAuthenticator<D> {
    /// Authenticate one request under the configured policy
    pub async fn authenticate(&self, headers: &AuthHeaders) -> Result<Principal, AuthError> {
        match self {
            Self::Disabled => Ok(Principal {
                address: headers.address.clone(),
            }),
            Self::Enforced(gate) => gate.authenticate(headers).await,
        }
    }
}
