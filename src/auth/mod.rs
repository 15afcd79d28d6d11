//! Authentication system for asset-portal
//!
//! This module implements the challenge-response authentication protocol:
//! - Nonce token issuance backed by the database
//! - Signature verification through an external service
//! - The request gate that orders the checks and spends the nonce
//! - Per-client request rate limiting

pub mod gate;
pub mod issuer;
pub mod ratelimit;
pub mod verifier;

pub use gate::{AuthGate, RequestAuthenticator};
pub use issuer::TokenIssuer;
pub use ratelimit::RateLimiter;
pub use verifier::{HttpSignatureVerifier, SignatureVerifier, Verdict};
