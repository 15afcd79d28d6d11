//! Nonce token domain models
//!
//! This module defines the single-use nonce credential and the header
//! bundle a client presents to spend it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Single-use nonce token stored in the database
///
/// The raw random value doubles as the lookup key; the client signs it
/// and echoes it back in the `X-Message` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Raw nonce value, hex-encoded, unique
    #[serde(rename = "token")]
    pub value: String,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// Instant after which the token is no longer spendable
    pub expires_at: DateTime<Utc>,

    /// Whether the token has been consumed; set true exactly once
    pub used: bool,
}

impl Token {
    /// Create a fresh token expiring `lifetime` from now
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            created_at: now,
            expires_at: now + lifetime,
            used: false,
        }
    }

    /// Override the expiry instant
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = expires_at;
        self
    }

    /// Check if the token is still spendable at this instant
    ///
    /// Advisory only: the race-free check happens inside the store's
    /// conditional consume.
    pub fn is_valid(&self) -> bool {
        !self.used && Utc::now() <= self.expires_at
    }
}

/// Outcome of the atomic consume operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This caller spent the token; no other caller can
    Consumed,
    /// The token was already spent
    AlreadyUsed,
    /// The token's expiry had passed
    Expired,
    /// No such token was ever issued
    NotFound,
}

/// Credential bundle presented on a protected request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthHeaders {
    /// Claimed signer address (`X-Address`)
    pub address: String,

    /// Signature over the message (`X-Signature`)
    pub signature: String,

    /// Previously issued nonce value (`X-Message`)
    pub message: String,
}

impl AuthHeaders {
    /// Create a header bundle
    pub fn new(
        address: impl Into<String>,
        signature: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            signature: signature.into(),
            message: message.into(),
        }
    }

    /// All three headers present and non-empty
    pub fn is_complete(&self) -> bool {
        !self.address.is_empty() && !self.signature.is_empty() && !self.message.is_empty()
    }
}

/// Authenticated principal attached to the request after a successful
/// handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Wallet address that proved possession of its key
    pub address: String,
}
