//! Nonce token issuance
//!
//! Tokens are random, hex-encoded values persisted before they are handed
//! out, so every value a client ever sees is present in the store.

use std::sync::Arc;

use rand::RngCore;
use tracing::error;

use crate::database::Database;
use crate::error::AuthError;
use crate::models::Token;

/// Number of random bytes backing each nonce token
const TOKEN_BYTES: usize = 32;

/// Issues single-use nonce tokens backed by the database
pub struct TokenIssuer<D: Database> {
    db: Arc<D>,
    lifetime: chrono::Duration,
}

impl<D: Database> TokenIssuer<D> {
    /// Create an issuer that stamps tokens with the given lifetime
    pub fn new(db: Arc<D>, lifetime: chrono::Duration) -> Self {
        Self { db, lifetime }
    }

    /// Generate, persist, and return a fresh nonce token
    pub async fn issue(&self) -> Result<Token, AuthError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rngs::OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
            error!(error = %e, "failed to draw randomness for nonce token");
            AuthError::RandomSourceFailure
        })?;

        let token = Token::new(hex::encode(bytes), self.lifetime);

        // Persist before returning; a token the store never saw must not
        // reach a client.
        self.db.create_token(&token).await.map_err(|e| {
            error!(error = %e, "failed to persist nonce token");
            AuthError::TokenPersistenceFailure
        })?;

        Ok(token)
    }
}
