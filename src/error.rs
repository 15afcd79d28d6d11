//! Application error types for asset-portal
//!
//! This module defines common error types used throughout the application.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Authentication-related errors
///
/// The variants mirror the rejection causes of the challenge-response
/// protocol. Every variant is terminal for the request that triggered it;
/// nothing here is retried internally.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// One or more of the address/signature/message headers absent or empty
    #[error("Missing authentication headers")]
    MissingHeaders,

    /// Presented message was never issued as a nonce
    #[error("Message was not generated with /nonce")]
    UnknownToken,

    /// Nonce found but already consumed or past its expiry
    #[error("Invalid or expired token")]
    TokenExpiredOrUsed,

    /// Verifier reached and returned a negative verdict
    #[error("Invalid authentication: {0}")]
    SignatureInvalid(String),

    /// Network, timeout, or decode failure calling the verifier
    #[error("Cannot verify signature now")]
    VerifierUnavailable,

    /// Token store unreachable or erroring
    #[error("Cannot verify the token")]
    StoreUnavailable,

    /// Store failed while marking the winning token as used
    #[error("Failed to mark token as used")]
    ConsumeFailure,

    /// The system random source failed during nonce generation
    #[error("error generating token")]
    RandomSourceFailure,

    /// Freshly generated nonce could not be durably recorded
    #[error("error creating token in database")]
    TokenPersistenceFailure,
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection-level error from the async wrapper
    #[error("Database connection error: {0}")]
    Connection(String),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<tokio_rusqlite::Error> for DbError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => DbError::Sqlite(e),
            other => DbError::Connection(other.to_string()),
        }
    }
}

/// Signature verifier client errors
///
/// A verdict of `ok=false` is not an error; these cover only the cases
/// where no verdict could be obtained at all.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Request to the verifier failed (network, timeout, or body decode)
    #[error("Verifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Verifier unreachable for a reason known locally
    #[error("Verifier unreachable: {0}")]
    Unreachable(String),
}

/// Object storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload request failed in transit
    #[error("Storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Storage service refused the upload
    #[error("Storage rejected upload: HTTP {0}")]
    UploadRejected(u16),

    /// Upload URL could not be constructed
    #[error("Invalid storage endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Request input validation errors
///
/// Messages are user-facing and returned verbatim in 422 responses.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Asset id missing
    #[error("id is required")]
    MissingId,

    /// Asset id contains characters outside the Base58 alphabet
    #[error("id must be a valid Base58 string")]
    InvalidId,

    /// Description longer than the permitted character count
    #[error("description exceeds the maximum length of {0} characters")]
    DescriptionTooLong(usize),

    /// Description carries embedded HTML tags
    #[error("description contains malicious content")]
    MaliciousDescription,

    /// Image field is not an absolute URL
    #[error("image must be a valid URL")]
    InvalidImageUrl,

    /// A social link value is not an absolute URL
    #[error("social URL for '{0}' is invalid")]
    InvalidSocialUrl(String),

    /// Address filter has the wrong length
    #[error("address is invalid")]
    InvalidAddress,

    /// Address filter contains non-alphanumeric characters
    #[error("address must only contain alphanumeric characters")]
    NonAlphanumericAddress,

    /// Order field outside the whitelist
    #[error("order fields are: id, address, and created_at")]
    InvalidOrderField,

    /// Upload form carried no file part
    #[error("file is required")]
    MissingFile,

    /// Uploaded file exceeds the size cap
    #[error("file size exceeds the maximum allowed limit of {0}MB")]
    FileTooLarge(usize),

    /// Uploaded bytes are not one of the accepted image formats
    #[error("invalid file type; only JPEG, PNG, and GIF are allowed")]
    UnsupportedFileType,
}

/// Application-level error type
///
/// This is the main error type used throughout the application.
/// It aggregates all domain-specific error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Signature verification transport error
    #[error("Verification error: {0}")]
    Verify(#[from] VerifyError),

    /// Object storage error
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input validation error
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
