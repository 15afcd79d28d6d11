//! Database layer for asset-portal
//!
//! This module defines the database trait and SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{Asset, AssetQuery, ConsumeOutcome, Token, UpdateAsset};

/// Database trait for data persistence
///
/// This trait defines all database operations needed by the application.
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    // =========================================================================
    // Nonce token operations
    // =========================================================================

    /// Persist a freshly issued nonce token
    async fn create_token(&self, token: &Token) -> Result<(), DbError>;

    /// Get a nonce token by its value
    async fn get_token(&self, value: &str) -> Result<Option<Token>, DbError>;

    /// Atomically mark a token as used
    ///
    /// The token transitions to used only if it exists, has not been used
    /// before, and has not expired. Exactly one concurrent caller can win;
    /// everyone else learns why they lost through the returned outcome.
    async fn consume_token(&self, value: &str) -> Result<ConsumeOutcome, DbError>;

    // =========================================================================
    // Asset operations
    // =========================================================================

    /// Insert a new asset record
    async fn create_asset(&self, asset: &Asset) -> Result<(), DbError>;

    /// Get an asset by its id
    async fn get_asset_by_id(&self, id: &str) -> Result<Option<Asset>, DbError>;

    /// Get assets matching the given filters
    async fn get_assets(&self, query: &AssetQuery) -> Result<Vec<Asset>, DbError>;

    /// Apply changes to an asset owned by `address`
    ///
    /// Absent fields in `changes` are left untouched. Returns the stored
    /// record after the update, or `DbError::NotFound` when no asset matches
    /// both id and owner.
    async fn update_asset(
        &self,
        id: &str,
        address: &str,
        changes: &UpdateAsset,
    ) -> Result<Asset, DbError>;

    /// Delete an asset owned by `address`
    ///
    /// Returns `DbError::NotFound` when no asset matches both id and owner.
    async fn delete_asset(&self, id: &str, address: &str) -> Result<(), DbError>;
}
