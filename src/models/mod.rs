//! Domain models for asset-portal
//!
//! This module contains the core domain models used throughout the application.

pub mod asset;
pub mod response;
pub mod token;

// Re-export commonly used types
pub use asset::{Asset, AssetQuery, ListAssetsParams, NewAsset, OrderField, UpdateAsset};
pub use response::ApiResponse;
pub use token::{AuthHeaders, ConsumeOutcome, Principal, Token};
