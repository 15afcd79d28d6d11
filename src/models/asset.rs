//! Asset domain models and input validation
//!
//! This module defines the wallet-owned asset record, the request payloads
//! that create and modify it, and the listing filters. Validation rules and
//! user-facing messages live in [`crate::error::ValidationError`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Maximum description length, counted in characters
pub const MAX_DESCRIPTION_LENGTH: usize = 1000;

/// Maximum accepted upload size in bytes (5MB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Maximum (and default) page size for asset listings
pub const MAX_PAGE_SIZE: i64 = 100;

/// Bitcoin-style Base58 alphabet: no 0, O, I, or l
const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// HTML tag prefixes rejected inside descriptions, matched case-insensitively
const FORBIDDEN_TAGS: &[&str] = &[
    "<script", "<iframe", "<object", "<embed", "<form", "<input", "<img", "<svg", "<style",
    "<link", "<base", "<meta", "<frame",
];

/// A wallet-owned asset record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Client-chosen identifier, Base58, unique
    pub id: String,

    /// Owning wallet address
    pub address: String,

    /// Free-form description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Image URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Social links, name to URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social: Option<HashMap<String, String>>,

    /// When the record was created
    pub created_at: DateTime<Utc>,

    /// When the record was last modified
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating an asset
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewAsset {
    /// Client-chosen Base58 identifier
    #[serde(default)]
    pub id: String,

    /// Free-form description
    pub description: Option<String>,

    /// Image URL
    pub image: Option<String>,

    /// Social links, name to URL
    pub social: Option<HashMap<String, String>>,
}

impl NewAsset {
    /// Validate the payload against the asset field rules
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_id(&self.id)?;
        validate_image(self.image.as_deref())?;
        validate_description(self.description.as_deref())?;
        validate_social(self.social.as_ref())?;
        Ok(())
    }
}

/// Payload for a partial asset update
///
/// Absent fields are left untouched by the update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UpdateAsset {
    /// Free-form description
    pub description: Option<String>,

    /// Image URL
    pub image: Option<String>,

    /// Social links, name to URL
    pub social: Option<HashMap<String, String>>,
}

impl UpdateAsset {
    /// Validate the payload against the asset field rules
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_image(self.image.as_deref())?;
        validate_description(self.description.as_deref())?;
        validate_social(self.social.as_ref())?;
        Ok(())
    }
}

/// Whitelisted ordering columns for asset listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    /// Order by asset id
    Id,
    /// Order by owning address
    Address,
    /// Order by creation time
    #[default]
    CreatedAt,
}

impl OrderField {
    /// The column name this ordering maps to
    pub fn column(&self) -> &'static str {
        match self {
            OrderField::Id => "id",
            OrderField::Address => "address",
            OrderField::CreatedAt => "created_at",
        }
    }
}

impl std::str::FromStr for OrderField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(OrderField::Id),
            "address" => Ok(OrderField::Address),
            "created_at" => Ok(OrderField::CreatedAt),
            _ => Err(ValidationError::InvalidOrderField),
        }
    }
}

/// Raw listing parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAssetsParams {
    /// Filter by owning address
    pub address: Option<String>,

    /// Filter by asset id
    pub id: Option<String>,

    /// Ordering column
    pub order: Option<String>,

    /// Sort direction; descending when false
    pub ascending: Option<bool>,

    /// Page size, capped at [`MAX_PAGE_SIZE`]
    pub limit: Option<i64>,

    /// Rows to skip
    pub offset: Option<i64>,
}

impl ListAssetsParams {
    /// Validate and normalize into a query the store can execute
    pub fn validate(self) -> Result<AssetQuery, ValidationError> {
        if let Some(id) = &self.id {
            validate_id(id)?;
        }
        if let Some(address) = &self.address {
            if address.len() != 48 {
                return Err(ValidationError::InvalidAddress);
            }
            if !address.bytes().all(|b| b.is_ascii_alphanumeric()) {
                return Err(ValidationError::NonAlphanumericAddress);
            }
        }
        let order = match self.order.as_deref() {
            Some(raw) => Some(raw.parse::<OrderField>()?),
            None => None,
        };
        let limit = match self.limit {
            Some(limit) if limit <= MAX_PAGE_SIZE && limit >= 0 => limit,
            _ => MAX_PAGE_SIZE,
        };

        Ok(AssetQuery {
            address: self.address,
            id: self.id,
            order,
            ascending: self.ascending.unwrap_or(true),
            limit,
            offset: self.offset.unwrap_or(0).max(0),
        })
    }
}

/// Validated listing query executed by the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetQuery {
    /// Filter by owning address
    pub address: Option<String>,

    /// Filter by asset id
    pub id: Option<String>,

    /// Ordering column; unordered when absent
    pub order: Option<OrderField>,

    /// Sort direction
    pub ascending: bool,

    /// Page size
    pub limit: i64,

    /// Rows to skip
    pub offset: i64,
}

/// Validate a client-chosen asset id
pub fn validate_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() {
        return Err(ValidationError::MissingId);
    }
    if !is_base58(id) {
        return Err(ValidationError::InvalidId);
    }
    Ok(())
}

/// Check that every byte belongs to the Base58 alphabet
pub fn is_base58(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| BASE58_ALPHABET.contains(&b))
}

fn validate_image(image: Option<&str>) -> Result<(), ValidationError> {
    if let Some(image) = image {
        if url::Url::parse(image).is_err() {
            return Err(ValidationError::InvalidImageUrl);
        }
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<(), ValidationError> {
    if let Some(description) = description {
        if description.chars().count() > MAX_DESCRIPTION_LENGTH {
            return Err(ValidationError::DescriptionTooLong(MAX_DESCRIPTION_LENGTH));
        }
        if contains_forbidden_tag(description) {
            return Err(ValidationError::MaliciousDescription);
        }
    }
    Ok(())
}

fn validate_social(social: Option<&HashMap<String, String>>) -> Result<(), ValidationError> {
    if let Some(social) = social {
        for (name, link) in social {
            if url::Url::parse(link).is_err() {
                return Err(ValidationError::InvalidSocialUrl(name.clone()));
            }
        }
    }
    Ok(())
}

fn contains_forbidden_tag(s: &str) -> bool {
    let lowered = s.to_lowercase();
    FORBIDDEN_TAGS.iter().any(|tag| lowered.contains(tag))
}
