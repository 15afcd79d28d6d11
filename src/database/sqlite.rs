//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{Asset, AssetQuery, ConsumeOutcome, Token, UpdateAsset};

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for in-memory database or a file path for persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        // Run migrations
        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    // =========================================================================
    // Nonce token operations
    // =========================================================================

    async fn create_token(&self, token: &Token) -> Result<(), DbError> {
        let value = token.value.clone();
        let created_at = token.created_at.to_rfc3339();
        let expires_at = token.expires_at.to_rfc3339();
        let used = token.used as i64;

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO nonce_tokens (token, created_at, expires_at, used)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    rusqlite::params![value, created_at, expires_at, used],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn get_token(&self, value: &str) -> Result<Option<Token>, DbError> {
        let value = value.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT token, created_at, expires_at, used
                    FROM nonce_tokens
                    WHERE token = ?1
                    "#,
                )?;

                let result = stmt
                    .query_row([&value], |row| {
                        Ok(Token {
                            value: row.get(0)?,
                            created_at: parse_datetime(row.get::<_, Option<String>>(1)?)
                                .unwrap_or_else(Utc::now),
                            expires_at: parse_datetime(row.get::<_, Option<String>>(2)?)
                                .unwrap_or_else(Utc::now),
                            used: row.get::<_, i64>(3)? != 0,
                        })
                    })
                    .optional()?;

                Ok(result)
            })
            .await
            .map_err(Into::into)
    }

    async fn consume_token(&self, value: &str) -> Result<ConsumeOutcome, DbError> {
        let value = value.to_string();
        let now = Utc::now().to_rfc3339();

        // All calls run on one connection, so the conditional update and the
        // follow-up classification below execute without interleaving. Two
        // racing consumers of the same token can never both see used = 0.
        self.conn
            .call(move |conn| {
                let updated = conn.execute(
                    r#"
                    UPDATE nonce_tokens
                    SET used = 1
                    WHERE token = ?1 AND used = 0 AND expires_at >= ?2
                    "#,
                    rusqlite::params![value, now],
                )?;

                if updated == 1 {
                    return Ok(ConsumeOutcome::Consumed);
                }

                // The guarded update did not fire; inspect the row to say why.
                let row = conn
                    .query_row(
                        "SELECT used FROM nonce_tokens WHERE token = ?1",
                        [&value],
                        |row| Ok(row.get::<_, i64>(0)? != 0),
                    )
                    .optional()?;

                Ok(match row {
                    None => ConsumeOutcome::NotFound,
                    Some(true) => ConsumeOutcome::AlreadyUsed,
                    Some(false) => ConsumeOutcome::Expired,
                })
            })
            .await
            .map_err(Into::into)
    }

    // =========================================================================
    // Asset operations
    // =========================================================================

    async fn create_asset(&self, asset: &Asset) -> Result<(), DbError> {
        let id = asset.id.clone();
        let address = asset.address.clone();
        let description = asset.description.clone();
        let image = asset.image.clone();
        let social = asset
            .social
            .as_ref()
            .map(|s| serde_json::to_string(s).unwrap_or_else(|_| "{}".to_string()));
        let created_at = asset.created_at.to_rfc3339();
        let updated_at = asset.updated_at.to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO assets
                    (id, address, description, image, social, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    rusqlite::params![
                        id,
                        address,
                        description,
                        image,
                        social,
                        created_at,
                        updated_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(classify_insert_error)
    }

    async fn get_asset_by_id(&self, id: &str) -> Result<Option<Asset>, DbError> {
        let id = id.to_string();

        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, address, description, image, social, created_at, updated_at
                    FROM assets
                    WHERE id = ?1
                    "#,
                )?;

                let result = stmt.query_row([&id], map_asset_row).optional()?;

                Ok(result)
            })
            .await
            .map_err(Into::into)
    }

    async fn get_assets(&self, query: &AssetQuery) -> Result<Vec<Asset>, DbError> {
        let query = query.clone();

        self.conn
            .call(move |conn| {
                let mut sql = String::from(
                    "SELECT id, address, description, image, social, created_at, updated_at FROM assets",
                );
                let mut clauses: Vec<String> = Vec::new();
                let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

                if let Some(address) = &query.address {
                    params.push(Box::new(address.clone()));
                    clauses.push(format!("address = ?{}", params.len()));
                }
                if let Some(id) = &query.id {
                    params.push(Box::new(id.clone()));
                    clauses.push(format!("id = ?{}", params.len()));
                }
                if !clauses.is_empty() {
                    sql.push_str(" WHERE ");
                    sql.push_str(&clauses.join(" AND "));
                }

                // Ordering columns come from a whitelist, never from raw input
                if let Some(order) = query.order {
                    let direction = if query.ascending { "ASC" } else { "DESC" };
                    sql.push_str(&format!(" ORDER BY {} {}", order.column(), direction));
                }

                params.push(Box::new(query.limit));
                sql.push_str(&format!(" LIMIT ?{}", params.len()));
                params.push(Box::new(query.offset));
                sql.push_str(&format!(" OFFSET ?{}", params.len()));

                let mut stmt = conn.prepare(&sql)?;
                let assets = stmt
                    .query_map(
                        rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                        map_asset_row,
                    )?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(assets)
            })
            .await
            .map_err(Into::into)
    }

    async fn update_asset(
        &self,
        id: &str,
        address: &str,
        changes: &UpdateAsset,
    ) -> Result<Asset, DbError> {
        let id = id.to_string();
        let address = address.to_string();
        let changes = changes.clone();
        let updated_at = Utc::now().to_rfc3339();

        let result = self
            .conn
            .call(move |conn| {
                let mut sets: Vec<String> = Vec::new();
                let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

                if let Some(description) = changes.description {
                    params.push(Box::new(description));
                    sets.push(format!("description = ?{}", params.len()));
                }
                if let Some(image) = changes.image {
                    params.push(Box::new(image));
                    sets.push(format!("image = ?{}", params.len()));
                }
                if let Some(social) = changes.social {
                    let social =
                        serde_json::to_string(&social).unwrap_or_else(|_| "{}".to_string());
                    params.push(Box::new(social));
                    sets.push(format!("social = ?{}", params.len()));
                }
                params.push(Box::new(updated_at));
                sets.push(format!("updated_at = ?{}", params.len()));

                params.push(Box::new(id.clone()));
                let id_pos = params.len();
                params.push(Box::new(address));
                let address_pos = params.len();

                let sql = format!(
                    "UPDATE assets SET {} WHERE id = ?{} AND address = ?{}",
                    sets.join(", "),
                    id_pos,
                    address_pos
                );

                let updated = conn.execute(
                    &sql,
                    rusqlite::params_from_iter(params.iter().map(|p| p.as_ref())),
                )?;
                if updated == 0 {
                    return Ok(None);
                }

                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, address, description, image, social, created_at, updated_at
                    FROM assets
                    WHERE id = ?1
                    "#,
                )?;
                let asset = stmt.query_row([&id], map_asset_row).optional()?;

                Ok(asset)
            })
            .await?;

        result.ok_or(DbError::NotFound)
    }

    async fn delete_asset(&self, id: &str, address: &str) -> Result<(), DbError> {
        let id = id.to_string();
        let address = address.to_string();

        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "DELETE FROM assets WHERE id = ?1 AND address = ?2",
                    rusqlite::params![id, address],
                )?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

/// Parse a datetime string to DateTime<Utc>
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                // Try parsing SQLite's datetime format
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    })
}

/// Map a SELECT over the assets table into the domain record
fn map_asset_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Asset> {
    let social: Option<String> = row.get(4)?;

    Ok(Asset {
        id: row.get(0)?,
        address: row.get(1)?,
        description: row.get(2)?,
        image: row.get(3)?,
        social: social.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_datetime(row.get::<_, Option<String>>(5)?).unwrap_or_else(Utc::now),
        updated_at: parse_datetime(row.get::<_, Option<String>>(6)?).unwrap_or_else(Utc::now),
    })
}

/// Classify insert failures so callers can tell duplicate keys apart
fn classify_insert_error(err: tokio_rusqlite::Error) -> DbError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _)) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation {
            return DbError::ConstraintViolation(err.to_string());
        }
    }
    err.into()
}
