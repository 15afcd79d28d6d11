//! Database migrations for asset-portal
//!
//! This module contains SQL migrations for the SQLite database schema.

/// SQL statement to create the initial database schema
pub const CREATE_SCHEMA: &str = r#"
-- Nonce tokens table
--
-- Rows are never deleted; consumed tokens stay behind with used = 1 so a
-- replayed message can be told apart from one that was never issued.
CREATE TABLE IF NOT EXISTS nonce_tokens (
    token TEXT PRIMARY KEY,
    created_at DATETIME NOT NULL,
    expires_at DATETIME NOT NULL,
    used INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_nonce_tokens_expires ON nonce_tokens(expires_at);

-- Assets table
CREATE TABLE IF NOT EXISTS assets (
    id TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    description TEXT,
    image TEXT,
    social TEXT,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assets_address ON assets(address);
CREATE INDEX IF NOT EXISTS idx_assets_created ON assets(created_at DESC);
"#;
