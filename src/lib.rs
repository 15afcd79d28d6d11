//! asset-portal - A wallet-authenticated asset registry with image storage
//!
//! This crate provides an HTTP API for wallet-owned asset records. Mutating
//! requests prove control of a wallet address through a single-use nonce
//! handshake; uploaded images land in S3-compatible object storage.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod server;
pub mod storage;
