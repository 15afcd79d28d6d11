//! S3 upload client using AWS Signature Version 4
//!
//! Objects are written with a presigned PUT request: the signature rides in
//! the query string, the payload stays unsigned, and the object is marked
//! `public-read` so the returned URL serves without credentials. A custom
//! endpoint switches the client to path-style addressing for local
//! S3-compatible servers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::storage::ObjectStore;

const SERVICE: &str = "s3";

/// How long a generated upload URL stays signable, in seconds
const PRESIGN_EXPIRES_SECONDS: u64 = 300;

/// S3-compatible store uploading through presigned PUT requests
pub struct S3Store {
    bucket: String,
    region: String,
    access_key: String,
    secret_key: String,
    /// Endpoint the signed PUT goes to, without trailing slash
    endpoint: String,
    /// Base of the URL handed back to clients
    public_base: String,
    client: reqwest::Client,
}

impl S3Store {
    /// Build a store from configured credentials
    ///
    /// Without an endpoint override the client talks to AWS and hands out
    /// `https://{bucket}.s3.amazonaws.com/{key}` URLs; with one, both the
    /// upload and the public URL go through the override.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.bucket.is_empty() {
            return Err(StorageError::InvalidEndpoint(
                "bucket name is empty".to_string(),
            ));
        }

        let (endpoint, public_base) = match &config.endpoint {
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/').to_string();
                let public_base = format!("{}/{}", endpoint, config.bucket);
                (endpoint, public_base)
            }
            None => (
                format!("https://s3.{}.amazonaws.com", config.region),
                format!("https://{}.s3.amazonaws.com", config.bucket),
            ),
        };

        Ok(Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            access_key: config.access_key.clone(),
            secret_key: config.secret_key.clone(),
            endpoint,
            public_base,
            client: reqwest::Client::new(),
        })
    }

    /// Generate a presigned PUT URL for `key` at the given instant
    fn presign_put(&self, key: &str, now: DateTime<Utc>) -> Result<String, StorageError> {
        let date = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let credential_scope = format!("{}/{}/{}/aws4_request", date, self.region, SERVICE);

        let host = host_of(&self.endpoint)?;

        // Path-style addressing; the key only ever holds unreserved
        // characters but encode it anyway
        let canonical_uri = percent_encode(&format!("/{}/{}", self.bucket, key), true);

        let mut query = BTreeMap::new();
        query.insert("X-Amz-Algorithm", "AWS4-HMAC-SHA256".to_string());
        query.insert(
            "X-Amz-Credential",
            format!("{}/{}", self.access_key, credential_scope),
        );
        query.insert("X-Amz-Date", amz_date.clone());
        query.insert("X-Amz-Expires", PRESIGN_EXPIRES_SECONDS.to_string());
        query.insert("X-Amz-SignedHeaders", "host".to_string());
        query.insert("x-amz-acl", "public-read".to_string());

        // BTreeMap iterates in byte order, which is the order SigV4 wants
        let canonical_query = query
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k, false), percent_encode(v, false)))
            .collect::<Vec<_>>()
            .join("&");

        // Only the host header is signed; content type and body stay outside
        // the signature
        let canonical_request = format!(
            "PUT\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            canonical_uri, canonical_query, host
        );

        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let key_signing = signing_key(&self.secret_key, &date, &self.region);
        let signature = hex::encode(hmac_sha256(&key_signing, string_to_sign.as_bytes()));

        Ok(format!(
            "{}{}?{}&X-Amz-Signature={}",
            self.endpoint, canonical_uri, canonical_query, signature
        ))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn upload(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = self.presign_put(key, Utc::now())?;

        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::UploadRejected(response.status().as_u16()));
        }

        Ok(format!("{}/{}", self.public_base, key))
    }
}

/// Percent-encode per SigV4 rules, optionally leaving slashes intact for
/// path components
fn percent_encode(input: &str, preserve_slashes: bool) -> String {
    use std::fmt::Write;

    let mut encoded = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '~' => encoded.push(c),
            '/' if preserve_slashes => encoded.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).as_bytes() {
                    let _ = write!(encoded, "%{:02X}", b);
                }
            }
        }
    }
    encoded
}

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the SigV4 signing key for a date and region
fn signing_key(secret_key: &str, date: &str, region: &str) -> Vec<u8> {
    let key_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes());
    let key_region = hmac_sha256(&key_date, region.as_bytes());
    let key_service = hmac_sha256(&key_region, SERVICE.as_bytes());
    hmac_sha256(&key_service, b"aws4_request")
}

/// Extract the host component from an endpoint URL
fn host_of(endpoint: &str) -> Result<String, StorageError> {
    let stripped = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint);

    let host = stripped.split('/').next().unwrap_or(stripped);
    if host.is_empty() {
        return Err(StorageError::InvalidEndpoint(endpoint.to_string()));
    }

    Ok(host.to_string())
}
