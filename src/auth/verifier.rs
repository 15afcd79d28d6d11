//! External signature verification client
//!
//! Signatures are never checked locally. The service POSTs the signed
//! message to a verification endpoint and acts on its verdict. A negative
//! verdict and an unreachable verifier are different conditions and must
//! stay distinguishable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VerifyError;

/// Verdict returned by the verification service
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    /// Whether the signature checks out
    pub ok: bool,

    /// Reason attached to negative verdicts
    #[serde(default)]
    pub message: String,
}

/// Request body sent to the verification service
#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    message: &'a str,
    address: &'a str,
    signature: &'a str,
}

/// Client for the external signature verification service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Ask the verifier whether `signature` over `message` belongs to `address`
    async fn verify(
        &self,
        message: &str,
        address: &str,
        signature: &str,
    ) -> Result<Verdict, VerifyError>;
}

/// HTTP implementation POSTing to `{base_url}/verify`
pub struct HttpSignatureVerifier {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSignatureVerifier {
    /// Build a verifier client with a bounded request timeout
    ///
    /// The timeout covers the whole exchange; a verifier that answers after
    /// it has elapsed counts as unreachable.
    pub fn new(
        base_url: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl SignatureVerifier for HttpSignatureVerifier {
    async fn verify(
        &self,
        message: &str,
        address: &str,
        signature: &str,
    ) -> Result<Verdict, VerifyError> {
        let url = format!("{}/verify", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&VerifyRequest {
                message,
                address,
                signature,
            })
            .send()
            .await?;

        let verdict = response.json::<Verdict>().await?;
        Ok(verdict)
    }
}
