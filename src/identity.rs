//! Identity-provider adapter.
//!
//! Credential creation and credential verification against the external
//! identity provider, translated into the closed [`IdentityError`]
//! taxonomy. Both operations are pure request/response: no state is
//! held between calls and retries belong to the caller.
//!
//! On successful credential creation the provider also signs the device
//! in; the orchestrator treats that as authoritative proof of identity
//! and persists a session without re-verifying.

use crate::error::IdentityError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A signed-in identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Email the credential is issued for.
    pub email: String,
    /// Provider-assigned user id.
    pub provider_uid: String,
}

/// External credential-issuance/authentication surface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an email/password credential. Signs the device in on
    /// success.
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityError>;

    /// Verify an existing email/password credential.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;
}

// ── HTTP adapter ─────────────────────────────────────────────────

/// Connection settings for the hosted identity provider's REST surface.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// REST base URL, no trailing slash.
    pub base_url: String,
    /// Project API key, appended as the `key` query parameter.
    pub api_key: String,
    pub timeout: Duration,
}

impl IdentityConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct CredentialRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
struct CredentialResponse {
    #[serde(rename = "localId")]
    local_id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Map the provider's REST error codes onto the closed taxonomy. The
/// REST surface shouts in upper snake case; `WEAK_PASSWORD` arrives
/// with a trailing explanation (`WEAK_PASSWORD : ...`), hence the
/// prefix matches.
fn map_rest_code(code: &str) -> IdentityError {
    let code = code.trim();
    if code.starts_with("EMAIL_EXISTS") {
        IdentityError::EmailInUse
    } else if code.starts_with("INVALID_EMAIL") || code.starts_with("MISSING_EMAIL") {
        IdentityError::InvalidEmail
    } else if code.starts_with("WEAK_PASSWORD") {
        IdentityError::WeakPassword
    } else if code.starts_with("EMAIL_NOT_FOUND") {
        IdentityError::UserNotFound
    } else if code.starts_with("INVALID_PASSWORD") {
        IdentityError::WrongPassword
    } else {
        IdentityError::Unknown(code.to_string())
    }
}

/// REST client for the hosted identity provider.
pub struct HttpIdentityProvider {
    config: IdentityConfig,
    http: reqwest::Client,
}

impl HttpIdentityProvider {
    pub fn new(config: IdentityConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/v1/accounts:{}?key={}",
            self.config.base_url, operation, self.config.api_key
        )
    }

    async fn call(&self, operation: &str, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let resp = self
            .http
            .post(self.endpoint(operation))
            .json(&CredentialRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(|e| IdentityError::Unknown(e.to_string()))?;

        if resp.status().is_success() {
            let body: CredentialResponse = resp
                .json()
                .await
                .map_err(|e| IdentityError::Unknown(e.to_string()))?;
            return Ok(Identity {
                email: body.email,
                provider_uid: body.local_id,
            });
        }

        let status = resp.status();
        match resp.json::<ProviderErrorBody>().await {
            Ok(body) => Err(map_rest_code(&body.error.message)),
            Err(_) => Err(IdentityError::Unknown(format!(
                "provider returned {status}"
            ))),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn create_credential(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity, IdentityError> {
        self.call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        self.call("signInWithPassword", email, password).await
    }
}

// ── Tests ────────────────────────────────────────────────────────
