//! HTTP implementation of [`OtpService`] against the MediMate backend.

use super::{OtpEnvelope, OtpService, SendOtpRequest, VerifiedIdentity, VerifyOtpRequest};
use crate::config::BackendConfig;
use crate::error::OtpError;
use async_trait::async_trait;
use reqwest::StatusCode;

/// OTP service client for `POST /send-otp` and `POST /verify-otp`.
pub struct HttpOtpService {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpOtpService {
    pub fn new(config: BackendConfig) -> anyhow::Result<Self> {
        let http = config.build_client()?;
        Ok(Self { config, http })
    }

    /// Reuse an existing client (one connection pool per process).
    pub fn with_client(config: BackendConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    async fn post_envelope<B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, OtpEnvelope), OtpError> {
        let resp = self
            .http
            .post(self.config.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|e| OtpError::Network(e.to_string()))?;

        let status = resp.status();
        let envelope: OtpEnvelope = resp
            .json()
            .await
            .map_err(|e| OtpError::Network(e.to_string()))?;
        Ok((status, envelope))
    }
}

/// Classify a verify rejection from the status line and service
/// message. The backend speaks in prose, so this sniffs the two reasons
/// that change client behavior and passes everything else through as an
/// invalid code with the message verbatim.
fn classify_verify_rejection(status: StatusCode, message: Option<String>) -> OtpError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return OtpError::RateLimited;
    }
    let message = message.unwrap_or_else(|| "Invalid OTP".to_string());
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("expired") {
        OtpError::Expired
    } else if lowered.contains("too many") || lowered.contains("rate") {
        OtpError::RateLimited
    } else {
        OtpError::InvalidCode(message)
    }
}

#[async_trait]
impl OtpService for HttpOtpService {
    async fn send_code(&self, email: &str, name: &str) -> Result<(), OtpError> {
        let (status, envelope) = self
            .post_envelope("/send-otp", &SendOtpRequest { email, name })
            .await?;

        if envelope.success {
            return Ok(());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(OtpError::RateLimited);
        }
        // Issue failures surface the service message verbatim.
        Err(OtpError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Failed to send OTP".to_string()),
        ))
    }

    async fn verify_code(
        &self,
        email: &str,
        code: &str,
        name: &str,
    ) -> Result<VerifiedIdentity, OtpError> {
        let (status, envelope) = self
            .post_envelope(
                "/verify-otp",
                &VerifyOtpRequest {
                    email,
                    otp: code,
                    name,
                },
            )
            .await?;

        if envelope.success {
            return Ok(VerifiedIdentity {
                email: email.to_string(),
            });
        }
        Err(classify_verify_rejection(status, envelope.message))
    }
}

// ── Tests ────────────────────────────────────────────────────────
