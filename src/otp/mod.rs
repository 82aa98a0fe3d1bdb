//! One-time-code verification of email ownership.
//!
//! Signup is OTP-gated: before an account is created, the visitor must
//! prove control of the email by typing back a six-digit code. This
//! module owns that exchange end to end:
//! - [`OtpService`]: the remote issue/verify surface
//! - [`SignupChallenge`]: per-attempt state machine (digits, status,
//!   resend cooldown)
//! - [`OtpFlow`]: async driver tying the two together, with the
//!   cancellable one-second countdown task
//!
//! ## Design
//! - One challenge per in-flight signup attempt; discarded on navigation
//!   away, on account creation, or on fatal identity rejection
//! - Verify calls are strictly sequential: a second call while one is
//!   outstanding is refused locally, no network traffic
//! - No automatic retries; resend and re-verify are user-initiated

mod challenge;
mod flow;
mod http;

pub use challenge::{ChallengeStatus, FocusHint, SignupChallenge, CODE_LEN, RESEND_COOLDOWN_SECS};
pub use flow::OtpFlow;
pub use http::HttpOtpService;

use crate::error::OtpError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Proof that the OTP service accepted a code for an email. Consumed by
/// the identity adapter step: the orchestrator only creates a credential
/// for an email it holds one of these for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// The email whose ownership was just proven.
    pub email: String,
}

/// Remote OTP issue/verify surface.
#[async_trait]
pub trait OtpService: Send + Sync {
    /// Request a fresh code for `email`. Also used for resend.
    async fn send_code(&self, email: &str, name: &str) -> Result<(), OtpError>;

    /// Submit a six-digit code for verification.
    async fn verify_code(
        &self,
        email: &str,
        code: &str,
        name: &str,
    ) -> Result<VerifiedIdentity, OtpError>;
}

// ── Wire shapes ──────────────────────────────────────────────────

/// Request body for `POST /send-otp`.
#[derive(Debug, Serialize)]
pub(crate) struct SendOtpRequest<'a> {
    pub email: &'a str,
    pub name: &'a str,
}

/// Request body for `POST /verify-otp`.
#[derive(Debug, Serialize)]
pub(crate) struct VerifyOtpRequest<'a> {
    pub email: &'a str,
    pub otp: &'a str,
    pub name: &'a str,
}

/// Response envelope shared by both OTP endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct OtpEnvelope {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}
