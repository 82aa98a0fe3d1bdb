//! Backend connection configuration.
//!
//! The OTP service and token registry live behind one small HTTP
//! backend; this holds its base URL and request timeout. Environment
//! variables override the defaults so staging builds don't need a
//! recompile.

use std::time::Duration;

/// Production backend the shipped client talks to.
pub const DEFAULT_BASE_URL: &str = "https://rohitsbackend.onrender.com";

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the MediMate backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, no trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl BackendConfig {
    /// Configuration pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read overrides from `MEDIMATE_BACKEND_URL` and
    /// `MEDIMATE_HTTP_TIMEOUT_SECS`, falling back to the defaults.
    pub fn from_env() -> Self {
        let mut config = match std::env::var("MEDIMATE_BACKEND_URL") {
            Ok(url) if !url.is_empty() => Self::new(url),
            _ => Self::default(),
        };
        if let Ok(secs) = std::env::var("MEDIMATE_HTTP_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.timeout = Duration::from_secs(secs);
            }
        }
        config
    }

    /// Absolute URL for an endpoint path (`/send-otp` and friends).
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A reqwest client honoring this configuration.
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(self.timeout).build()?)
    }
}

// ── Tests ────────────────────────────────────────────────────────
