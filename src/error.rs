//! Shared error taxonomy for the account and device-identity core.
//!
//! Four closed families, one per fallible boundary:
//! - [`ValidationError`]: client-side input checks, raised before any
//!   network call is made
//! - [`OtpError`]: the OTP/verification service
//! - [`IdentityError`]: the identity provider
//! - [`TokenError`]: the push-token registry (always non-fatal)
//!
//! Display strings double as the user-facing toast text, so they match
//! the wording the mobile client has always shown.

use thiserror::Error;

// ── Validation ───────────────────────────────────────────────────

/// Local input validation failure. Free: no network call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please provide your name")]
    EmptyName,
    #[error("Please provide email")]
    EmptyEmail,
    #[error("Please enter a valid email")]
    InvalidEmail,
    #[error("Please provide password")]
    EmptyPassword,
    #[error("Minimum 8 characters required in the password")]
    PasswordTooShort,
    /// OTP slots accept exactly one decimal digit, or empty to clear.
    #[error("OTP slot accepts a single digit")]
    InvalidDigit,
    /// OTP slot index outside 0..=5.
    #[error("OTP slot index out of range")]
    SlotOutOfRange,
}

// ── OTP service ──────────────────────────────────────────────────

/// Failure from the OTP challenge: either the remote verification
/// service or a local guard that refused the call before any network
/// traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    /// The service rejected the submitted code. Carries the service's
    /// message verbatim.
    #[error("{0}")]
    InvalidCode(String),
    /// The code lapsed before verification.
    #[error("OTP expired, request a new code")]
    Expired,
    /// The service is throttling this email.
    #[error("Too many attempts, try again later")]
    RateLimited,
    /// The service could not be reached or returned an unreadable body.
    #[error("{0}")]
    Network(String),
    /// Issuance or resend was refused by the service; message passed
    /// through verbatim.
    #[error("{0}")]
    Rejected(String),
    /// A verify call is already outstanding; this one was refused
    /// locally without a network call.
    #[error("Verification already in progress")]
    VerifyInFlight,
    /// Resend requested before the cooldown reached zero.
    #[error("Resend available in {0}s")]
    CooldownActive(u32),
    /// Not all six digit slots are filled.
    #[error("Enter all six digits")]
    IncompleteCode,
    /// The challenge is consumed or disposed; the operation no longer
    /// applies.
    #[error("Challenge is no longer active")]
    NotActive,
}

// ── Identity provider ────────────────────────────────────────────

/// Mapped identity-provider failure. The provider's open-ended error
/// codes collapse into this closed taxonomy at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("That email address is already in use")]
    EmailInUse,
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Password is too weak")]
    WeakPassword,
    #[error("No user found with this email")]
    UserNotFound,
    #[error("Incorrect password")]
    WrongPassword,
    #[error("Something went wrong: {0}")]
    Unknown(String),
}

impl IdentityError {
    /// Map a provider error code to the closed taxonomy.
    ///
    /// Accepts both bare codes (`email-already-in-use`) and namespaced
    /// ones (`auth/email-already-in-use`); mobile SDKs prefix the
    /// namespace, the REST surface does not.
    pub fn from_provider_code(code: &str) -> Self {
        let bare = code.rsplit('/').next().unwrap_or(code);
        match bare {
            "email-already-in-use" => Self::EmailInUse,
            "invalid-email" => Self::InvalidEmail,
            "weak-password" => Self::WeakPassword,
            "user-not-found" => Self::UserNotFound,
            "wrong-password" => Self::WrongPassword,
            other => Self::Unknown(other.to_string()),
        }
    }
}

// ── Token registry ───────────────────────────────────────────────

/// Token-registry failure. Never fatal to authentication state: callers
/// log these at warning level and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The registry could not be reached.
    #[error("token registry unreachable: {0}")]
    Network(String),
    /// The registry answered but refused the operation.
    #[error("token registry rejected the request: {0}")]
    Rejected(String),
}

// ── Orchestrator ─────────────────────────────────────────────────

/// Union error surfaced by the auth orchestrator's entry points.
///
/// [`TokenError`] is deliberately absent: token-registry failures are
/// logged inside the orchestrator and never propagate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    /// Another save/login operation owns the flow right now.
    #[error("Another operation is in progress")]
    Busy,
    /// Entry point called from a state that does not permit it.
    #[error("Not available right now")]
    InvalidState,
}

// ── Tests ────────────────────────────────────────────────────────
