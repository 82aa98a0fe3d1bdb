//! Account lifecycle orchestration.
//!
//! [`AuthOrchestrator`] composes the OTP challenge flow, the identity
//! provider, the device-token registrar, and the session store into
//! the four user-visible journeys: signup, login, logout, and session
//! restore. It owns the single source of truth for where the account
//! stands ([`AuthState`]) and enforces that at most one transition is
//! in flight at a time.

mod orchestrator;

pub use orchestrator::AuthOrchestrator;

/// Where the account currently stands. The transitional variants
/// (`SigningUp`, `CreatingAccount`, `LoggingIn`, `LoggingOut`) gate
/// out overlapping operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// No account on this device.
    Anonymous,
    /// An OTP challenge is active for a pending signup.
    SigningUp,
    /// The code was accepted; the credential is being created.
    CreatingAccount,
    /// Credentials are being checked.
    LoggingIn,
    /// Signed in as `email`.
    Registered { email: String },
    /// Teardown in progress.
    LoggingOut,
}

/// How a completed signup resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupOutcome {
    /// A fresh account was created and the device is signed in.
    Registered,
    /// The email already has an account. The signup is abandoned and
    /// the user is directed to log in instead.
    AccountExists,
}
