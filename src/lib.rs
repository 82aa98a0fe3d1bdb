//! Account and device-identity core for the MediMate mobile client.
//!
//! MediMate registers users through an email one-time-password
//! challenge, keeps the signed-in identity on the device, and binds
//! the device's push-notification token to the account so reminders
//! reach the right phone. This crate is the behavior behind those
//! screens, with the UI peeled off:
//!
//! - [`validate`]: the form rules (email shape, password length)
//! - [`otp`]: the six-digit code challenge: issue, resend with a
//!   cooldown, digit entry, verification
//! - [`identity`]: the credential provider (create account, sign in)
//! - [`session`]: the on-device signed-in state and profile fields
//! - [`token`]: push-token binding against the backend registry
//! - [`auth`]: the orchestrator that ties the journeys together
//!
//! Network services sit behind traits ([`otp::OtpService`],
//! [`identity::IdentityProvider`], [`token::TokenRegistry`]) so the
//! orchestration logic tests without a backend. The shipped
//! implementations speak to the MediMate backend over HTTPS.

pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod otp;
pub mod session;
pub mod token;
pub mod validate;

pub use auth::{AuthOrchestrator, AuthState, SignupOutcome};
pub use config::BackendConfig;
pub use error::{AuthError, IdentityError, OtpError, TokenError, ValidationError};
pub use otp::{ChallengeStatus, FocusHint, OtpFlow, CODE_LEN, RESEND_COOLDOWN_SECS};
pub use session::SessionFields;
pub use token::TokenRegistrar;
