//! Local input validation for the signup and login forms.
//!
//! Validation is free and always runs before any network call: a form
//! that fails here never reaches the OTP service or identity provider.

use crate::error::ValidationError;
use regex::Regex;
use std::sync::OnceLock;

/// The RFC-shaped email pattern the mobile client has always used.
const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LEN: usize = 8;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// Check an email address for RFC shape.
pub fn email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyEmail);
    }
    if !email_regex().is_match(value) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Validate the full signup form: non-empty name, RFC-shaped email,
/// password of at least [`MIN_PASSWORD_LEN`] characters.
pub fn signup_input(name: &str, email_addr: &str, password: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    email(email_addr)?;
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}

/// Validate the login form: both fields present, email RFC-shaped.
/// No length check here; the stored credential decides.
pub fn login_input(email_addr: &str, password: &str) -> Result<(), ValidationError> {
    email(email_addr)?;
    if password.is_empty() {
        return Err(ValidationError::EmptyPassword);
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
