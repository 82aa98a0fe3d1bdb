//! The account-lifecycle driver.

use super::{AuthState, SignupOutcome};
use crate::error::{AuthError, IdentityError};
use crate::identity::IdentityProvider;
use crate::otp::{ChallengeStatus, FocusHint, OtpFlow, OtpService};
use crate::session::SessionFields;
use crate::token::TokenRegistrar;
use crate::validate;
use parking_lot::Mutex;
use std::sync::Arc;

/// Drives signup, login, logout, session restore, and push-token
/// upkeep over the component services.
///
/// All methods take `&self`; state lives behind locks so UI callbacks
/// and the messaging SDK's token-refresh hook can arrive concurrently.
/// No lock is held across a network await: each transition claims the
/// state first, runs the network step, then applies the result.
pub struct AuthOrchestrator {
    identity: Arc<dyn IdentityProvider>,
    otp: Arc<dyn OtpService>,
    registrar: TokenRegistrar,
    session: SessionFields,
    state: Mutex<AuthState>,
    flow: Mutex<Option<Arc<OtpFlow>>>,
    /// Last device token this process bound or was told about, so a
    /// refresh can retire its predecessor.
    last_token: Mutex<Option<String>>,
}

impl AuthOrchestrator {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        otp: Arc<dyn OtpService>,
        registrar: TokenRegistrar,
        session: SessionFields,
    ) -> Self {
        Self {
            identity,
            otp,
            registrar,
            session,
            state: Mutex::new(AuthState::Anonymous),
            flow: Mutex::new(None),
            last_token: Mutex::new(None),
        }
    }

    pub fn state(&self) -> AuthState {
        self.state.lock().clone()
    }

    /// Rehydrate from the session store at startup. A stored email
    /// means the device stays signed in across restarts; anything else
    /// starts anonymous.
    pub async fn restore(&self) -> AuthState {
        let state = match self.session.signed_in_email().await {
            Some(email) => {
                tracing::info!(email = %email, "Restored signed-in session");
                AuthState::Registered { email }
            }
            None => AuthState::Anonymous,
        };
        *self.state.lock() = state.clone();
        state
    }

    // ── Signup ───────────────────────────────────────────────

    /// Validate the signup form and request the first OTP. On success
    /// the account moves to `SigningUp` with an active challenge; on
    /// any failure it stays `Anonymous` so the form can be resubmitted.
    pub async fn begin_signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        validate::signup_input(name, email, password)?;
        self.claim(AuthState::Anonymous, AuthState::SigningUp)?;

        // Profile name persists from form submit, not account creation.
        self.session.save_full_name(name).await;

        let flow = Arc::new(OtpFlow::new(
            Arc::clone(&self.otp),
            email.trim(),
            password,
            name,
        ));
        match flow.issue().await {
            Ok(()) => {
                *self.flow.lock() = Some(flow);
                Ok(())
            }
            Err(err) => {
                *self.state.lock() = AuthState::Anonymous;
                Err(err.into())
            }
        }
    }

    /// Record one code-entry keystroke. Valid only while the account
    /// is `SigningUp` with an active challenge; keystrokes landing
    /// during credential creation are refused.
    pub fn record_digit(&self, index: usize, value: &str) -> Result<FocusHint, AuthError> {
        if *self.state.lock() != AuthState::SigningUp {
            return Err(AuthError::InvalidState);
        }
        let flow = self.active_flow()?;
        flow.record_digit(index, value).map_err(AuthError::from)
    }

    /// Re-request the code for the active challenge.
    pub async fn resend_code(&self) -> Result<(), AuthError> {
        let flow = self.active_flow()?;
        flow.resend().await.map_err(AuthError::from)
    }

    /// Seconds until the active challenge allows a resend. Zero when
    /// no challenge is active.
    pub fn resend_cooldown(&self) -> u32 {
        self.flow
            .lock()
            .as_ref()
            .map(|f| f.cooldown_seconds_remaining())
            .unwrap_or(0)
    }

    pub fn code_is_complete(&self) -> bool {
        self.flow
            .lock()
            .as_ref()
            .map(|f| f.code_is_complete())
            .unwrap_or(false)
    }

    /// Submit the entered code and, if accepted, create the account
    /// credential and sign the device in.
    ///
    /// An email that already has an account is not an error: the
    /// signup is abandoned and `AccountExists` tells the caller to
    /// steer the user to login. Any other failure keeps the challenge
    /// alive so the user can correct the code or retry.
    pub async fn verify_and_create(&self) -> Result<SignupOutcome, AuthError> {
        let flow = self.active_flow()?;
        if *self.state.lock() != AuthState::SigningUp {
            return Err(AuthError::Busy);
        }

        // A code that already passed verification (a previous
        // credential attempt failed) is not submitted again; the
        // retry goes straight to the credential step.
        if flow.status() != ChallengeStatus::Verified {
            flow.verify().await?;
        }

        *self.state.lock() = AuthState::CreatingAccount;
        let (email, password, full_name) = flow.credentials();
        match self.identity.create_credential(&email, &password).await {
            Ok(identity) => {
                self.drop_flow();
                self.session.save_email(&identity.email).await;
                self.session.save_full_name(&full_name).await;
                self.bind_device_soft(&identity.email).await;
                *self.state.lock() = AuthState::Registered {
                    email: identity.email,
                };
                Ok(SignupOutcome::Registered)
            }
            Err(IdentityError::EmailInUse) => {
                tracing::info!(email = %email, "Signup found an existing account");
                self.drop_flow();
                *self.state.lock() = AuthState::Anonymous;
                Ok(SignupOutcome::AccountExists)
            }
            Err(err) => {
                // Challenge stays alive: the code was right, only the
                // credential step failed.
                *self.state.lock() = AuthState::SigningUp;
                Err(err.into())
            }
        }
    }

    /// Abandon an in-progress signup and return to `Anonymous`.
    pub fn cancel_signup(&self) {
        if let Some(flow) = self.flow.lock().take() {
            flow.dispose();
        }
        let mut state = self.state.lock();
        if matches!(*state, AuthState::SigningUp | AuthState::CreatingAccount) {
            *state = AuthState::Anonymous;
        }
    }

    // ── Login / logout ───────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        validate::login_input(email, password)?;
        self.claim(AuthState::Anonymous, AuthState::LoggingIn)?;

        match self.identity.sign_in(email.trim(), password).await {
            Ok(identity) => {
                self.session.save_email(&identity.email).await;
                self.bind_device_soft(&identity.email).await;
                tracing::info!(email = %identity.email, "Logged in");
                *self.state.lock() = AuthState::Registered {
                    email: identity.email,
                };
                Ok(())
            }
            Err(err) => {
                *self.state.lock() = AuthState::Anonymous;
                Err(err.into())
            }
        }
    }

    /// Sign the device out. Unbinding the push token and clearing the
    /// session are both best-effort; logout itself cannot fail.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let email = {
            let mut state = self.state.lock();
            match &*state {
                AuthState::Registered { email } => {
                    let email = email.clone();
                    *state = AuthState::LoggingOut;
                    email
                }
                AuthState::LoggingOut => return Err(AuthError::Busy),
                _ => return Err(AuthError::InvalidState),
            }
        };

        // Unbind while the session still knows who we are.
        let token = self.last_token.lock().clone();
        if let Err(err) = self.registrar.unbind(&email, token.as_deref()).await {
            tracing::warn!(email = %email, error = %err, "Failed to unbind push token on logout");
        }
        self.session.clear_all().await;

        tracing::info!(email = %email, "Logged out");
        *self.state.lock() = AuthState::Anonymous;
        Ok(())
    }

    // ── Push-token upkeep ────────────────────────────────────

    /// Called from the messaging SDK whenever the device token rotates.
    /// The new token is always remembered; if the device is signed in
    /// the registry binding is moved over as well. Failures are logged
    /// and swallowed; a token hiccup never disturbs the session.
    pub async fn handle_token_refresh(&self, new_token: &str) {
        let previous = self
            .last_token
            .lock()
            .replace(new_token.to_string());

        let email = match &*self.state.lock() {
            AuthState::Registered { email } => email.clone(),
            _ => return,
        };
        if let Err(err) = self
            .registrar
            .rebind(&email, previous.as_deref(), new_token)
            .await
        {
            tracing::warn!(email = %email, error = %err, "Failed to rebind refreshed push token");
        }
    }

    // ── Internals ────────────────────────────────────────────

    /// Atomically move `from` to `to`, refusing when a transition is
    /// already in flight or the account is elsewhere.
    fn claim(&self, from: AuthState, to: AuthState) -> Result<(), AuthError> {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            Ok(())
        } else if matches!(
            *state,
            AuthState::SigningUp
                | AuthState::CreatingAccount
                | AuthState::LoggingIn
                | AuthState::LoggingOut
        ) {
            Err(AuthError::Busy)
        } else {
            Err(AuthError::InvalidState)
        }
    }

    fn active_flow(&self) -> Result<Arc<OtpFlow>, AuthError> {
        self.flow
            .lock()
            .as_ref()
            .map(Arc::clone)
            .ok_or(AuthError::InvalidState)
    }

    fn drop_flow(&self) {
        if let Some(flow) = self.flow.lock().take() {
            flow.dispose();
        }
    }

    async fn bind_device_soft(&self, email: &str) {
        match self.registrar.bind_device(email).await {
            Ok(Some(token)) => {
                *self.last_token.lock() = Some(token);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(email = %email, error = %err, "Failed to bind push token");
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
