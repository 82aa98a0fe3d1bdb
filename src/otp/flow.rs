//! Async driver for one OTP challenge.
//!
//! [`OtpFlow`] owns the shared [`SignupChallenge`] state, the handle to
//! the OTP service, and the one-second countdown task. All methods take
//! `&self`: the UI keeps a single flow per signup attempt and may poke
//! it from overlapping callbacks; the state machine's guards decide
//! what actually runs. The state lock is never held across a network
//! await; results are applied afterwards and stale ones discarded.

use super::challenge::{ChallengeStatus, FocusHint, SignupChallenge, CODE_LEN};
use super::{OtpService, VerifiedIdentity};
use crate::error::{OtpError, ValidationError};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Abort-on-drop handle for the countdown task. Dropping the guard (on
/// teardown, successful verification, or replacement by a resend) kills
/// the timer; nothing fires after disposal.
struct CountdownGuard {
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for CountdownGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Driver for a single in-flight signup challenge.
pub struct OtpFlow {
    service: Arc<dyn OtpService>,
    state: Arc<Mutex<SignupChallenge>>,
    countdown: Mutex<Option<CountdownGuard>>,
}

impl OtpFlow {
    /// A fresh, un-issued challenge for the given signup input.
    pub fn new(
        service: Arc<dyn OtpService>,
        email: impl Into<String>,
        password: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(SignupChallenge::new(email, password, full_name))),
            countdown: Mutex::new(None),
        }
    }

    // ── Read access for the UI ───────────────────────────────

    pub fn status(&self) -> ChallengeStatus {
        self.state.lock().status()
    }

    pub fn cooldown_seconds_remaining(&self) -> u32 {
        self.state.lock().cooldown_seconds_remaining()
    }

    pub fn can_resend(&self) -> bool {
        self.state.lock().can_resend()
    }

    pub fn digits(&self) -> [Option<char>; CODE_LEN] {
        self.state.lock().digits()
    }

    pub fn code_is_complete(&self) -> bool {
        self.state.lock().code_is_complete()
    }

    pub fn email(&self) -> String {
        self.state.lock().email().to_string()
    }

    /// The signup form input, for the identity-provider step.
    pub(crate) fn credentials(&self) -> (String, String, String) {
        let c = self.state.lock();
        (
            c.email().to_string(),
            c.password().to_string(),
            c.full_name().to_string(),
        )
    }

    // ── Digit entry ──────────────────────────────────────────

    pub fn record_digit(&self, index: usize, value: &str) -> Result<FocusHint, ValidationError> {
        self.state.lock().record_digit(index, value)
    }

    // ── Network operations ───────────────────────────────────

    /// Request the first code. Valid once, from `Idle`; a failure
    /// leaves the challenge `Idle` so the user can submit again.
    pub async fn issue(&self) -> Result<(), OtpError> {
        {
            let mut c = self.state.lock();
            if c.status() != ChallengeStatus::Idle {
                return Err(OtpError::NotActive);
            }
            if !c.begin_send()? {
                return Ok(());
            }
        }
        self.send_and_apply().await
    }

    /// Re-issue the code. Guarded by the cooldown and the single
    /// outstanding send; a concurrent resend is a silent no-op.
    pub async fn resend(&self) -> Result<(), OtpError> {
        {
            let mut c = self.state.lock();
            if c.status() == ChallengeStatus::Idle {
                return Err(OtpError::NotActive);
            }
            if !c.begin_send()? {
                return Ok(());
            }
        }
        self.send_and_apply().await
    }

    async fn send_and_apply(&self) -> Result<(), OtpError> {
        let (email, name) = {
            let c = self.state.lock();
            (c.email().to_string(), c.full_name().to_string())
        };
        let result = self.service.send_code(&email, &name).await;
        self.state.lock().finish_send(&result);
        if result.is_ok() {
            tracing::info!(email = %email, "OTP sent");
            self.restart_countdown();
        }
        result
    }

    /// Submit the entered code. At most one verify is outstanding; a
    /// second call is refused locally without a network call. A result
    /// arriving after the challenge was disposed is discarded.
    pub async fn verify(&self) -> Result<VerifiedIdentity, OtpError> {
        let (email, name, code, epoch) = {
            let mut c = self.state.lock();
            let (code, epoch) = c.begin_verify()?;
            (c.email().to_string(), c.full_name().to_string(), code, epoch)
        };

        let result = self.service.verify_code(&email, &code, &name).await;
        let outcome = result.as_ref().map(|_| ()).map_err(Clone::clone);
        let applied = self.state.lock().finish_verify(epoch, &outcome);
        if !applied {
            tracing::debug!(email = %email, "Discarding verify result for a disposed challenge");
            return Err(OtpError::NotActive);
        }
        if result.is_ok() {
            // Verified: the resend countdown has nothing left to do.
            self.cancel_countdown();
            tracing::info!(email = %email, "OTP verified");
        }
        result
    }

    /// Abandon the challenge: cancel the countdown and mark any
    /// in-flight verify stale.
    pub fn dispose(&self) {
        self.cancel_countdown();
        self.state.lock().dispose();
    }

    // ── Countdown task ───────────────────────────────────────

    fn restart_countdown(&self) {
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let mut challenge = state.lock();
                challenge.tick();
                if challenge.cooldown_seconds_remaining() == 0 {
                    break;
                }
            }
        });
        // Replacing the guard aborts any previous timer.
        *self.countdown.lock() = Some(CountdownGuard { handle });
    }

    fn cancel_countdown(&self) {
        self.countdown.lock().take();
    }
}

// ── Tests ────────────────────────────────────────────────────────
