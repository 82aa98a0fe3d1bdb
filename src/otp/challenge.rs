//! Per-attempt OTP challenge state.
//!
//! Pure state machine, no I/O: the async driver in [`super::flow`]
//! decides when to call the service and applies the results here. Every
//! transition is a synchronous method, which keeps the invariants unit
//! testable without a runtime.

use crate::error::{OtpError, ValidationError};

/// Number of code slots.
pub const CODE_LEN: usize = 6;

/// Seconds until resend becomes available after issue or resend.
pub const RESEND_COOLDOWN_SECS: u32 = 60;

/// Lifecycle of a single challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    /// Created, no code requested yet.
    Idle,
    /// The service accepted the issue request.
    Requested,
    /// Code delivered, resend cooldown running.
    CountingDown,
    /// A verify request is outstanding. At most one at a time.
    Verifying,
    /// The service accepted the code.
    Verified,
    /// The service rejected the code; digits were cleared for re-entry.
    Failed,
    /// The service reported the code lapsed; a resend is needed.
    Expired,
}

/// Where the UI should move focus after a digit edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusHint {
    /// Move to the given slot (a digit was filled).
    Advance(usize),
    /// Move back to the given slot (backspace into an empty slot).
    Retreat(usize),
    /// Stay where it is.
    Stay,
}

/// One in-flight signup attempt: the form input plus the OTP exchange
/// state. The password is held only for the identity-provider step and
/// is never persisted.
#[derive(Debug, Clone)]
pub struct SignupChallenge {
    email: String,
    password: String,
    full_name: String,
    status: ChallengeStatus,
    digits: [Option<char>; CODE_LEN],
    cooldown_seconds_remaining: u32,
    /// Bumped when a verify starts and again when the challenge is
    /// reset or disposed, so a late verify result can be recognized as
    /// stale and discarded.
    verify_epoch: u64,
    send_in_flight: bool,
}

impl SignupChallenge {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            full_name: full_name.into(),
            status: ChallengeStatus::Idle,
            digits: [None; CODE_LEN],
            cooldown_seconds_remaining: 0,
            verify_epoch: 0,
            send_in_flight: false,
        }
    }

    // ── Read access ──────────────────────────────────────────

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    pub fn cooldown_seconds_remaining(&self) -> u32 {
        self.cooldown_seconds_remaining
    }

    /// Whether the resend control should be enabled.
    pub fn can_resend(&self) -> bool {
        self.cooldown_seconds_remaining == 0
            && self.status != ChallengeStatus::Verifying
            && !self.send_in_flight
    }

    pub fn digits(&self) -> [Option<char>; CODE_LEN] {
        self.digits
    }

    pub fn code_is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// The six-character code, if every slot is filled.
    pub fn entered_code(&self) -> Option<String> {
        if self.code_is_complete() {
            Some(self.digits.iter().flatten().collect())
        } else {
            None
        }
    }

    // ── Digit entry ──────────────────────────────────────────

    /// Record a single decimal digit (or empty, to clear) at a slot.
    ///
    /// Anything else is rejected and the state is unchanged. The
    /// returned [`FocusHint`] is the only UI contract here: forward on
    /// fill, backward on backspace into an already-empty slot.
    pub fn record_digit(&mut self, index: usize, value: &str) -> Result<FocusHint, ValidationError> {
        if index >= CODE_LEN {
            return Err(ValidationError::SlotOutOfRange);
        }
        if value.is_empty() {
            if self.digits[index].is_none() {
                // Backspace into an empty slot: move focus back.
                return Ok(if index > 0 {
                    FocusHint::Retreat(index - 1)
                } else {
                    FocusHint::Stay
                });
            }
            self.digits[index] = None;
            return Ok(FocusHint::Stay);
        }

        let mut chars = value.chars();
        let digit = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => c,
            _ => return Err(ValidationError::InvalidDigit),
        };

        self.digits[index] = Some(digit);
        Ok(if index + 1 < CODE_LEN {
            FocusHint::Advance(index + 1)
        } else {
            FocusHint::Stay
        })
    }

    /// Decrement the resend cooldown, floored at zero. Driven once per
    /// second by the countdown task.
    pub fn tick(&mut self) {
        self.cooldown_seconds_remaining = self.cooldown_seconds_remaining.saturating_sub(1);
    }

    // ── Transitions (applied by the flow driver) ─────────────

    /// The service accepted an issue or resend: code is on its way,
    /// cooldown restarts, any previously entered digits are stale.
    pub(super) fn mark_issued(&mut self) {
        self.status = ChallengeStatus::Requested;
        self.digits = [None; CODE_LEN];
        self.cooldown_seconds_remaining = RESEND_COOLDOWN_SECS;
        self.status = ChallengeStatus::CountingDown;
    }

    /// Gate a verify call. On success the challenge enters `Verifying`
    /// and the entered code plus the new epoch are handed back for the
    /// network step.
    pub(super) fn begin_verify(&mut self) -> Result<(String, u64), OtpError> {
        match self.status {
            ChallengeStatus::Verifying => return Err(OtpError::VerifyInFlight),
            ChallengeStatus::Verified => return Err(OtpError::NotActive),
            ChallengeStatus::Idle => return Err(OtpError::NotActive),
            ChallengeStatus::Requested
            | ChallengeStatus::CountingDown
            | ChallengeStatus::Failed
            | ChallengeStatus::Expired => {}
        }
        let code = self.entered_code().ok_or(OtpError::IncompleteCode)?;
        self.status = ChallengeStatus::Verifying;
        self.verify_epoch += 1;
        Ok((code, self.verify_epoch))
    }

    /// Apply a verify result, unless the challenge moved on in the
    /// meantime (stale epoch; the result is discarded).
    ///
    /// Returns `false` when the result was stale.
    pub(super) fn finish_verify(&mut self, epoch: u64, result: &Result<(), OtpError>) -> bool {
        if epoch != self.verify_epoch || self.status != ChallengeStatus::Verifying {
            return false;
        }
        match result {
            Ok(()) => {
                self.status = ChallengeStatus::Verified;
            }
            Err(OtpError::Expired) => {
                self.status = ChallengeStatus::Expired;
                self.digits = [None; CODE_LEN];
            }
            Err(_) => {
                // Rejection clears the slots for re-entry; the resend
                // cooldown keeps running untouched.
                self.status = ChallengeStatus::Failed;
                self.digits = [None; CODE_LEN];
            }
        }
        true
    }

    /// Gate an issue or resend call. `Ok(true)` means "go ahead";
    /// `Ok(false)` means a send is already outstanding and this one is
    /// a no-op.
    pub(super) fn begin_send(&mut self) -> Result<bool, OtpError> {
        if self.send_in_flight {
            return Ok(false);
        }
        if self.status == ChallengeStatus::Verifying {
            return Err(OtpError::VerifyInFlight);
        }
        if self.cooldown_seconds_remaining > 0 {
            return Err(OtpError::CooldownActive(self.cooldown_seconds_remaining));
        }
        self.send_in_flight = true;
        Ok(true)
    }

    pub(super) fn finish_send(&mut self, result: &Result<(), OtpError>) {
        self.send_in_flight = false;
        if result.is_ok() {
            self.mark_issued();
        }
    }

    /// Abandon the challenge: any in-flight verify becomes stale and
    /// its late result will be discarded.
    pub(super) fn dispose(&mut self) {
        self.verify_epoch += 1;
        self.status = ChallengeStatus::Idle;
        self.digits = [None; CODE_LEN];
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn active_challenge() -> SignupChallenge {
        let mut c = SignupChallenge::new("user@x.com", "password123", "Rohit");
        c.mark_issued();
        c
    }

    fn fill_code(c: &mut SignupChallenge, code: &str) {
        for (i, d) in code.chars().enumerate() {
            c.record_digit(i, &d.to_string()).unwrap();
        }
    }

    #[test]
    fn new_challenge_is_idle_and_empty() {
        let c = SignupChallenge::new("user@x.com", "password123", "Rohit");
        assert_eq!(c.status(), ChallengeStatus::Idle);
        assert_eq!(c.digits(), [None; CODE_LEN]);
        assert_eq!(c.cooldown_seconds_remaining(), 0);
    }

    #[test]
    fn record_digit_advances_focus_until_last_slot() {
        let mut c = active_challenge();
        assert_eq!(c.record_digit(0, "1").unwrap(), FocusHint::Advance(1));
        assert_eq!(c.record_digit(4, "5").unwrap(), FocusHint::Advance(5));
        assert_eq!(c.record_digit(5, "6").unwrap(), FocusHint::Stay);
    }

    #[test]
    fn backspace_into_empty_slot_retreats() {
        let mut c = active_challenge();
        assert_eq!(c.record_digit(3, "").unwrap(), FocusHint::Retreat(2));
        assert_eq!(c.record_digit(0, "").unwrap(), FocusHint::Stay);
    }

    #[test]
    fn clearing_a_filled_slot_stays_put() {
        let mut c = active_challenge();
        c.record_digit(2, "7").unwrap();
        assert_eq!(c.record_digit(2, "").unwrap(), FocusHint::Stay);
        assert_eq!(c.digits()[2], None);
    }

    #[test]
    fn rejects_non_digit_input_without_state_change() {
        let mut c = active_challenge();
        c.record_digit(1, "4").unwrap();
        let before = c.digits();

        for bad in ["12", "a", " ", "٤", "1 "] {
            assert_eq!(c.record_digit(1, bad), Err(ValidationError::InvalidDigit));
            assert_eq!(c.digits(), before, "state must be unchanged for {bad:?}");
        }
    }

    #[test]
    fn rejects_out_of_range_slot() {
        let mut c = active_challenge();
        assert_eq!(c.record_digit(6, "1"), Err(ValidationError::SlotOutOfRange));
    }

    #[test]
    fn entered_code_requires_all_slots() {
        let mut c = active_challenge();
        fill_code(&mut c, "12345");
        assert_eq!(c.entered_code(), None);
        c.record_digit(5, "6").unwrap();
        assert_eq!(c.entered_code().as_deref(), Some("123456"));
    }

    #[test]
    fn tick_floors_at_zero() {
        let mut c = active_challenge();
        assert_eq!(c.cooldown_seconds_remaining(), RESEND_COOLDOWN_SECS);
        for _ in 0..RESEND_COOLDOWN_SECS + 10 {
            c.tick();
        }
        assert_eq!(c.cooldown_seconds_remaining(), 0);
    }

    #[test]
    fn verify_requires_complete_code() {
        let mut c = active_challenge();
        assert_eq!(c.begin_verify().unwrap_err(), OtpError::IncompleteCode);
        assert_eq!(c.status(), ChallengeStatus::CountingDown);
    }

    #[test]
    fn second_verify_is_refused_while_one_is_outstanding() {
        let mut c = active_challenge();
        fill_code(&mut c, "123456");
        c.begin_verify().unwrap();
        assert_eq!(c.begin_verify().unwrap_err(), OtpError::VerifyInFlight);
    }

    #[test]
    fn failed_verify_clears_digits_but_not_cooldown() {
        let mut c = active_challenge();
        c.tick();
        c.tick();
        let cooldown_before = c.cooldown_seconds_remaining();
        fill_code(&mut c, "123456");

        let (_code, epoch) = c.begin_verify().unwrap();
        let applied = c.finish_verify(epoch, &Err(OtpError::InvalidCode("Invalid OTP".into())));
        assert!(applied);
        assert_eq!(c.status(), ChallengeStatus::Failed);
        assert_eq!(c.digits(), [None; CODE_LEN]);
        assert_eq!(c.cooldown_seconds_remaining(), cooldown_before);
    }

    #[test]
    fn expired_verify_moves_to_expired() {
        let mut c = active_challenge();
        fill_code(&mut c, "123456");
        let (_code, epoch) = c.begin_verify().unwrap();
        c.finish_verify(epoch, &Err(OtpError::Expired));
        assert_eq!(c.status(), ChallengeStatus::Expired);
    }

    #[test]
    fn stale_verify_result_is_discarded() {
        let mut c = active_challenge();
        fill_code(&mut c, "123456");
        let (_code, epoch) = c.begin_verify().unwrap();

        c.dispose();
        assert!(!c.finish_verify(epoch, &Ok(())));
        assert_eq!(c.status(), ChallengeStatus::Idle);
    }

    #[test]
    fn resend_blocked_while_cooldown_runs() {
        let mut c = active_challenge();
        assert_eq!(
            c.begin_send().unwrap_err(),
            OtpError::CooldownActive(RESEND_COOLDOWN_SECS)
        );
    }

    #[test]
    fn resend_after_cooldown_resets_timer_and_digits() {
        let mut c = active_challenge();
        fill_code(&mut c, "123456");
        for _ in 0..RESEND_COOLDOWN_SECS {
            c.tick();
        }

        assert!(c.begin_send().unwrap());
        c.finish_send(&Ok(()));
        assert_eq!(c.cooldown_seconds_remaining(), RESEND_COOLDOWN_SECS);
        assert_eq!(c.digits(), [None; CODE_LEN]);
        assert_eq!(c.status(), ChallengeStatus::CountingDown);
    }

    #[test]
    fn concurrent_resend_is_a_no_op() {
        let mut c = active_challenge();
        for _ in 0..RESEND_COOLDOWN_SECS {
            c.tick();
        }
        assert!(c.begin_send().unwrap());
        // Second call while the first is still outstanding.
        assert!(!c.begin_send().unwrap());
    }

    #[test]
    fn resend_blocked_while_verify_outstanding() {
        let mut c = active_challenge();
        fill_code(&mut c, "123456");
        for _ in 0..RESEND_COOLDOWN_SECS {
            c.tick();
        }
        c.begin_verify().unwrap();
        assert_eq!(c.begin_send().unwrap_err(), OtpError::VerifyInFlight);
    }
}
