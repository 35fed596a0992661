//! Pure lockout policy arithmetic.
//!
//! Failures are counted while each one lands within `window` of the previous
//! one. Reaching `max_failed_attempts` locks the account for `lockout`. While
//! locked, further failures are ignored; once the lock has lifted, the next
//! failure starts a fresh count at 1.

use chrono::{DateTime, Duration, Utc};

use keyward_core::config::LockoutConfig;
use keyward_entity::account::Account;

/// Lockout state reported after a failure is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// Login still permitted.
    Unlocked {
        /// Failures counted in the current window.
        failed_attempts: u32,
        /// Failures left before the lock engages.
        remaining_attempts: u32,
    },
    /// Login refused until `until`.
    Locked {
        /// When the lock lifts.
        until: DateTime<Utc>,
    },
}

impl LockState {
    /// Whether this state refuses login.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

/// What recording one failure does to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDecision {
    /// The account is already locked; nothing changes.
    AlreadyLocked {
        /// When the existing lock lifts.
        until: DateTime<Utc>,
    },
    /// Store the new counter; `locked_until` is set when this failure locks.
    Count {
        /// New consecutive-failure count.
        failed_attempts: u32,
        /// Lock expiry if this failure reached the threshold.
        locked_until: Option<DateTime<Utc>>,
    },
}

/// Threshold, window and lock duration.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_failed_attempts: u32,
    window: Duration,
    lockout: Duration,
}

impl LockoutPolicy {
    /// Creates a policy from raw values.
    pub fn new(max_failed_attempts: u32, window: Duration, lockout: Duration) -> Self {
        Self {
            max_failed_attempts: max_failed_attempts.max(1),
            window,
            lockout,
        }
    }

    /// Creates a policy from configuration.
    pub fn from_config(config: &LockoutConfig) -> Self {
        Self::new(
            config.max_failed_attempts,
            Duration::minutes(config.window_minutes as i64),
            Duration::minutes(config.lockout_minutes as i64),
        )
    }

    /// Failure threshold.
    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    /// Decides what one more failure at `now` does to `account`.
    pub fn next_failure(&self, account: &Account, now: DateTime<Utc>) -> FailureDecision {
        if let Some(until) = account.locked_until.filter(|until| *until > now) {
            return FailureDecision::AlreadyLocked { until };
        }

        let previous = account.failed_attempts.max(0) as u32;
        let lock_lifted = account.locked_until.is_some();
        let window_elapsed = account
            .last_failed_at
            .is_none_or(|last| now - last >= self.window);

        let failed_attempts = if lock_lifted || window_elapsed {
            1
        } else {
            previous.saturating_add(1)
        };

        let locked_until = (failed_attempts >= self.max_failed_attempts).then(|| now + self.lockout);
        FailureDecision::Count {
            failed_attempts,
            locked_until,
        }
    }

    /// The state a decision leaves the account in.
    pub fn state_after(&self, decision: FailureDecision) -> LockState {
        match decision {
            FailureDecision::AlreadyLocked { until }
            | FailureDecision::Count {
                locked_until: Some(until),
                ..
            } => LockState::Locked { until },
            FailureDecision::Count {
                failed_attempts,
                locked_until: None,
            } => LockState::Unlocked {
                failed_attempts,
                remaining_attempts: self.max_failed_attempts.saturating_sub(failed_attempts),
            },
        }
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from_config(&LockoutConfig::default())
    }
}
