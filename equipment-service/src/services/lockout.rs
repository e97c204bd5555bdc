//! Per-account lockout state machine.
//!
//! States: `Active` (below threshold), `Locked` (threshold reached, lock
//! still in force) and `Recovering` (lock expired, counter not yet reset).
//! Every transition happens inside a store's atomic operation:
//! [`open_attempt`] before the password is checked,
//! [`LockoutPolicy::register_failure`] on a wrong password and
//! [`record_success`] on a right one. Nothing is decided from a user row read
//! earlier in the request.

use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;
use super::store::LoginGate;
use crate::models::{User, UserStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_failed_attempts: i32,
    pub lockout_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_duration: Duration::minutes(15),
        }
    }
}

impl From<&LockoutConfig> for LockoutPolicy {
    fn from(config: &LockoutConfig) -> Self {
        Self {
            max_failed_attempts: config.max_failed_attempts,
            lockout_duration: Duration::seconds(config.duration_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Active,
    Locked { until: DateTime<Utc> },
    Recovering,
}

impl LockoutState {
    pub fn of(user: &User, now: DateTime<Utc>) -> Self {
        match user.locked_until {
            Some(until) if now < until => LockoutState::Locked { until },
            Some(_) => LockoutState::Recovering,
            None if user.is_locked() => LockoutState::Recovering,
            None => LockoutState::Active,
        }
    }
}

/// Whole seconds left until `until`, rounded up, never negative.
pub fn remaining_seconds(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis + 999) / 1000
    }
}

fn clear_lock(user: &mut User, now: DateTime<Utc>) {
    user.failed_login_attempts = 0;
    user.locked_until = None;
    user.status = UserStatus::Active.as_str().to_string();
    user.updated_at = now;
}

/// Gate at the start of an attempt. An expired lock is reset here.
pub fn open_attempt(user: &mut User, now: DateTime<Utc>) -> LoginGate {
    match LockoutState::of(user, now) {
        LockoutState::Locked { until } => LoginGate::Locked {
            remaining_seconds: remaining_seconds(until, now),
        },
        LockoutState::Recovering => {
            clear_lock(user, now);
            LoginGate::Open
        }
        LockoutState::Active => LoginGate::Open,
    }
}

/// Records a verified password unless a lock engaged in the meantime.
pub fn record_success(user: &mut User, now: DateTime<Utc>) -> LoginGate {
    if let LockoutState::Locked { until } = LockoutState::of(user, now) {
        return LoginGate::Locked {
            remaining_seconds: remaining_seconds(until, now),
        };
    }

    clear_lock(user, now);
    user.last_login_at = Some(now);
    LoginGate::Open
}

impl LockoutPolicy {
    /// Applies one failed attempt to `user` in place.
    ///
    /// Callers must hold whatever exclusion their store needs so that the
    /// read of the counter and the write are one step.
    pub fn register_failure(&self, user: &mut User, now: DateTime<Utc>) -> super::LockoutStatus {
        if let LockoutState::Recovering = LockoutState::of(user, now) {
            clear_lock(user, now);
        }

        user.failed_login_attempts += 1;
        user.last_failed_login_at = Some(now);
        user.updated_at = now;

        if user.failed_login_attempts >= self.max_failed_attempts {
            let until = user
                .locked_until
                .filter(|until| *until > now)
                .unwrap_or(now + self.lockout_duration);
            user.locked_until = Some(until);
            user.status = UserStatus::Locked.as_str().to_string();
        }

        let remaining = user
            .locked_until
            .map(|until| remaining_seconds(until, now))
            .unwrap_or(0);

        super::LockoutStatus {
            is_locked: remaining > 0,
            remaining_seconds: remaining,
            failed_attempts: user.failed_login_attempts,
        }
    }
}
