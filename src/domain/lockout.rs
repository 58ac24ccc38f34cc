//! Failed-login lockout policy.
//!
//! Pure decision logic; persistence of the counter lives in the user
//! repository. After `max_attempts` consecutive failures the account is
//! locked for `window` measured from the last failure. Stale counters are
//! only cleared when the next login attempt arrives.

use chrono::{DateTime, Duration, Utc};

use crate::config::LockoutConfig;

const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_attempts: u32,
    window: Duration,
}

/// Counter snapshot read from the user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptState {
    pub failed_attempts: u32,
    pub last_failed: Option<DateTime<Utc>>,
}

/// What to do with a login attempt before checking the password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Reject without verifying credentials.
    Locked { until: DateTime<Utc> },
    /// Verify credentials. `reset_counter` is set when an earlier window has
    /// elapsed and the stored counter must be zeroed first.
    Proceed { reset_counter: bool },
}

/// Outcome recorded after a failed credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    AttemptsRemaining(u32),
    Locked { until: DateTime<Utc> },
}

impl LockoutPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
        }
    }

    #[must_use]
    pub fn from_config(config: &LockoutConfig) -> Self {
        let window = i64::try_from(config.lockout_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::days(MAX_WINDOW_DAYS));
        Self::new(config.max_attempts, window.min(Duration::days(MAX_WINDOW_DAYS)))
    }

    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    #[must_use]
    pub fn check(&self, state: AttemptState, now: DateTime<Utc>) -> Gate {
        let Some(last_failed) = state.last_failed else {
            return Gate::Proceed {
                reset_counter: state.failed_attempts > 0,
            };
        };

        let deadline = last_failed + self.window;
        if now < deadline {
            if state.failed_attempts >= self.max_attempts {
                return Gate::Locked { until: deadline };
            }
            return Gate::Proceed {
                reset_counter: false,
            };
        }

        Gate::Proceed {
            reset_counter: state.failed_attempts > 0,
        }
    }

    /// `failed_attempts` is the counter value after the increment.
    #[must_use]
    pub fn after_failure(&self, failed_attempts: u32, now: DateTime<Utc>) -> FailureOutcome {
        if failed_attempts >= self.max_attempts {
            FailureOutcome::Locked {
                until: now + self.window,
            }
        } else {
            FailureOutcome::AttemptsRemaining(self.max_attempts - failed_attempts)
        }
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::new(5, Duration::hours(24))
    }
}

/// Formats a remaining lockout duration as `"{H}h {M}m"`, rounding
/// partial minutes up so a live lock never reads `0h 0m`.
#[must_use]
pub fn format_remaining(remaining: Duration) -> String {
    let seconds = remaining.num_seconds().max(0);
    let total_minutes = (seconds + 59) / 60;
    format!("{}h {}m", total_minutes / 60, total_minutes % 60)
}

#[must_use]
pub fn locked_message(remaining: Duration) -> String {
    format!(
        "Account locked due to too many failed login attempts. Try again in {}.",
        format_remaining(remaining)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hours: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap() + Duration::hours(hours)
    }

    #[test]
    fn fresh_account_proceeds_without_reset() {
        let policy = LockoutPolicy::default();
        let state = AttemptState {
            failed_attempts: 0,
            last_failed: None,
        };
        assert_eq!(
            policy.check(state, at(0)),
            Gate::Proceed {
                reset_counter: false
            }
        );
    }

    #[test]
    fn fifth_failure_locks_for_window() {
        let policy = LockoutPolicy::default();

        assert_eq!(
            policy.after_failure(4, at(0)),
            FailureOutcome::AttemptsRemaining(1)
        );
        assert_eq!(
            policy.after_failure(5, at(0)),
            FailureOutcome::Locked { until: at(24) }
        );
    }

    #[test]
    fn locked_inside_window() {
        let policy = LockoutPolicy::default();
        let state = AttemptState {
            failed_attempts: 5,
            last_failed: Some(at(0)),
        };

        assert_eq!(policy.check(state, at(1)), Gate::Locked { until: at(24) });
        assert_eq!(
            policy.check(state, at(24) - Duration::seconds(1)),
            Gate::Locked { until: at(24) }
        );
    }

    #[test]
    fn window_elapsed_resets_counter() {
        let policy = LockoutPolicy::default();
        let state = AttemptState {
            failed_attempts: 5,
            last_failed: Some(at(0)),
        };

        assert_eq!(
            policy.check(state, at(24)),
            Gate::Proceed {
                reset_counter: true
            }
        );
    }

    #[test]
    fn partial_failures_inside_window_are_kept() {
        let policy = LockoutPolicy::default();
        let state = AttemptState {
            failed_attempts: 3,
            last_failed: Some(at(0)),
        };

        assert_eq!(
            policy.check(state, at(2)),
            Gate::Proceed {
                reset_counter: false
            }
        );
        assert_eq!(
            policy.check(state, at(30)),
            Gate::Proceed {
                reset_counter: true
            }
        );
    }

    #[test]
    fn remaining_time_formatting() {
        assert_eq!(format_remaining(Duration::hours(24)), "24h 0m");
        assert_eq!(
            format_remaining(Duration::hours(3) + Duration::minutes(7)),
            "3h 7m"
        );
        assert_eq!(format_remaining(Duration::seconds(30)), "0h 1m");
        assert_eq!(format_remaining(Duration::seconds(-5)), "0h 0m");
        assert!(locked_message(Duration::minutes(90)).ends_with("Try again in 1h 30m."));
    }

    #[test]
    fn policy_from_config() {
        let config = LockoutConfig {
            max_attempts: 3,
            lockout_seconds: 600,
        };
        let policy = LockoutPolicy::from_config(&config);
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.window(), Duration::minutes(10));
    }
}
