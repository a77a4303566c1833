//! Connect/reconnect bookkeeping, free of I/O.
//!
//! The connection manager feeds signals in (connect, open, failure, timer,
//! disconnect) and acts on what comes back. All attempt counting lives here.

use std::time::Duration;

use super::{BackoffPolicy, ConnectionState};
use crate::domain::foundation::{StateMachine, ValidationError};

/// What the manager must do after a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Enter `Reconnecting` and fire the next attempt after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// Attempts are exhausted; the lifecycle is now `Failed`.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct ConnectionLifecycle {
    state: ConnectionState,
    attempts: u32,
    policy: BackoffPolicy,
}

impl ConnectionLifecycle {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts scheduled since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Explicit `connect()`. Returns false (no-op) when already active.
    pub fn begin(&mut self) -> bool {
        if self.state.is_active() {
            return false;
        }
        self.attempts = 0;
        self.state = ConnectionState::Connecting;
        true
    }

    /// The transport signalled open.
    pub fn opened(&mut self) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(ConnectionState::Connected)?;
        self.attempts = 0;
        Ok(())
    }

    /// The transport errored or closed while connecting or connected.
    pub fn failed(&mut self) -> Result<FailureOutcome, ValidationError> {
        if self.policy.allows_retry(self.attempts) {
            self.state = self.state.transition_to(ConnectionState::Reconnecting)?;
            self.attempts += 1;
            Ok(FailureOutcome::Retry {
                attempt: self.attempts,
                delay: self.policy.delay(self.attempts),
            })
        } else {
            self.state = self.state.transition_to(ConnectionState::Failed)?;
            Ok(FailureOutcome::Exhausted)
        }
    }

    /// The backoff timer fired.
    pub fn retry_due(&mut self) -> Result<(), ValidationError> {
        if self.state != ConnectionState::Reconnecting {
            return Err(ValidationError::invalid_format(
                "state_transition",
                format!("Backoff timer fired in {:?}", self.state),
            ));
        }
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Explicit `disconnect()`. Returns whether the state changed.
    pub fn reset(&mut self) -> bool {
        self.attempts = 0;
        if self.state == ConnectionState::Disconnected {
            return false;
        }
        self.state = ConnectionState::Disconnected;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lifecycle(max: u32) -> ConnectionLifecycle {
        ConnectionLifecycle::new(BackoffPolicy::new(1000, max))
    }

    #[test]
    fn begin_moves_to_connecting_once() {
        let mut lc = lifecycle(3);
        assert!(lc.begin());
        assert_eq!(lc.state(), ConnectionState::Connecting);
        assert!(!lc.begin());
    }

    #[test]
    fn open_resets_attempts() {
        let mut lc = lifecycle(3);
        lc.begin();
        lc.failed().unwrap();
        lc.retry_due().unwrap();
        assert_eq!(lc.attempts(), 1);

        lc.opened().unwrap();
        assert_eq!(lc.state(), ConnectionState::Connected);
        assert_eq!(lc.attempts(), 0);
    }

    #[test]
    fn failures_schedule_doubling_delays_then_exhaust() {
        let mut lc = lifecycle(3);
        lc.begin();

        let mut delays = Vec::new();
        loop {
            match lc.failed().unwrap() {
                FailureOutcome::Retry { delay, .. } => {
                    delays.push(delay.as_millis() as u64);
                    assert_eq!(lc.state(), ConnectionState::Reconnecting);
                    lc.retry_due().unwrap();
                }
                FailureOutcome::Exhausted => break,
            }
        }

        assert_eq!(delays, vec![1000, 2000, 4000]);
        assert_eq!(lc.state(), ConnectionState::Failed);
        assert!(lc.retry_due().is_err());
    }

    #[test]
    fn failed_exits_only_through_begin() {
        let mut lc = lifecycle(0);
        lc.begin();
        assert_eq!(lc.failed().unwrap(), FailureOutcome::Exhausted);
        assert!(lc.opened().is_err());

        assert!(lc.begin());
        assert_eq!(lc.state(), ConnectionState::Connecting);
        assert_eq!(lc.attempts(), 0);
    }

    #[test]
    fn connected_drop_starts_fresh_backoff() {
        let mut lc = lifecycle(5);
        lc.begin();
        lc.failed().unwrap();
        lc.retry_due().unwrap();
        lc.failed().unwrap();
        lc.retry_due().unwrap();
        lc.opened().unwrap();

        assert_eq!(
            lc.failed().unwrap(),
            FailureOutcome::Retry {
                attempt: 1,
                delay: Duration::from_millis(1000)
            }
        );
    }

    #[test]
    fn reset_from_any_state() {
        let mut lc = lifecycle(2);
        assert!(!lc.reset());
        lc.begin();
        lc.failed().unwrap();
        assert!(lc.reset());
        assert_eq!(lc.state(), ConnectionState::Disconnected);
        assert_eq!(lc.attempts(), 0);
    }
}
