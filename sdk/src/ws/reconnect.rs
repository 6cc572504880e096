//! Reconnect policy and connection phase state machine.
//!
//! Backoff is owned by each subscription, not by the pool: the pool only
//! reports that a socket went away, and every subscription decides on its
//! own whether and when to re-acquire.

use std::fmt;
use std::time::Duration;

use super::config::WsConfig;

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Ceiling for any single delay.
    pub max_delay: Duration,

    /// Maximum consecutive attempts.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&WsConfig::default())
    }
}

impl ReconnectPolicy {
    /// Creates a policy from the WebSocket configuration.
    #[must_use]
    pub fn from_config(config: &WsConfig) -> Self {
        Self {
            base_delay: config.reconnect_delay,
            max_delay: config.max_reconnect_delay,
            max_attempts: config.max_reconnect_attempts,
        }
    }

    /// Returns the delay before the given 1-based attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exponent;
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

/// Observable phase of a subscription's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No connection wanted or the connection ended normally.
    #[default]
    Idle,

    /// Resolving a credential or opening the socket.
    Connecting,

    /// Registered on an open pooled socket.
    Open,

    /// Waiting before the next attempt.
    Reconnecting {
        /// 1-based attempt about to be made.
        attempt: u32,
        /// Delay before that attempt.
        delay: Duration,
    },

    /// Attempts exhausted; terminal until restarted.
    Failed,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting { attempt, delay } => {
                write!(f, "reconnecting (attempt {} in {:?})", attempt, delay)
            }
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Decision after a failed attempt or abnormal closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for `delay`, then try again.
    Retry {
        /// 1-based attempt number.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },

    /// Give up.
    GiveUp {
        /// Attempts made.
        attempts: u32,
    },
}

/// Connection phase state machine.
#[derive(Debug, Clone)]
pub struct ReconnectState {
    policy: ReconnectPolicy,
    phase: ConnectionPhase,
    attempts: u32,
}

impl ReconnectState {
    /// Creates a state machine in the idle phase.
    #[must_use]
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            phase: ConnectionPhase::Idle,
            attempts: 0,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub const fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// Returns the consecutive failed attempts so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// A connection attempt starts.
    pub fn on_connect_started(&mut self) -> ConnectionPhase {
        self.phase = ConnectionPhase::Connecting;
        self.phase
    }

    /// The socket opened and the subscriber is registered.
    pub fn on_open(&mut self) -> ConnectionPhase {
        self.attempts = 0;
        self.phase = ConnectionPhase::Open;
        self.phase
    }

    /// The attempt failed or the open socket closed abnormally.
    pub fn on_failure(&mut self) -> RetryDecision {
        if self.attempts >= self.policy.max_attempts {
            self.phase = ConnectionPhase::Failed;
            return RetryDecision::GiveUp {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        let delay = self.policy.delay_for(self.attempts);
        self.phase = ConnectionPhase::Reconnecting {
            attempt: self.attempts,
            delay,
        };
        RetryDecision::Retry {
            attempt: self.attempts,
            delay,
        }
    }

    /// The socket closed normally; no retry.
    pub fn on_normal_close(&mut self) -> ConnectionPhase {
        self.attempts = 0;
        self.phase = ConnectionPhase::Idle;
        self.phase
    }
}
