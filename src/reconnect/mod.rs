mod policy;

pub use policy::ReconnectPolicy;

use std::time::Duration;

/// What to do after an unexpected close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Open a fresh connection after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// The ceiling was reached; stop.
    Exhausted { attempts: u32 },
}

/// Retry state for consecutive unexpected closes.
///
/// The attempt counter only moves on unexpected closes and successful opens;
/// intentional disconnects go through [`ReconnectController::reset`].
#[derive(Debug, Clone)]
pub struct ReconnectController {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl ReconnectController {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Attempts made since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Record an unexpected close and decide on the next attempt.
    pub fn on_unexpected_close(&mut self) -> ReconnectDecision {
        let next = self.attempt.saturating_add(1);
        if next > self.policy.max_attempts {
            let attempts = self.attempt;
            self.attempt = 0;
            return ReconnectDecision::Exhausted { attempts };
        }
        self.attempt = next;
        ReconnectDecision::Retry {
            attempt: next,
            delay: self.policy.delay_for(next),
        }
    }

    /// A connection opened successfully.
    pub fn on_open(&mut self) {
        self.attempt = 0;
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
