// src/scheduler/poll.rs - Success/failure driven poll interval
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Nominal,
    Degraded,
}

/// Two-state resampling policy.
///
/// A failed status read while `Nominal` drops to the degraded interval; the
/// next successful read restores the nominal one. Transitions report `true`
/// only when the state actually changed, which is the caller's cue to re-arm
/// its timer.
#[derive(Debug, Clone, PartialEq)]
pub struct PollScheduler {
    nominal: Duration,
    degraded: Duration,
    state: PollState,
}

impl PollScheduler {
    pub fn new(nominal: Duration, degraded: Duration) -> Self {
        Self {
            nominal,
            degraded,
            state: PollState::Nominal,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn interval(&self) -> Duration {
        match self.state {
            PollState::Nominal => self.nominal,
            PollState::Degraded => self.degraded,
        }
    }

    pub fn nominal(&self) -> Duration {
        self.nominal
    }

    pub fn degraded(&self) -> Duration {
        self.degraded
    }

    pub fn on_success(&mut self) -> bool {
        self.transition(PollState::Nominal)
    }

    pub fn on_failure(&mut self) -> bool {
        self.transition(PollState::Degraded)
    }

    fn transition(&mut self, next: PollState) -> bool {
        if self.state == next {
            return false;
        }
        self.state = next;
        true
    }
}
