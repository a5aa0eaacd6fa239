//! Tick-based scheduled deadlines
//!
//! The only deliberate delays in the game (the listen-again cooldown and the
//! combo expiry) are stored as absolute tick deadlines tagged with the session
//! epoch and an arm generation. A deadline only fires for the token it was
//! armed with, so anything scheduled before a reset or re-arm is inert.

use serde::{Deserialize, Serialize};

/// Identity of one arming of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerToken {
    /// Session epoch the timer belongs to
    pub epoch: u64,
    /// Incremented every time the timer is (re-)armed
    pub generation: u32,
}

/// A cancellable one-shot deadline measured in simulation ticks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deadline {
    armed: Option<(u64, TimerToken)>,
    generation: u32,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) to fire at `due_tick`; replaces any pending arm
    pub fn arm(&mut self, due_tick: u64, epoch: u64) -> TimerToken {
        self.generation = self.generation.wrapping_add(1);
        let token = TimerToken {
            epoch,
            generation: self.generation,
        };
        self.armed = Some((due_tick, token));
        token
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Tick at which the pending arm fires
    pub fn due_tick(&self) -> Option<u64> {
        self.armed.map(|(due, _)| due)
    }

    /// Fire if due for the current epoch. Disarms on fire and drops arms
    /// left over from another epoch without firing them.
    pub fn poll(&mut self, now_tick: u64, epoch: u64) -> Option<TimerToken> {
        let (due, token) = self.armed?;
        if token.epoch != epoch {
            log::debug!(
                "Dropping stale timer from epoch {} (current {})",
                token.epoch,
                epoch
            );
            self.armed = None;
            return None;
        }
        if now_tick < due {
            return None;
        }
        self.armed = None;
        Some(token)
    }
}
