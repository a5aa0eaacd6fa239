//! Consecutive-Perfect combo tracking
//!
//! Three Perfects in a row switch on combo mode, which pays a bonus for every
//! further Perfect. Any Minor/Failure breaks it immediately and resets the
//! streak. Otherwise it expires once the player spends the idle timeout in an
//! open listening window without landing another Perfect; the streak survives
//! expiry, so the next Perfect switches combo mode back on.

use serde::{Deserialize, Serialize};

use super::scoring::Outcome;
use super::timer::Deadline;

/// What changed in the combo after one outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboChange {
    None,
    /// Streak at or past the activation count while combo mode was off
    Activated,
    /// Perfect while active, idle timer disarmed until the next window
    Extended,
    /// Non-Perfect outcome ended an active combo
    Broken,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComboTracker {
    streak: u32,
    active: bool,
    expiry: Deadline,
}

impl ComboTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Tick at which combo mode will expire, if the idle timer is running
    pub fn expires_at(&self) -> Option<u64> {
        self.expiry.due_tick()
    }

    /// Apply an outcome
    pub fn record(&mut self, outcome: Outcome, activation_streak: u32) -> ComboChange {
        match outcome {
            Outcome::Perfect => {
                self.streak += 1;
                if self.active {
                    self.expiry.cancel();
                    ComboChange::Extended
                } else if self.streak >= activation_streak {
                    self.active = true;
                    ComboChange::Activated
                } else {
                    ComboChange::None
                }
            }
            Outcome::Minor | Outcome::Failure => {
                let was_active = self.active;
                self.clear();
                if was_active {
                    ComboChange::Broken
                } else {
                    ComboChange::None
                }
            }
        }
    }

    /// Start the idle countdown when a listening window opens. No-op when
    /// inactive or when a countdown is already running.
    pub fn arm_idle(&mut self, due_tick: u64, epoch: u64) {
        if self.active && !self.expiry.is_armed() {
            self.expiry.arm(due_tick, epoch);
        }
    }

    /// Expire combo mode if its idle deadline passed. Returns true on expiry.
    /// The streak is left alone.
    pub fn poll_expiry(&mut self, now_tick: u64, epoch: u64) -> bool {
        if self.expiry.poll(now_tick, epoch).is_some() && self.active {
            self.active = false;
            return true;
        }
        false
    }

    /// Drop streak, mode and any pending expiry
    pub fn clear(&mut self) {
        self.streak = 0;
        self.active = false;
        self.expiry.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: u64 = 180;

    fn activated() -> ComboTracker {
        let mut combo = ComboTracker::new();
        for _ in 0..3 {
            combo.record(Outcome::Perfect, 3);
        }
        combo
    }

    #[test]
    fn test_activates_on_third_perfect() {
        let mut combo = ComboTracker::new();
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::None);
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::None);
        assert!(!combo.is_active());
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::Activated);
        assert!(combo.is_active());
        assert_eq!(combo.streak(), 3);
        assert_eq!(combo.expires_at(), None);
    }

    #[test]
    fn test_break_on_minor_or_failure() {
        for outcome in [Outcome::Minor, Outcome::Failure] {
            let mut combo = activated();
            combo.arm_idle(TIMEOUT, 1);
            assert_eq!(combo.record(outcome, 3), ComboChange::Broken);
            assert!(!combo.is_active());
            assert_eq!(combo.streak(), 0);
            assert_eq!(combo.expires_at(), None);
        }
    }

    #[test]
    fn test_expires_after_idle_timeout() {
        let mut combo = activated();
        combo.arm_idle(10 + TIMEOUT, 1);
        assert!(!combo.poll_expiry(10 + TIMEOUT - 1, 1));
        assert!(combo.is_active());
        assert!(combo.poll_expiry(10 + TIMEOUT, 1));
        assert!(!combo.is_active());
        assert_eq!(combo.streak(), 3);
    }

    #[test]
    fn test_arm_idle_does_not_push_back_running_timer() {
        let mut combo = activated();
        combo.arm_idle(100, 1);
        combo.arm_idle(500, 1);
        assert_eq!(combo.expires_at(), Some(100));
    }

    #[test]
    fn test_arm_idle_ignored_when_inactive() {
        let mut combo = ComboTracker::new();
        combo.record(Outcome::Perfect, 3);
        combo.arm_idle(100, 1);
        assert_eq!(combo.expires_at(), None);
    }

    #[test]
    fn test_perfect_while_active_disarms_timer() {
        let mut combo = activated();
        combo.arm_idle(100, 1);
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::Extended);
        assert_eq!(combo.expires_at(), None);
        assert!(!combo.poll_expiry(1000, 1));
        assert!(combo.is_active());
    }

    #[test]
    fn test_unbroken_streak_reactivates_after_expiry() {
        let mut combo = activated();
        combo.arm_idle(100, 1);
        assert!(combo.poll_expiry(100, 1));
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::Activated);
        assert!(combo.is_active());
        assert_eq!(combo.streak(), 4);

        // A fresh idle countdown is armed by the next window
        combo.arm_idle(400, 1);
        assert_eq!(combo.expires_at(), Some(400));
    }

    #[test]
    fn test_break_after_expiry_needs_fresh_streak() {
        let mut combo = activated();
        combo.arm_idle(100, 1);
        assert!(combo.poll_expiry(100, 1));
        assert_eq!(combo.record(Outcome::Minor, 3), ComboChange::None);
        assert_eq!(combo.streak(), 0);
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::None);
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::None);
        assert_eq!(combo.record(Outcome::Perfect, 3), ComboChange::Activated);
    }

    #[test]
    fn test_expiry_from_old_epoch_never_fires() {
        let mut combo = activated();
        combo.arm_idle(100, 1);
        assert!(!combo.poll_expiry(10_000, 2));
    }
}
