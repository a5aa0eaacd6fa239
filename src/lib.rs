//! Chunk Tower - pronunciation practice tower stacking game
//!
//! Core modules:
//! - `sim`: Deterministic game state machine (scoring, combo, tower, clock)
//! - `persistence`: Session records, store contract and questionnaire gating
//! - `platform`: Browser/native platform abstraction
//! - `tuning`: Data-driven game balance
//! - `settings`: Player preferences

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use settings::{PhraseOrder, Settings};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, timers are counted in ticks)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Ticks per simulated second
    pub const TICKS_PER_SECOND: u32 = 60;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Session length in seconds
    pub const SESSION_SECONDS: u32 = 120;
    /// Blocks needed to win when the clock runs out
    pub const WIN_BLOCK_COUNT: usize = 10;
    /// Fallen blocks tolerated; one more ends the session
    pub const MAX_FALLEN_BLOCKS: u32 = 5;

    /// Score thresholds (inclusive lower bounds)
    pub const PERFECT_THRESHOLD: f64 = 70.0;
    pub const MINOR_THRESHOLD: f64 = 40.0;

    /// Score deltas per outcome
    pub const PERFECT_POINTS: u64 = 100;
    pub const COMBO_PERFECT_POINTS: u64 = 150;
    pub const MINOR_POINTS: u64 = 50;
    pub const FAILURE_POINTS: u64 = 0;

    /// Consecutive Perfects needed for combo mode
    pub const COMBO_STREAK: u32 = 3;
    /// Combo mode idle timeout (seconds)
    pub const COMBO_TIMEOUT_SECS: u32 = 3;
    /// "Listen again" cooldown after each scored round (seconds)
    pub const COOLDOWN_SECS: u32 = 3;
    /// Max listening window before prompting again (seconds)
    pub const LISTEN_TIMEOUT_SECS: u32 = 10;

    /// Tower geometry
    pub const BLOCK_SPACING: f32 = 3.0;
    /// Height of the first block's center above the ground
    pub const BLOCK_BASE_Y: f32 = 1.5;

    /// Horizontal offset bounds (each axis, symmetric)
    pub const MINOR_OFFSET: f32 = 0.05;
    pub const FAILURE_OFFSET: f32 = 0.6;

    /// Initial tilt bounds (radians, x/z axes)
    pub const MINOR_TILT: f32 = 0.025;
    pub const FAILURE_TILT: f32 = 0.2;
}

/// Convert whole seconds to simulation ticks
#[inline]
pub fn secs_to_ticks(secs: u32) -> u64 {
    secs as u64 * consts::TICKS_PER_SECOND as u64
}

/// Format seconds as `m:ss` for the HUD
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(120), "2:00");
        assert_eq!(format_clock(59), "0:59");
        assert_eq!(format_clock(0), "0:00");
    }

    #[test]
    fn test_secs_to_ticks() {
        assert_eq!(secs_to_ticks(3), 180);
    }
}
