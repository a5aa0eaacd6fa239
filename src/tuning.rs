//! Data-driven game balance
//!
//! Every gameplay number the state machine consults lives here so a level
//! designer can ship a JSON override without touching the simulation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

/// Errors from loading a tuning override
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("Malformed tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid tuning: {0}")]
    Invalid(String),
}

/// Game balance knobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Clamp raw pronunciation scores to [0, 100] before classifying
    pub clamp_scores: bool,
    pub perfect_threshold: f64,
    pub minor_threshold: f64,

    pub perfect_points: u64,
    pub combo_perfect_points: u64,
    pub minor_points: u64,
    pub failure_points: u64,

    pub combo_streak: u32,
    pub combo_timeout_secs: u32,
    pub cooldown_secs: u32,
    pub listen_timeout_secs: u32,

    pub session_secs: u32,
    pub win_block_count: usize,
    pub max_fallen_blocks: u32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            clamp_scores: true,
            perfect_threshold: PERFECT_THRESHOLD,
            minor_threshold: MINOR_THRESHOLD,

            perfect_points: PERFECT_POINTS,
            combo_perfect_points: COMBO_PERFECT_POINTS,
            minor_points: MINOR_POINTS,
            failure_points: FAILURE_POINTS,

            combo_streak: COMBO_STREAK,
            combo_timeout_secs: COMBO_TIMEOUT_SECS,
            cooldown_secs: COOLDOWN_SECS,
            listen_timeout_secs: LISTEN_TIMEOUT_SECS,

            session_secs: SESSION_SECONDS,
            win_block_count: WIN_BLOCK_COUNT,
            max_fallen_blocks: MAX_FALLEN_BLOCKS,
        }
    }
}

impl Tuning {
    /// Parse a (possibly partial) JSON override; missing fields keep defaults
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject combinations the state machine cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.minor_threshold < self.perfect_threshold) {
            return Err(TuningError::Invalid(format!(
                "minor_threshold ({}) must be below perfect_threshold ({})",
                self.minor_threshold, self.perfect_threshold
            )));
        }
        if self.combo_streak == 0 {
            return Err(TuningError::Invalid("combo_streak must be at least 1".into()));
        }
        if self.session_secs == 0 {
            return Err(TuningError::Invalid("session_secs must be positive".into()));
        }
        if self.listen_timeout_secs == 0 {
            return Err(TuningError::Invalid(
                "listen_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let tuning = Tuning::from_json(r#"{ "session_secs": 60, "clamp_scores": false }"#)
            .expect("valid override");
        assert_eq!(tuning.session_secs, 60);
        assert!(!tuning.clamp_scores);
        assert_eq!(tuning.perfect_points, PERFECT_POINTS);
        assert_eq!(tuning.win_block_count, WIN_BLOCK_COUNT);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = Tuning::from_json(r#"{ "perfect_threshold": 30.0 }"#).unwrap_err();
        assert!(matches!(err, TuningError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        let err = Tuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
    }
}
