//! Pronunciation score classification
//!
//! Turns the speech collaborator's continuous 0-100 fluency score into one of
//! three discrete outcomes. Manual key input bypasses the numeric path.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Discrete pronunciation quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Perfect,
    Minor,
    Failure,
}

impl Outcome {
    /// Manual fallback keys (A = Perfect, S = Minor, D = Failure)
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_lowercase().as_str() {
            "a" => Some(Outcome::Perfect),
            "s" => Some(Outcome::Minor),
            "d" => Some(Outcome::Failure),
            _ => None,
        }
    }
}

/// Result of one listening window from the speech collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SpeechResult {
    /// Fluency score, nominally 0-100
    Scored(f64),
    /// Recognition failed or produced no usable score
    Failed,
}

impl SpeechResult {
    /// Map a raw collaborator value; NaN, infinities and negative sentinels are failures
    pub fn from_raw(raw: f64) -> Self {
        if raw.is_finite() && raw >= 0.0 {
            SpeechResult::Scored(raw)
        } else {
            SpeechResult::Failed
        }
    }
}

/// One scoring event fed into the state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScoreInput {
    /// Numeric score from the speech collaborator
    Speech(f64),
    /// Discrete outcome from the keyboard fallback
    Manual(Outcome),
}

impl ScoreInput {
    /// Resolve to an outcome using the configured thresholds
    pub fn outcome(&self, tuning: &Tuning) -> Outcome {
        match *self {
            ScoreInput::Speech(raw) => classify_with(raw, tuning),
            ScoreInput::Manual(outcome) => outcome,
        }
    }
}

/// Classify with default thresholds
pub fn classify(raw: f64) -> Outcome {
    classify_with(raw, &Tuning::default())
}

/// Classify with explicit tuning. Scores are clamped to [0, 100] when
/// `clamp_scores` is set; NaN never reaches a threshold and lands on Failure.
pub fn classify_with(raw: f64, tuning: &Tuning) -> Outcome {
    let score = if tuning.clamp_scores {
        raw.clamp(0.0, 100.0)
    } else {
        raw
    };

    if score >= tuning.perfect_threshold {
        Outcome::Perfect
    } else if score >= tuning.minor_threshold {
        Outcome::Minor
    } else {
        Outcome::Failure
    }
}

/// Points for an outcome; `combo_active` is the combo state *before* this outcome
pub fn points_for(outcome: Outcome, combo_active: bool, tuning: &Tuning) -> u64 {
    match outcome {
        Outcome::Perfect if combo_active => tuning.combo_perfect_points,
        Outcome::Perfect => tuning.perfect_points,
        Outcome::Minor => tuning.minor_points,
        Outcome::Failure => tuning.failure_points,
    }
}
