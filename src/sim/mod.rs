//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Timers are tick deadlines, never wall-clock callbacks
//! - No rendering, audio or platform dependencies

pub mod combo;
pub mod phrases;
pub mod scoring;
pub mod state;
pub mod tick;
pub mod timer;
pub mod tower;

pub use combo::{ComboChange, ComboTracker};
pub use phrases::{DEFAULT_PHRASES, PhraseSequencer};
pub use scoring::{Outcome, ScoreInput, SpeechResult, classify, classify_with, points_for};
pub use state::{Cue, EndReason, GameEvent, GamePhase, GameState, OutcomeLevel, Verdict};
pub use tick::{
    BlockTelemetry, InputEvent, TickInput, exit_game, record_score, report_block_fall, start_game,
    tick, trigger_collapse,
};
pub use timer::{Deadline, TimerToken};
pub use tower::{Block, BlockStyle, DriftHold, FallDetector, FallReport, Stability, Tower};
