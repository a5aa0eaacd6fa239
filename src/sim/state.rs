//! Game state and core simulation types
//!
//! `GameState` is the single owned aggregate for one play-through. It is only
//! mutated through the operations in `tick`, which keeps every observable
//! change atomic with respect to the others.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::combo::ComboTracker;
use super::phrases::PhraseSequencer;
use super::scoring::Outcome;
use super::timer::Deadline;
use super::tower::Tower;
use crate::tuning::Tuning;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Start screen, nothing is scored yet
    NotStarted,
    /// Listening window open, one score accepted
    Playing,
    /// Cooldown after a scored round
    WaitingForNextPrompt,
    /// Terminal
    Ended,
}

impl GamePhase {
    /// Phases in which the session clock runs
    pub fn is_live(&self) -> bool {
        matches!(self, GamePhase::Playing | GamePhase::WaitingForNextPrompt)
    }
}

/// Last scored outcome, drives feedback colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutcomeLevel {
    #[default]
    Neutral,
    Perfect,
    Minor,
    Failure,
}

impl From<Outcome> for OutcomeLevel {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Perfect => OutcomeLevel::Perfect,
            Outcome::Minor => OutcomeLevel::Minor,
            Outcome::Failure => OutcomeLevel::Failure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Win,
    Loss,
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    TimeUp,
    TooManyFalls,
    Collapsed,
    Exited,
}

/// Sound cue keyed by event type (fire-and-forget)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    Perfect,
    Minor,
    Failure,
    Combo,
    Collapse,
}

/// Things that happened during a tick, for audio and session sync
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PhaseChanged { from: GamePhase, to: GamePhase },
    BlockPlaced { id: u32, outcome: Outcome },
    ComboActivated,
    ComboExpired,
    ComboBroken,
    BlockFell { id: u32, fallen: u32 },
    ListenTimedOut,
    GameOver { verdict: Verdict, reason: EndReason },
}

impl GameEvent {
    pub fn cue(&self) -> Option<Cue> {
        match self {
            GameEvent::BlockPlaced { outcome, .. } => Some(match outcome {
                Outcome::Perfect => Cue::Perfect,
                Outcome::Minor => Cue::Minor,
                Outcome::Failure => Cue::Failure,
            }),
            GameEvent::ComboActivated => Some(Cue::Combo),
            GameEvent::GameOver {
                reason: EndReason::TooManyFalls | EndReason::Collapsed,
                ..
            } => Some(Cue::Collapse),
            _ => None,
        }
    }
}

pub const START_PROMPT: &str = "Press A, S, or D to start building!";

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub(super) seed: u64,
    /// Session identity; scheduled timers from other epochs are inert
    pub(super) epoch: u64,
    pub(super) rng: Pcg32,
    pub(super) tuning: Tuning,
    pub(super) phase: GamePhase,
    pub(super) score: u64,
    pub(super) combo: ComboTracker,
    /// Seconds left on the session clock
    pub(super) time_remaining: u32,
    /// Ticks elapsed while the clock was running
    pub(super) time_ticks: u64,
    /// Ticks into the current clock second
    pub(super) second_ticks: u32,
    pub(super) tower: Tower,
    pub(super) phrases: PhraseSequencer,
    pub(super) outcome_level: OutcomeLevel,
    pub(super) feedback: String,
    pub(super) verdict: Option<Verdict>,
    pub(super) end_reason: Option<EndReason>,
    /// Listen-again cooldown (WaitingForNextPrompt -> Playing)
    pub(super) cooldown: Deadline,
    /// Tick at which the current listening window opened
    pub(super) listen_opened_at: u64,
    /// Events since the last drain
    #[serde(skip)]
    pub(super) events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// Create a new game state with the given seed and default balance
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, Tuning::default(), PhraseSequencer::default())
    }

    pub fn with_config(seed: u64, tuning: Tuning, phrases: PhraseSequencer) -> Self {
        Self::fresh(seed, 0, tuning, phrases)
    }

    fn fresh(seed: u64, epoch: u64, tuning: Tuning, mut phrases: PhraseSequencer) -> Self {
        phrases.rewind();
        Self {
            seed,
            epoch,
            rng: Pcg32::seed_from_u64(seed),
            time_remaining: tuning.session_secs,
            tuning,
            phase: GamePhase::NotStarted,
            score: 0,
            combo: ComboTracker::new(),
            time_ticks: 0,
            second_ticks: 0,
            tower: Tower::new(),
            phrases,
            outcome_level: OutcomeLevel::Neutral,
            feedback: START_PROMPT.to_string(),
            verdict: None,
            end_reason: None,
            cooldown: Deadline::new(),
            listen_opened_at: 0,
            events: Vec::new(),
            next_id: 1,
        }
    }

    /// Discard everything and return to `NotStarted` under a new epoch.
    /// Tuning and the phrase list carry over; pending timers do not.
    pub fn reset(&mut self, seed: u64) {
        let tuning = self.tuning.clone();
        let phrases = self.phrases.clone();
        // Undrained events from the old session go with it
        *self = Self::fresh(seed, self.epoch + 1, tuning, phrases);
        log::info!("Session reset (epoch {}, seed {})", self.epoch, seed);
    }

    /// Swap in new balance before the session starts. Keeps seed, epoch and
    /// phrase list; returns false once play has begun.
    pub fn retune(&mut self, tuning: Tuning) -> bool {
        if self.phase != GamePhase::NotStarted {
            return false;
        }
        let phrases = self.phrases.clone();
        *self = Self::fresh(self.seed, self.epoch, tuning, phrases);
        true
    }

    /// Allocate a new block ID
    pub(super) fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(super) fn set_phase(&mut self, to: GamePhase) {
        let from = self.phase;
        if from == to {
            return;
        }
        self.phase = to;
        log::debug!("Phase {:?} -> {:?}", from, to);
        self.events.push(GameEvent::PhaseChanged { from, to });
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == GamePhase::Ended
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn combo_streak(&self) -> u32 {
        self.combo.streak()
    }

    pub fn combo_active(&self) -> bool {
        self.combo.is_active()
    }

    pub fn combo(&self) -> &ComboTracker {
        &self.combo
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    pub fn tower(&self) -> &Tower {
        &self.tower
    }

    pub fn fallen_count(&self) -> u32 {
        self.tower.fallen_count()
    }

    pub fn current_phrase(&self) -> &str {
        self.phrases.current()
    }

    pub fn phrase_index(&self) -> usize {
        self.phrases.index()
    }

    pub fn outcome_level(&self) -> OutcomeLevel {
        self.outcome_level
    }

    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    /// Whether the listen-again cooldown is pending
    pub fn cooldown_pending(&self) -> bool {
        self.cooldown.is_armed()
    }

    /// Take the events produced since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }
}
