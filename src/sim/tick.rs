//! Fixed timestep simulation tick
//!
//! Every asynchronous producer (speech scoring, physics telemetry, key
//! presses, timers) funnels into a `TickInput` that is applied here in arrival
//! order. Invalid transitions are ignored rather than reported, so racing
//! callbacks cannot corrupt a session.

use glam::Vec3;

use super::combo::ComboChange;
use super::scoring::{Outcome, ScoreInput, SpeechResult, points_for};
use super::state::{EndReason, GameEvent, GamePhase, GameState, OutcomeLevel, Verdict};
use super::tower::{FallDetector, FallReport};
use crate::consts::*;
use crate::secs_to_ticks;

/// Raw rigid-body telemetry for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockTelemetry {
    pub id: u32,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// One asynchronous input, queued until the next tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Start the session (NotStarted -> Playing)
    Start,
    Score(ScoreInput),
    /// Physics reported this block as fallen (may repeat)
    Fallen(u32),
    /// Raw telemetry to run through the fall detector
    Telemetry(BlockTelemetry),
    /// Whole-tower collapse signal
    Collapse,
    /// Player left mid-session
    Exit,
}

/// Inputs gathered since the previous tick, in arrival order
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    pub events: Vec<InputEvent>,
}

impl TickInput {
    pub fn with(events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Queue a speech result; failures are not scoring events
    pub fn push_speech(&mut self, result: SpeechResult) {
        match result {
            SpeechResult::Scored(score) => {
                self.push(InputEvent::Score(ScoreInput::Speech(score)));
            }
            SpeechResult::Failed => log::warn!("Speech scoring failed, ignoring result"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput) {
    let detector = FallDetector::default();
    for event in &input.events {
        match *event {
            InputEvent::Start => {
                start_game(state);
            }
            InputEvent::Score(score) => {
                record_score(state, score);
            }
            InputEvent::Fallen(id) => {
                report_block_fall(state, id);
            }
            InputEvent::Telemetry(sample) => {
                if detector.has_fallen(sample.position, sample.velocity) {
                    report_block_fall(state, sample.id);
                }
            }
            InputEvent::Collapse => {
                trigger_collapse(state);
            }
            InputEvent::Exit => {
                exit_game(state);
            }
        }
    }

    advance_clock(state);
}

/// NotStarted -> Playing without consuming a score
pub fn start_game(state: &mut GameState) -> bool {
    if state.phase != GamePhase::NotStarted {
        log::debug!("start ignored in {:?}", state.phase);
        return false;
    }
    state.set_phase(GamePhase::Playing);
    open_listening_window(state);
    log::info!("Session started (seed {})", state.seed);
    true
}

/// Apply one scoring event. Only accepted while a listening window is open.
pub fn record_score(state: &mut GameState, input: ScoreInput) -> bool {
    if state.phase != GamePhase::Playing {
        log::debug!("Score {:?} ignored in {:?}", input, state.phase);
        return false;
    }

    let outcome = input.outcome(&state.tuning);
    let points = points_for(outcome, state.combo.is_active(), &state.tuning);
    state.score += points;

    let change = state.combo.record(outcome, state.tuning.combo_streak);

    let id = state.next_entity_id();
    state.tower.place(id, outcome, &mut state.rng);
    state.phrases.advance(&mut state.rng);

    state.outcome_level = OutcomeLevel::from(outcome);
    state.feedback = outcome_feedback(outcome, state.combo.is_active()).to_string();

    state.events.push(GameEvent::BlockPlaced { id, outcome });
    match change {
        ComboChange::Activated => {
            log::info!("Combo activated at streak {}", state.combo.streak());
            state.events.push(GameEvent::ComboActivated);
        }
        ComboChange::Broken => state.events.push(GameEvent::ComboBroken),
        ComboChange::Extended | ComboChange::None => {}
    }
    log::debug!(
        "Scored {:?} (+{}), total {}, blocks {}",
        outcome,
        points,
        state.score,
        state.tower.len()
    );

    state.set_phase(GamePhase::WaitingForNextPrompt);
    let due = state.time_ticks + secs_to_ticks(state.tuning.cooldown_secs);
    state.cooldown.arm(due, state.epoch);
    true
}

/// Physics reported a block as fallen. Safe to call every frame.
pub fn report_block_fall(state: &mut GameState, id: u32) -> bool {
    if !state.phase.is_live() {
        return false;
    }
    match state.tower.report_fallen(id) {
        FallReport::Marked(fallen) => {
            log::info!("Block {} fell ({}/{})", id, fallen, state.tuning.max_fallen_blocks);
            state.events.push(GameEvent::BlockFell { id, fallen });
            if fallen > state.tuning.max_fallen_blocks {
                end_game(state, EndReason::TooManyFalls);
            } else {
                state.feedback = format!(
                    "Block fell! {}/{} falls",
                    fallen, state.tuning.max_fallen_blocks
                );
            }
            true
        }
        FallReport::AlreadyFallen => false,
        FallReport::Unknown => {
            log::debug!("Fall report for unknown block {}", id);
            false
        }
    }
}

/// Catastrophic whole-tower collapse
pub fn trigger_collapse(state: &mut GameState) -> bool {
    if !state.phase.is_live() {
        return false;
    }
    log::info!("Tower collapsed");
    end_game(state, EndReason::Collapsed);
    true
}

/// Player quit mid-session
pub fn exit_game(state: &mut GameState) -> bool {
    if !state.phase.is_live() {
        return false;
    }
    end_game(state, EndReason::Exited);
    true
}

fn advance_clock(state: &mut GameState) {
    if !state.phase.is_live() {
        return;
    }
    state.time_ticks += 1;
    let now = state.time_ticks;

    if state.combo.poll_expiry(now, state.epoch) {
        log::debug!("Combo expired");
        state.events.push(GameEvent::ComboExpired);
    }

    if state.cooldown.poll(now, state.epoch).is_some()
        && state.phase == GamePhase::WaitingForNextPrompt
    {
        state.set_phase(GamePhase::Playing);
        open_listening_window(state);
    }

    if state.phase == GamePhase::Playing {
        let window = secs_to_ticks(state.tuning.listen_timeout_secs);
        if now - state.listen_opened_at >= window {
            state.events.push(GameEvent::ListenTimedOut);
            state.listen_opened_at = now;
            state.feedback = format!(
                "Didn't catch that. Try again: \"{}\"",
                state.current_phrase()
            );
        }
    }

    state.second_ticks += 1;
    if state.second_ticks >= TICKS_PER_SECOND {
        state.second_ticks = 0;
        state.time_remaining = state.time_remaining.saturating_sub(1);
        if state.time_remaining == 0 {
            end_game(state, EndReason::TimeUp);
        }
    }
}

/// The combo idle countdown only runs while the player can actually speak
fn open_listening_window(state: &mut GameState) {
    state.listen_opened_at = state.time_ticks;
    let combo_due = state.time_ticks + secs_to_ticks(state.tuning.combo_timeout_secs);
    state.combo.arm_idle(combo_due, state.epoch);
    state.feedback = format!("Say: \"{}\"", state.current_phrase());
}

fn end_game(state: &mut GameState, reason: EndReason) {
    if state.phase == GamePhase::Ended {
        return;
    }
    let blocks = state.tower.len();
    let verdict = match reason {
        EndReason::TimeUp if blocks >= state.tuning.win_block_count => Verdict::Win,
        // Falls, collapse and exit lose regardless of height
        _ => Verdict::Loss,
    };

    state.feedback = match (reason, verdict) {
        (EndReason::TimeUp, Verdict::Win) => "Congratulations! You built a stable tower!".into(),
        (EndReason::TimeUp, Verdict::Loss) => format!(
            "Time's up! You need at least {} blocks to win!",
            state.tuning.win_block_count
        ),
        (EndReason::TooManyFalls, _) => "Too many blocks fell! Game Over!".into(),
        (EndReason::Collapsed, _) => "Tower fell! Try again!".into(),
        (EndReason::Exited, _) => "Session exited".into(),
    };

    state.cooldown.cancel();
    state.combo.clear();
    state.verdict = Some(verdict);
    state.end_reason = Some(reason);
    state.set_phase(GamePhase::Ended);
    state.events.push(GameEvent::GameOver { verdict, reason });
    log::info!(
        "Game over: {:?} ({:?}), score {}, blocks {}, fallen {}",
        verdict,
        reason,
        state.score,
        blocks,
        state.tower.fallen_count()
    );
}

fn outcome_feedback(outcome: Outcome, combo_active: bool) -> &'static str {
    match outcome {
        Outcome::Perfect if combo_active => "COMBO ACTIVE! Smooth speech!",
        Outcome::Perfect => "Perfect pronunciation!",
        Outcome::Minor => "Good effort! Keep practicing",
        Outcome::Failure => "Try again! Focus on clarity",
    }
}
