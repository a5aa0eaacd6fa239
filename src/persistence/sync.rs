//! Session lifecycle sync
//!
//! Watches the game's phase after every frame and mirrors the transitions
//! into the session store: a record is created when play first starts and
//! finalized when the session ends. Store failures are logged and swallowed.

use super::record::{SessionFilter, SessionMeta, SessionStatus, SessionUpdate};
use super::store::SessionStore;
use crate::sim::{GamePhase, GameState, exit_game};

/// External identifiers supplied by the embedding page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub identity: Option<String>,
    pub content_id: Option<String>,
}

impl SessionContext {
    pub fn new(identity: Option<String>, content_id: Option<String>) -> Self {
        // Blank strings from the page count as missing
        let clean = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
        Self {
            identity: clean(identity),
            content_id: clean(content_id),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSync {
    context: SessionContext,
    session_id: Option<String>,
    /// Creation was attempted for the current epoch (success or not)
    attempted: bool,
    finalized: bool,
    last_phase: GamePhase,
    last_epoch: u64,
}

impl SessionSync {
    pub fn new(context: SessionContext) -> Self {
        Self {
            context,
            session_id: None,
            attempted: false,
            finalized: false,
            last_phase: GamePhase::NotStarted,
            last_epoch: 0,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn set_context(&mut self, context: SessionContext) {
        self.context = context;
    }

    /// ID of the persisted record for the current session, if any
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Mirror phase transitions since the last call into the store
    pub fn observe(&mut self, state: &GameState, store: &mut dyn SessionStore, now_ms: f64) {
        if state.epoch() != self.last_epoch {
            // New game: close out an unfinished record, then forget it
            if !self.finalized {
                self.abandon(store, now_ms);
            }
            self.session_id = None;
            self.attempted = false;
            self.finalized = false;
            self.last_phase = GamePhase::NotStarted;
            self.last_epoch = state.epoch();
        }

        let phase = state.phase();
        if phase == self.last_phase {
            return;
        }

        if phase != GamePhase::NotStarted && !self.attempted {
            self.begin(state, store, now_ms);
        }
        if phase == GamePhase::Ended && !self.finalized {
            self.finish(state, store, now_ms);
        }
        self.last_phase = phase;
    }

    /// Leave mid-session. Ends the game as Exited, finalizes the record
    /// (best-effort) and returns whether the host should navigate away.
    pub fn exit(
        &mut self,
        state: &mut GameState,
        store: &mut dyn SessionStore,
        now_ms: f64,
    ) -> bool {
        let left = exit_game(state);
        self.observe(state, store, now_ms);
        left
    }

    fn begin(&mut self, state: &GameState, store: &mut dyn SessionStore, now_ms: f64) {
        self.attempted = true;
        let Some(identity) = self.context.identity.as_deref() else {
            log::info!("No user identity, session will not be persisted");
            return;
        };
        let meta = SessionMeta {
            content_id: self.context.content_id.clone(),
            seed: state.seed(),
            started_at: now_ms,
        };
        match store.create_session(identity, &meta) {
            Ok(id) => {
                log::info!("Session record {} created", id);
                self.session_id = Some(id);
            }
            Err(e) => log::warn!("Failed to create session record: {}", e),
        }
    }

    fn finish(&mut self, state: &GameState, store: &mut dyn SessionStore, now_ms: f64) {
        self.finalized = true;
        let Some(id) = self.session_id.as_deref() else {
            return;
        };
        let update = SessionUpdate {
            ended_at: Some(now_ms),
            final_score: Some(state.score()),
            blocks_built: Some(state.tower().len()),
            verdict: state.verdict(),
            end_reason: state.end_reason(),
            status: Some(SessionStatus::for_end_reason(state.end_reason())),
            ..Default::default()
        };
        match store.update_session(id, &update) {
            Ok(()) => log::info!("Session record {} finalized", id),
            Err(e) => log::warn!("Failed to finalize session record {}: {}", id, e),
        }
    }

    /// Mark a record whose game was reset before it ended
    fn abandon(&mut self, store: &mut dyn SessionStore, now_ms: f64) {
        let Some(id) = self.session_id.as_deref() else {
            return;
        };
        let update = SessionUpdate {
            ended_at: Some(now_ms),
            status: Some(SessionStatus::Exited),
            ..Default::default()
        };
        match store.update_session(id, &update) {
            Ok(()) => log::info!("Session record {} closed on reset", id),
            Err(e) => log::warn!("Failed to close session record {}: {}", id, e),
        }
    }

    /// Whether to present the post-game questionnaire.
    ///
    /// Hidden only when a lookup positively shows it was already completed,
    /// either for this identity and content or on the current record. Lookup
    /// errors and missing identifiers fall through to showing it.
    pub fn should_show_survey(&self, store: &dyn SessionStore) -> bool {
        if let (Some(identity), Some(content)) = (
            self.context.identity.as_deref(),
            self.context.content_id.as_deref(),
        ) {
            let filter = SessionFilter::survey_completed();
            match store.query_sessions(identity, Some(content), &filter) {
                Ok(done) if !done.is_empty() => return false,
                Ok(_) => {}
                Err(e) => log::warn!("Survey history lookup failed: {}", e),
            }
        }

        if let Some(id) = self.session_id.as_deref() {
            match store.get_session(id) {
                Ok(Some(record)) if record.survey_completed => return false,
                Ok(_) => {}
                Err(e) => log::warn!("Session lookup for survey failed: {}", e),
            }
        }

        true
    }

    /// Record that the questionnaire was submitted for the current session
    pub fn mark_survey_completed(&self, store: &mut dyn SessionStore) -> bool {
        let Some(id) = self.session_id.as_deref() else {
            return false;
        };
        let update = SessionUpdate {
            survey_completed: Some(true),
            ..Default::default()
        };
        match store.update_session(id, &update) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to mark survey completed on {}: {}", id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::MemoryStore;
    use crate::sim::{
        EndReason, InputEvent, Outcome, ScoreInput, TickInput, Verdict, record_score, start_game,
        tick, trigger_collapse,
    };

    fn ctx() -> SessionContext {
        SessionContext::new(Some("learner-1".into()), Some("lesson-4".into()))
    }

    #[test]
    fn test_blank_context_values_are_missing() {
        let context = SessionContext::new(Some("  ".into()), Some("lesson".into()));
        assert_eq!(context.identity, None);
        assert_eq!(context.content_id.as_deref(), Some("lesson"));
    }

    #[test]
    fn test_creates_on_first_play_and_finalizes_on_end() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);

        sync.observe(&state, &mut store, 0.0);
        assert!(store.records().is_empty());

        start_game(&mut state);
        sync.observe(&state, &mut store, 1_000.0);
        assert_eq!(store.records().len(), 1);
        let id = sync.session_id().unwrap().to_string();

        record_score(&mut state, ScoreInput::Manual(Outcome::Perfect));
        sync.observe(&state, &mut store, 1_500.0);
        trigger_collapse(&mut state);
        sync.observe(&state, &mut store, 2_000.0);
        sync.observe(&state, &mut store, 3_000.0);

        assert_eq!(store.records().len(), 1);
        let record = store.get_session(&id).unwrap().unwrap();
        assert_eq!(record.started_at, 1_000.0);
        assert_eq!(record.ended_at, Some(2_000.0));
        assert_eq!(record.final_score, Some(100));
        assert_eq!(record.blocks_built, Some(1));
        assert_eq!(record.verdict, Some(Verdict::Loss));
        assert_eq!(record.end_reason, Some(EndReason::Collapsed));
        assert_eq!(record.status, SessionStatus::Completed);
    }

    #[test]
    fn test_no_identity_means_no_persistence() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(SessionContext::default());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        trigger_collapse(&mut state);
        sync.observe(&state, &mut store, 1.0);
        assert!(store.records().is_empty());
        assert_eq!(sync.session_id(), None);
    }

    #[test]
    fn test_store_failure_is_not_fatal() {
        let mut store = MemoryStore::new();
        store.set_offline(true);
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        assert_eq!(sync.session_id(), None);

        // Gameplay carries on, and the end update is skipped
        assert!(record_score(&mut state, ScoreInput::Speech(80.0)));
        store.set_offline(false);
        trigger_collapse(&mut state);
        sync.observe(&state, &mut store, 1.0);
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_exit_marks_exited() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        tick(&mut state, &TickInput::with([InputEvent::Exit]));
        sync.observe(&state, &mut store, 10.0);
        assert_eq!(store.records()[0].status, SessionStatus::Exited);
    }

    #[test]
    fn test_exit_from_cooldown_finalizes_exited() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        record_score(&mut state, ScoreInput::Manual(Outcome::Minor));
        sync.observe(&state, &mut store, 100.0);
        assert_eq!(state.phase(), GamePhase::WaitingForNextPrompt);

        assert!(sync.exit(&mut state, &mut store, 200.0));
        let record = &store.records()[0];
        assert_eq!(record.status, SessionStatus::Exited);
        assert_eq!(record.end_reason, Some(EndReason::Exited));
        assert_eq!(record.ended_at, Some(200.0));
        assert_eq!(record.final_score, Some(50));

        // Already over: nothing to leave
        assert!(!sync.exit(&mut state, &mut store, 300.0));
        assert_eq!(store.records()[0].ended_at, Some(200.0));
    }

    #[test]
    fn test_exit_before_start_is_ignored() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        assert!(!sync.exit(&mut state, &mut store, 0.0));
        assert_eq!(state.phase(), GamePhase::NotStarted);
        assert!(store.records().is_empty());
    }

    #[test]
    fn test_reset_mid_session_closes_old_record() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);

        state.reset(6);
        sync.observe(&state, &mut store, 50.0);
        let old = &store.records()[0];
        assert_eq!(old.status, SessionStatus::Exited);
        assert_eq!(old.ended_at, Some(50.0));
    }

    #[test]
    fn test_reset_after_end_keeps_completed_record() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        trigger_collapse(&mut state);
        sync.observe(&state, &mut store, 10.0);

        state.reset(6);
        sync.observe(&state, &mut store, 50.0);
        let old = &store.records()[0];
        assert_eq!(old.status, SessionStatus::Completed);
        assert_eq!(old.ended_at, Some(10.0));
    }

    #[test]
    fn test_reset_starts_new_record() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        let first = sync.session_id().unwrap().to_string();

        state.reset(6);
        sync.observe(&state, &mut store, 5.0);
        assert_eq!(sync.session_id(), None);
        start_game(&mut state);
        sync.observe(&state, &mut store, 6.0);
        assert_eq!(store.records().len(), 2);
        assert_ne!(sync.session_id().unwrap(), first);
    }

    #[test]
    fn test_start_and_end_in_one_frame_still_recorded() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        trigger_collapse(&mut state);
        sync.observe(&state, &mut store, 0.0);
        assert_eq!(store.records().len(), 1);
        assert_eq!(store.records()[0].status, SessionStatus::Completed);
    }

    #[test]
    fn test_survey_shown_by_default() {
        let store = MemoryStore::new();
        let sync = SessionSync::new(ctx());
        assert!(sync.should_show_survey(&store));
    }

    #[test]
    fn test_survey_hidden_after_completion_for_content() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        assert!(sync.mark_survey_completed(&mut store));

        // A later session for the same learner and content skips it
        state.reset(9);
        sync.observe(&state, &mut store, 1.0);
        start_game(&mut state);
        sync.observe(&state, &mut store, 2.0);
        assert!(!sync.should_show_survey(&store));

        // Different content still asks
        let other = SessionSync::new(SessionContext::new(
            Some("learner-1".into()),
            Some("lesson-5".into()),
        ));
        assert!(other.should_show_survey(&store));
    }

    #[test]
    fn test_survey_hidden_via_current_record_without_content() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(SessionContext::new(Some("learner-1".into()), None));
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        assert!(sync.should_show_survey(&store));
        sync.mark_survey_completed(&mut store);
        assert!(!sync.should_show_survey(&store));
    }

    #[test]
    fn test_survey_fails_open_on_lookup_error() {
        let mut store = MemoryStore::new();
        let mut sync = SessionSync::new(ctx());
        let mut state = GameState::new(5);
        start_game(&mut state);
        sync.observe(&state, &mut store, 0.0);
        sync.mark_survey_completed(&mut store);

        store.set_offline(true);
        assert!(sync.should_show_survey(&store));
        assert!(!sync.mark_survey_completed(&mut store));
    }
}
