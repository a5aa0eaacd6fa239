//! Chunk Tower entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;

    use chunk_tower::audio::AudioManager;
    use chunk_tower::consts::*;
    use chunk_tower::format_clock;
    use chunk_tower::persistence::{LocalStorageStore, SessionContext, SessionSync};
    use chunk_tower::platform::now_ms;
    use chunk_tower::settings::Settings;
    use chunk_tower::sim::{
        BlockTelemetry, GameEvent, GamePhase, GameState, InputEvent, Outcome, OutcomeLevel,
        PhraseSequencer, ScoreInput, SpeechResult, TickInput, Verdict, tick,
    };
    use chunk_tower::tuning::Tuning;

    thread_local! {
        /// Shared with the JS-callable entry points below
        static GAME: RefCell<Option<Rc<RefCell<Game>>>> = const { RefCell::new(None) };
    }

    /// Game instance holding all state
    struct Game {
        state: GameState,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        audio: AudioManager,
        settings: Settings,
        store: LocalStorageStore,
        sync: SessionSync,
    }

    impl Game {
        fn new(seed: u64) -> Self {
            let settings = Settings::load();
            let phrases = PhraseSequencer::new(Vec::new(), settings.phrase_order);
            let mut audio = AudioManager::new();
            audio.apply_settings(&settings);
            Self {
                state: GameState::with_config(seed, Tuning::default(), phrases),
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                audio,
                settings,
                store: LocalStorageStore::load(),
                sync: SessionSync::new(SessionContext::default()),
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                // Queued inputs are applied once, on the first substep
                let input = std::mem::take(&mut self.input);
                tick(&mut self.state, &input);
                self.accumulator -= SIM_DT;
                substeps += 1;
            }

            self.after_mutation();
        }

        /// Play cues for new events and mirror phase changes to the store
        fn after_mutation(&mut self) {
            for event in self.state.drain_events() {
                if let Some(cue) = event.cue() {
                    self.audio.play(cue);
                }
                match event {
                    GameEvent::BlockFell { id, fallen } => {
                        log::info!("Block {} fell ({} total)", id, fallen);
                    }
                    GameEvent::GameOver { verdict, reason } => {
                        log::info!(
                            "Game over: {:?} ({:?}), score {}",
                            verdict,
                            reason,
                            self.state.score()
                        );
                    }
                    _ => {}
                }
            }
            self.sync.observe(&self.state, &mut self.store, now_ms());
        }

        fn handle_key(&mut self, key: &str) {
            match key {
                "r" | "R" => self.restart(js_sys::Date::now() as u64),
                "Escape" => self.input.push(InputEvent::Exit),
                _ => {
                    let Some(outcome) = Outcome::from_key(key) else {
                        return;
                    };
                    self.audio.resume();
                    if self.state.phase() == GamePhase::NotStarted {
                        self.input.push(InputEvent::Start);
                    } else if self.settings.manual_input {
                        self.input.push(InputEvent::Score(ScoreInput::Manual(outcome)));
                    }
                }
            }
        }

        /// Reset game state for restart
        fn restart(&mut self, seed: u64) {
            self.state.reset(seed);
            self.accumulator = 0.0;
            self.input = TickInput::default();
            self.after_mutation();
            log::info!("Game restarted with seed: {}", seed);
        }

        /// Update HUD elements in DOM
        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };

            let set_text = |id: &str, text: &str| {
                if let Some(el) = document.get_element_by_id(id) {
                    el.set_text_content(Some(text));
                }
            };

            set_text("hud-score", &self.state.score().to_string());
            set_text("hud-time", &format_clock(self.state.time_remaining()));
            set_text("hud-blocks", &self.state.tower().len().to_string());
            set_text("hud-fallen", &self.state.fallen_count().to_string());
            set_text("phrase", self.state.current_phrase());
            set_text("feedback", self.state.feedback());

            if let Some(el) = document.get_element_by_id("feedback") {
                let class = match self.state.outcome_level() {
                    OutcomeLevel::Neutral => "neutral",
                    OutcomeLevel::Perfect => "perfect",
                    OutcomeLevel::Minor => "minor",
                    OutcomeLevel::Failure => "failure",
                };
                let _ = el.set_attribute("class", class);
            }

            // Show combo badge only while combo mode is active
            if let Some(el) = document.get_element_by_id("hud-combo") {
                let class = if self.state.combo_active() {
                    "hud-item"
                } else {
                    "hud-item hidden"
                };
                let _ = el.set_attribute("class", class);
            }

            // Show/hide game over
            if let Some(el) = document.get_element_by_id("game-over") {
                if self.state.is_ended() {
                    let _ = el.set_attribute("class", "");
                    let title = match self.state.verdict() {
                        Some(Verdict::Win) => "Tower Complete!",
                        _ => "Tower Fell!",
                    };
                    set_text("game-over-title", title);
                    set_text("final-score", &self.state.score().to_string());
                    set_text("final-blocks", &self.state.tower().len().to_string());
                } else {
                    let _ = el.set_attribute("class", "hidden");
                }
            }
        }
    }

    /// Run `f` against the live game, if the page has started it
    fn with_game<R>(f: impl FnOnce(&mut Game) -> R) -> Option<R> {
        let game = GAME.with(|g| g.borrow().clone())?;
        let mut g = game.try_borrow_mut().ok()?;
        Some(f(&mut g))
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Logger init failed: {}", e).into());
        }

        log::info!("Chunk Tower starting...");

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document, cannot start");
            return;
        };

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed)));
        GAME.with(|g| *g.borrow_mut() = Some(game.clone()));

        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(game.clone());
        setup_restart_button(game.clone());

        request_animation_frame(game);

        log::info!("Chunk Tower running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            if event.repeat() {
                return;
            }
            game.borrow_mut().handle_key(event.key().as_str());
        });
        let _ =
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_restart_button(game: Rc<RefCell<Game>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        if let Some(btn) = document.get_element_by_id("restart-btn") {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().restart(js_sys::Date::now() as u64);
            });
            let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            g.update_hud();
        }

        request_animation_frame(game);
    }

    // === JS-callable entry points for the speech, physics and page collaborators ===

    /// Pronunciation score from the speech service (NaN or negative = failed)
    #[wasm_bindgen]
    pub fn submit_speech_score(score: f64) {
        with_game(|g| g.input.push_speech(SpeechResult::from_raw(score)));
    }

    #[wasm_bindgen]
    pub fn report_block_fall(id: u32) {
        with_game(|g| g.input.push(InputEvent::Fallen(id)));
    }

    /// Per-frame rigid-body telemetry, run through the fall detector
    #[wasm_bindgen]
    #[allow(clippy::too_many_arguments)]
    pub fn report_block_telemetry(id: u32, x: f32, y: f32, z: f32, vx: f32, vy: f32, vz: f32) {
        with_game(|g| {
            g.input.push(InputEvent::Telemetry(BlockTelemetry {
                id,
                position: glam::Vec3::new(x, y, z),
                velocity: glam::Vec3::new(vx, vy, vz),
            }))
        });
    }

    #[wasm_bindgen]
    pub fn trigger_collapse() {
        with_game(|g| g.input.push(InputEvent::Collapse));
    }

    /// Leave mid-session; true if the page should navigate away
    #[wasm_bindgen]
    pub fn exit_game() -> bool {
        with_game(|g| {
            // Finalize now, the page may unload before the next frame
            let left = g.sync.exit(&mut g.state, &mut g.store, now_ms());
            g.after_mutation();
            left
        })
        .unwrap_or(false)
    }

    #[wasm_bindgen]
    pub fn set_session_context(identity: Option<String>, content_id: Option<String>) {
        with_game(|g| g.sync.set_context(SessionContext::new(identity, content_id)));
    }

    /// Tower blocks as JSON for the physics/render side
    #[wasm_bindgen]
    pub fn blocks_json() -> String {
        with_game(|g| serde_json::to_string(g.state.tower().blocks()))
            .and_then(|r| r.ok())
            .unwrap_or_else(|| "[]".to_string())
    }

    #[wasm_bindgen]
    pub fn should_show_survey() -> bool {
        with_game(|g| g.sync.should_show_survey(&g.store)).unwrap_or(true)
    }

    #[wasm_bindgen]
    pub fn mark_survey_completed() -> bool {
        with_game(|g| g.sync.mark_survey_completed(&mut g.store)).unwrap_or(false)
    }

    #[wasm_bindgen]
    pub fn reset_game() {
        with_game(|g| g.restart(js_sys::Date::now() as u64));
    }

    #[wasm_bindgen]
    pub fn set_muted(muted: bool) {
        with_game(|g| {
            g.settings.muted = muted;
            g.settings.save();
            g.audio.apply_settings(&g.settings);
        });
    }

    /// Replace game balance from JSON; only honored before the session starts
    #[wasm_bindgen]
    pub fn load_tuning(json: &str) -> bool {
        let tuning = match Tuning::from_json(json) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("Rejected tuning: {}", e);
                return false;
            }
        };
        with_game(|g| g.state.retune(tuning)).unwrap_or(false)
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Chunk Tower (native) starting...");
    log::info!("Native mode has no speech or physics, run with `trunk serve` for the web version");

    demo_session();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted session against an in-memory store
#[cfg(not(target_arch = "wasm32"))]
fn demo_session() {
    use chunk_tower::persistence::{MemoryStore, SessionContext, SessionSync};
    use chunk_tower::platform::now_ms;
    use chunk_tower::sim::{GamePhase, GameState, InputEvent, SpeechResult, TickInput, tick};

    let mut store = MemoryStore::new();
    let mut sync = SessionSync::new(SessionContext::new(
        Some("demo-learner".into()),
        Some("demo-lesson".into()),
    ));
    let mut state = GameState::new(42);

    let mut step = |state: &mut GameState, input: &TickInput, store: &mut MemoryStore| {
        tick(state, input);
        for event in state.drain_events() {
            log::debug!("{:?}", event);
        }
        sync.observe(state, store, now_ms());
    };

    step(&mut state, &TickInput::with([InputEvent::Start]), &mut store);

    let scores = [92.0, 88.0, 75.0, 81.0, 55.0, 97.0, 30.0, 72.0, 90.0, 66.0, 85.0];
    for score in scores {
        if state.is_ended() {
            break;
        }
        println!("Say: \"{}\" -> {}", state.current_phrase(), score);
        let mut input = TickInput::default();
        input.push_speech(SpeechResult::from_raw(score));
        step(&mut state, &input, &mut store);
        println!("  {} (score {})", state.feedback(), state.score());

        while state.phase() == GamePhase::WaitingForNextPrompt {
            step(&mut state, &TickInput::default(), &mut store);
        }
    }

    // Let the clock run out
    while !state.is_ended() {
        step(&mut state, &TickInput::default(), &mut store);
    }

    println!(
        "\n{} - {} blocks, {} fallen, score {}",
        state.feedback(),
        state.tower().len(),
        state.fallen_count(),
        state.score()
    );
    match store.records().first() {
        Some(record) => println!("Stored session {}: {:?}", record.id, record.status),
        None => println!("No session stored"),
    }
}
