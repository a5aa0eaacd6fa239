//! Audio system using Web Audio API
//!
//! Short oscillator cues for scoring outcomes, combo activation and tower
//! collapse. Every cue is fire-and-forget; failures are silent.

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use crate::settings::Settings;
use crate::sim::Cue;

/// Audio manager for the game
pub struct AudioManager {
    ctx: Option<AudioContext>,
    volume: f32,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // Try to create audio context (may fail if not in secure context)
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            volume: Settings::default().effective_volume(),
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Pick up volume and mute from player settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.volume = settings.effective_volume();
    }

    /// Play a cue
    pub fn play(&self, cue: Cue) {
        let vol = self.volume;
        if vol <= 0.0 {
            return;
        }

        let Some(ctx) = &self.ctx else { return };

        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match cue {
            Cue::Perfect => self.play_perfect(ctx, vol),
            Cue::Minor => self.play_minor(ctx, vol),
            Cue::Failure => self.play_failure(ctx, vol),
            Cue::Combo => self.play_combo(ctx, vol),
            Cue::Collapse => self.play_collapse(ctx, vol),
        }
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// One enveloped tone starting `delay` seconds from now
    fn tone(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
        peak: f32,
        delay: f64,
        duration: f64,
    ) {
        let Some((osc, gain)) = self.create_osc(ctx, freq, osc_type) else {
            return;
        };
        let t = ctx.current_time() + delay;

        gain.gain().set_value_at_time(peak, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + duration)
            .ok();

        osc.start_with_when(t).ok();
        osc.stop_with_when(t + duration).ok();
    }

    /// Perfect - rising two-note chime
    fn play_perfect(&self, ctx: &AudioContext, vol: f32) {
        self.tone(ctx, 800.0, OscillatorType::Sine, vol * 0.3, 0.0, 0.2);
        self.tone(ctx, 1000.0, OscillatorType::Sine, vol * 0.2, 0.1, 0.15);
    }

    /// Minor - flat square blip
    fn play_minor(&self, ctx: &AudioContext, vol: f32) {
        self.tone(ctx, 400.0, OscillatorType::Square, vol * 0.2, 0.0, 0.3);
    }

    /// Failure - low buzz
    fn play_failure(&self, ctx: &AudioContext, vol: f32) {
        self.tone(ctx, 200.0, OscillatorType::Sawtooth, vol * 0.2, 0.0, 0.4);
    }

    /// Combo - ascending arpeggio
    fn play_combo(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [600.0, 800.0, 1000.0].iter().enumerate() {
            let delay = i as f64 * 0.15;
            self.tone(ctx, *freq, OscillatorType::Sine, vol * 0.25, delay, 0.3);
        }
    }

    /// Collapse - deep rumble
    fn play_collapse(&self, ctx: &AudioContext, vol: f32) {
        if let Some((osc, gain)) = self.create_osc(ctx, 80.0, OscillatorType::Square) {
            let t = ctx.current_time();
            gain.gain().set_value_at_time(vol * 0.4, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.8)
                .ok();
            osc.frequency().set_value_at_time(80.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(30.0, t + 0.8)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.8).ok();
        }

        self.tone(ctx, 60.0, OscillatorType::Sawtooth, vol * 0.3, 0.2, 0.6);
    }
}
