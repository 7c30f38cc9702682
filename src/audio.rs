//! Sound cues and the Web Audio player
//!
//! The simulation only emits [`GameEvent`]s. [`cue_for`] turns an event into
//! a named cue with playback rate and volume; on wasm32 [`AudioManager`]
//! synthesizes each cue procedurally, so no sound files are needed.

use crate::Settings;
use crate::sim::{CrystalKind, GameEvent};

/// A sound to play
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundCue {
    pub name: &'static str,
    /// 1.0 is normal speed; player sounds follow the time scale
    pub playback_rate: f32,
    /// Final gain after settings (0.0 - 1.0)
    pub volume: f32,
}

/// Map a simulation event to a sound cue
///
/// Returns `None` for silent events and when the resulting gain is zero.
pub fn cue_for(event: &GameEvent, time_scale: f32, settings: &Settings) -> Option<SoundCue> {
    // (name, follows time scale, base volume)
    let (name, scaled, volume) = match event {
        GameEvent::Jumped { .. } => ("jump", true, 1.0),
        GameEvent::Footstep => ("footstep", true, 0.3),
        GameEvent::EnemyStomped { .. } => ("enemy_stomp", true, 1.0),
        GameEvent::CrystalCollected { kind, .. } => {
            let name = match kind {
                CrystalKind::Normal => "crystal_collect",
                CrystalKind::Rare => "crystal_rare",
                CrystalKind::Legendary => "crystal_legendary",
            };
            (name, false, 1.0)
        }
        GameEvent::PowerUpCollected { .. } => ("powerup_collect", false, 1.0),
        GameEvent::SpringBounce { .. } => ("spring_bounce", false, 1.0),
        GameEvent::SwitchToggled { activated, .. } => {
            (if *activated { "switch_on" } else { "switch_off" }, false, 1.0)
        }
        GameEvent::Teleported { .. } => ("teleport", false, 1.0),
        _ => return None,
    };

    let volume = settings.sfx_gain(volume);
    if volume <= 0.0 {
        return None;
    }
    let playback_rate = if scaled && time_scale.is_finite() && time_scale > 0.0 {
        time_scale
    } else {
        1.0
    };
    Some(SoundCue {
        name,
        playback_rate,
        volume,
    })
}

#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

#[cfg(target_arch = "wasm32")]
mod web {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::SoundCue;

    /// Procedural cue player
    pub struct AudioManager {
        ctx: Option<AudioContext>,
    }

    impl Default for AudioManager {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioManager {
        pub fn new() -> Self {
            // May fail outside a secure context
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self { ctx }
        }

        /// Resume audio context (required after user gesture)
        pub fn resume(&self) {
            if let Some(ctx) = &self.ctx {
                let _ = ctx.resume();
            }
        }

        pub fn play(&self, cue: &SoundCue) {
            use OscillatorType::{Sawtooth, Sine, Square, Triangle};

            let Some(ctx) = &self.ctx else { return };

            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            let rate = cue.playback_rate;
            let vol = cue.volume;
            let (from, to, duration, gain, osc_type) = match cue.name {
                "jump" => (300.0 * rate, 600.0 * rate, 0.12 / rate, 0.4, Square),
                "footstep" => (120.0 * rate, 80.0 * rate, 0.05 / rate, 0.5, Triangle),
                "enemy_stomp" => (200.0 * rate, 50.0 * rate, 0.15 / rate, 0.6, Sine),
                "powerup_collect" => (400.0, 1600.0, 0.3, 0.35, Sawtooth),
                "spring_bounce" => (150.0, 900.0, 0.2, 0.4, Sine),
                "switch_on" => (500.0, 700.0, 0.06, 0.3, Square),
                "switch_off" => (700.0, 500.0, 0.06, 0.3, Square),
                "teleport" => (1800.0, 200.0, 0.35, 0.3, Sine),
                "crystal_collect" => return self.chime(ctx, &[880.0, 1320.0], vol * 0.3),
                "crystal_rare" => return self.chime(ctx, &[880.0, 1108.0, 1320.0], vol * 0.35),
                "crystal_legendary" => {
                    return self.chime(ctx, &[660.0, 880.0, 1108.0, 1320.0, 1760.0], vol * 0.4);
                }
                other => {
                    log::debug!("No synth for cue {}", other);
                    return;
                }
            };
            self.sweep(ctx, from, to, duration, vol * gain, osc_type);
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

        /// Single oscillator gliding from `from` to `to` Hz
        fn sweep(
            &self,
            ctx: &AudioContext,
            from: f32,
            to: f32,
            duration: f32,
            vol: f32,
            osc_type: OscillatorType,
        ) {
            let Some((osc, gain)) = self.create_osc(ctx, from, osc_type) else {
                return;
            };
            let t = ctx.current_time();
            let end = t + duration as f64;

            gain.gain().set_value_at_time(vol, t).ok();
            gain.gain().exponential_ramp_to_value_at_time(0.01, end).ok();
            osc.frequency().set_value_at_time(from, t).ok();
            osc.frequency().exponential_ramp_to_value_at_time(to, end).ok();

            osc.start().ok();
            osc.stop_with_when(end + 0.02).ok();
        }

        /// Rising arpeggio, 50 ms per note
        fn chime(&self, ctx: &AudioContext, notes: &[f32], vol: f32) {
            let t = ctx.current_time();
            for (i, &freq) in notes.iter().enumerate() {
                let Some((osc, gain)) = self.create_osc(ctx, freq, OscillatorType::Sine) else {
                    continue;
                };
                let start = t + i as f64 * 0.05;
                gain.gain().set_value_at_time(0.0, t).ok();
                gain.gain().set_value_at_time(vol, start).ok();
                gain.gain().exponential_ramp_to_value_at_time(0.01, start + 0.2).ok();
                osc.start_with_when(start).ok();
                osc.stop_with_when(start + 0.22).ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Arena, PowerUpKind};
    use glam::Vec2;

    #[test]
    fn test_player_cues_follow_time_scale() {
        let settings = Settings::default();
        let jump = GameEvent::Jumped {
            pos: Vec2::ZERO,
            jump_number: 1,
        };
        let cue = cue_for(&jump, 0.3, &settings).unwrap();
        assert_eq!(cue.name, "jump");
        assert_eq!(cue.playback_rate, 0.3);

        let spring = GameEvent::SpringBounce { pos: Vec2::ZERO };
        assert_eq!(cue_for(&spring, 0.3, &settings).unwrap().playback_rate, 1.0);
    }

    #[test]
    fn test_footstep_is_quiet() {
        let settings = Settings {
            master_volume: 1.0,
            sfx_volume: 1.0,
            ..Settings::default()
        };
        let cue = cue_for(&GameEvent::Footstep, 1.0, &settings).unwrap();
        assert!((cue.volume - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_crystal_cue_by_kind() {
        let settings = Settings::default();
        let handle = Arena::new().insert(());
        let event = |kind| GameEvent::CrystalCollected {
            crystal: handle,
            kind,
            value: 10,
        };
        let name = |kind| cue_for(&event(kind), 1.0, &settings).unwrap().name;
        assert_eq!(name(CrystalKind::Normal), "crystal_collect");
        assert_eq!(name(CrystalKind::Legendary), "crystal_legendary");
    }

    #[test]
    fn test_switch_cue_by_state() {
        let settings = Settings::default();
        let event = GameEvent::SwitchToggled {
            id: "switch_0".into(),
            target_ids: vec![],
            activated: false,
        };
        assert_eq!(cue_for(&event, 1.0, &settings).unwrap().name, "switch_off");
    }

    #[test]
    fn test_muted_and_silent_events() {
        let mut settings = Settings::default();
        assert!(cue_for(&GameEvent::KeyCollected, 1.0, &settings).is_none());
        settings.muted = true;
        let event = GameEvent::PowerUpCollected {
            kind: PowerUpKind::Speed,
            duration_ms: 5000.0,
        };
        assert!(cue_for(&event, 1.0, &settings).is_none());
    }
}
