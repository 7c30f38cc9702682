//! Game settings and preferences
//!
//! Persisted separately from player progress in LocalStorage.

use serde::{Deserialize, Serialize};

use crate::consts::SLOW_MOTION_SCALE;

/// Lowest slow-motion scale the options screen allows
pub const MIN_SLOW_MOTION_SCALE: f32 = 0.1;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    // === Gameplay ===
    /// Physics time scale while slow motion is held (0.1 - 1.0)
    pub slow_motion_scale: f32,

    // === HUD ===
    /// Show FPS counter
    pub show_fps: bool,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,
    pub muted: bool,

    // === Accessibility ===
    /// Reduced motion (no slow-motion tint, no bobbing)
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slow_motion_scale: SLOW_MOTION_SCALE,
            show_fps: false,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.7,
            muted: false,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Slow-motion scale clamped to the supported range
    pub fn effective_slow_motion_scale(&self) -> f32 {
        if self.slow_motion_scale.is_finite() {
            self.slow_motion_scale.clamp(MIN_SLOW_MOTION_SCALE, 1.0)
        } else {
            SLOW_MOTION_SCALE
        }
    }

    /// Final gain for a sound effect of base volume `volume`
    pub fn sfx_gain(&self, volume: f32) -> f32 {
        if self.muted {
            return 0.0;
        }
        (volume * self.master_volume * self.sfx_volume).clamp(0.0, 1.0)
    }

    pub fn music_gain(&self) -> f32 {
        if self.muted {
            return 0.0;
        }
        (self.master_volume * self.music_volume).clamp(0.0, 1.0)
    }

    /// LocalStorage key
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "chrono_platformer_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.slow_motion_scale, 0.3);
        assert!(!s.muted);
    }

    #[test]
    fn test_slow_motion_scale_clamped() {
        let mut s = Settings::default();
        s.slow_motion_scale = 0.0;
        assert_eq!(s.effective_slow_motion_scale(), MIN_SLOW_MOTION_SCALE);
        s.slow_motion_scale = 4.0;
        assert_eq!(s.effective_slow_motion_scale(), 1.0);
        s.slow_motion_scale = f32::NAN;
        assert_eq!(s.effective_slow_motion_scale(), SLOW_MOTION_SCALE);
    }

    #[test]
    fn test_mute_silences_everything() {
        let mut s = Settings::default();
        assert!(s.sfx_gain(1.0) > 0.0);
        s.muted = true;
        assert_eq!(s.sfx_gain(1.0), 0.0);
        assert_eq!(s.music_gain(), 0.0);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s: Settings =
            serde_json::from_str(r#"{"slowMotionScale": 0.5, "muted": true}"#).unwrap();
        assert_eq!(s.slow_motion_scale, 0.5);
        assert!(s.muted);
        assert_eq!(s.master_volume, 0.8);
    }
}
