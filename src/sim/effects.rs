//! Timed power-up effects on the player
//!
//! At most one effect per [`PowerUpKind`] is active. Picking up a kind that is
//! already running replaces it: the old modifier is reverted before the new
//! one is applied, so multipliers never stack. Timing uses the raw clock,
//! slow motion does not stretch power-ups.

use std::collections::BTreeMap;

use super::event::{EventSink, GameEvent};
use super::items::PowerUpKind;
use crate::consts::MAGNET_BASE_RANGE;

/// Player stat modifiers driven by active effects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerModifiers {
    pub speed_multiplier: f32,
    pub jump_multiplier: f32,
    pub invulnerable: bool,
    /// Crystal attraction radius; zero disables magnetism
    pub magnet_range: f32,
}

impl Default for PlayerModifiers {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            jump_multiplier: 1.0,
            invulnerable: false,
            magnet_range: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub multiplier: f32,
}

impl ActiveEffect {
    pub fn remaining_ms(&self, now_ms: f64) -> f64 {
        (self.duration_ms - (now_ms - self.start_ms)).max(0.0)
    }

    /// Fraction of the duration left, 1.0 at pickup
    pub fn remaining_fraction(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 0.0;
        }
        (self.remaining_ms(now_ms) / self.duration_ms) as f32
    }

    fn expired(&self, now_ms: f64) -> bool {
        now_ms - self.start_ms >= self.duration_ms
    }
}

#[derive(Debug, Clone, Default)]
pub struct EffectManager {
    active: BTreeMap<PowerUpKind, ActiveEffect>,
}

impl EffectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) an effect; returns true if one of the same kind was replaced
    pub fn add(
        &mut self,
        kind: PowerUpKind,
        duration_ms: f64,
        now_ms: f64,
        modifiers: &mut PlayerModifiers,
    ) -> bool {
        let replaced = self.active.remove(&kind).is_some();
        if replaced {
            revert(kind, modifiers);
        }

        let effect = ActiveEffect {
            kind,
            start_ms: now_ms,
            duration_ms,
            multiplier: kind.multiplier(),
        };
        apply(&effect, modifiers);
        self.active.insert(kind, effect);

        log::debug!("Power-up {:?} active for {}ms", kind, duration_ms);
        replaced
    }

    /// Expire finished effects
    pub fn update(
        &mut self,
        now_ms: f64,
        modifiers: &mut PlayerModifiers,
        events: &mut impl EventSink,
    ) {
        let expired: Vec<PowerUpKind> = self
            .active
            .values()
            .filter(|e| e.expired(now_ms))
            .map(|e| e.kind)
            .collect();

        for kind in expired {
            self.active.remove(&kind);
            revert(kind, modifiers);
            events.emit(GameEvent::EffectExpired { kind });
        }
    }

    pub fn remove(&mut self, kind: PowerUpKind, modifiers: &mut PlayerModifiers) -> bool {
        if self.active.remove(&kind).is_some() {
            revert(kind, modifiers);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self, modifiers: &mut PlayerModifiers) {
        self.active.clear();
        *modifiers = PlayerModifiers::default();
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.active.contains_key(&kind)
    }

    pub fn get(&self, kind: PowerUpKind) -> Option<&ActiveEffect> {
        self.active.get(&kind)
    }

    pub fn active(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.active.values()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

fn apply(effect: &ActiveEffect, modifiers: &mut PlayerModifiers) {
    match effect.kind {
        PowerUpKind::Speed => modifiers.speed_multiplier = effect.multiplier,
        PowerUpKind::Jump => modifiers.jump_multiplier = effect.multiplier,
        PowerUpKind::Invulnerability => modifiers.invulnerable = true,
        PowerUpKind::Magnetism => modifiers.magnet_range = MAGNET_BASE_RANGE * effect.multiplier,
    }
}

fn revert(kind: PowerUpKind, modifiers: &mut PlayerModifiers) {
    let defaults = PlayerModifiers::default();
    match kind {
        PowerUpKind::Speed => modifiers.speed_multiplier = defaults.speed_multiplier,
        PowerUpKind::Jump => modifiers.jump_multiplier = defaults.jump_multiplier,
        PowerUpKind::Invulnerability => modifiers.invulnerable = defaults.invulnerable,
        PowerUpKind::Magnetism => modifiers.magnet_range = defaults.magnet_range,
    }
}
