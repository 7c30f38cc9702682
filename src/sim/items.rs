//! Collectibles and static trigger entities
//!
//! Crystals and power-ups are centered on their position (they bob around an
//! anchor point); keys, doors and the goal use a top-left position like tiles.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;
use crate::consts::*;

/// Crystal rarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrystalKind {
    #[default]
    Normal,
    Rare,
    Legendary,
}

/// Power-up effect type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PowerUpKind {
    #[default]
    Speed,
    Jump,
    Invulnerability,
    Magnetism,
}

impl PowerUpKind {
    /// Strength of the effect while active
    pub fn multiplier(&self) -> f32 {
        match self {
            PowerUpKind::Speed => 1.8,
            PowerUpKind::Jump => 1.5,
            PowerUpKind::Invulnerability => 1.0,
            PowerUpKind::Magnetism => 2.0,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PowerUpKind::Speed => "Speed Boost",
            PowerUpKind::Jump => "Jump Boost",
            PowerUpKind::Invulnerability => "Shield",
            PowerUpKind::Magnetism => "Magnet",
        }
    }
}

/// Lifecycle of a pickup: idle in the world, playing its collect animation, gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickupState {
    Active,
    Collecting,
    Collected,
}

/// Bounce-out easing used by the crystal spawn animation
pub fn ease_out_bounce(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// Overshoot easing used by the power-up spawn animation
pub fn ease_out_back(t: f32) -> f32 {
    const C1: f32 = 1.70158;
    const C3: f32 = C1 + 1.0;
    1.0 + C3 * (t - 1.0).powi(3) + C1 * (t - 1.0).powi(2)
}

/// A collectible crystal
#[derive(Debug, Clone)]
pub struct Crystal {
    /// Center of the crystal (includes bobbing)
    pub position: Vec2,
    /// Resting center the crystal bobs around
    pub anchor: Vec2,
    pub size: Vec2,
    pub kind: CrystalKind,
    pub value: u64,
    pub state: PickupState,
    /// Spawn animation progress, 0..1
    pub spawn_progress: f32,
    /// Collect animation progress, 0..1
    pub collect_progress: f32,
    pub scale: f32,
    pub opacity: f32,
    pub being_magnetized: bool,
    bob_phase: f32,
}

impl Crystal {
    pub fn new(center: Vec2, kind: CrystalKind, value: u64) -> Self {
        Self {
            position: center,
            anchor: center,
            size: Vec2::splat(CRYSTAL_SIZE),
            kind,
            value,
            state: PickupState::Active,
            spawn_progress: 0.0,
            collect_progress: 0.0,
            scale: 0.0,
            opacity: 0.0,
            being_magnetized: false,
            bob_phase: 0.0,
        }
    }

    /// Still present in the level (false once the collect animation finished)
    pub fn is_active(&self) -> bool {
        self.state != PickupState::Collected
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::centered(self.position, self.size)
    }

    /// Advance animations; `magnet` is the player center and pull range
    pub fn update(&mut self, dt_ms: f32, magnet: Option<(Vec2, f32)>) {
        if self.state == PickupState::Collected {
            return;
        }

        if self.spawn_progress < 1.0 {
            self.spawn_progress = (self.spawn_progress + dt_ms / CRYSTAL_SPAWN_MS).min(1.0);
            self.scale = ease_out_bounce(self.spawn_progress);
            self.opacity = self.spawn_progress;
        }

        if self.state == PickupState::Collecting {
            self.collect_progress = (self.collect_progress + dt_ms / CRYSTAL_COLLECT_MS).min(1.0);
            self.scale = 1.0 + self.collect_progress * 1.5;
            self.opacity = 1.0 - self.collect_progress;
            if self.collect_progress >= 1.0 {
                self.state = PickupState::Collected;
            }
            return;
        }

        let dt = crate::ms_to_secs(dt_ms);
        self.bob_phase += dt * 2.0;
        self.position = Vec2::new(self.anchor.x, self.anchor.y + self.bob_phase.sin() * 3.0);

        self.being_magnetized = false;
        if let Some((target, range)) = magnet {
            let distance = self.position.distance(target);
            if range > 0.0 && distance <= range && distance > f32::EPSILON {
                self.being_magnetized = true;
                let force = MAGNET_FORCE * (1.0 - distance / range);
                let step = (target - self.position).normalize_or_zero() * force * dt;
                self.position += step;
                self.anchor = self.position;
            }
        }
    }

    /// Start collecting if the player overlaps; returns true on the pickup frame
    pub fn try_collect(&mut self, player: &Aabb) -> bool {
        if self.state != PickupState::Active || !player.overlaps(&self.bounds()) {
            return false;
        }
        self.state = PickupState::Collecting;
        self.collect_progress = 0.0;
        true
    }
}

/// A timed power-up pickup
#[derive(Debug, Clone)]
pub struct PowerUp {
    pub position: Vec2,
    pub anchor: Vec2,
    pub size: Vec2,
    pub kind: PowerUpKind,
    pub duration_ms: f64,
    pub state: PickupState,
    pub spawn_progress: f32,
    pub collect_progress: f32,
    pub scale: f32,
    bob_phase: f32,
}

impl PowerUp {
    pub fn new(center: Vec2, kind: PowerUpKind, duration_ms: f64) -> Self {
        Self {
            position: center,
            anchor: center,
            size: Vec2::splat(POWER_UP_SIZE),
            kind,
            duration_ms,
            state: PickupState::Active,
            spawn_progress: 0.0,
            collect_progress: 0.0,
            scale: 0.0,
            bob_phase: 0.0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state != PickupState::Collected
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::centered(self.position, self.size)
    }

    pub fn update(&mut self, dt_ms: f32) {
        if self.state == PickupState::Collected {
            return;
        }

        if self.spawn_progress < 1.0 {
            self.spawn_progress = (self.spawn_progress + dt_ms / POWER_UP_SPAWN_MS).min(1.0);
            self.scale = ease_out_back(self.spawn_progress);
        }

        if self.state == PickupState::Collecting {
            self.collect_progress =
                (self.collect_progress + dt_ms / POWER_UP_COLLECT_MS).min(1.0);
            self.scale = 1.0 + self.collect_progress * 2.0;
            if self.collect_progress >= 1.0 {
                self.state = PickupState::Collected;
            }
            return;
        }

        self.bob_phase += crate::ms_to_secs(dt_ms) * 3.0;
        self.position = Vec2::new(self.anchor.x, self.anchor.y + self.bob_phase.sin() * 4.0);
    }

    pub fn try_collect(&mut self, player: &Aabb) -> bool {
        if self.state != PickupState::Active || !player.overlaps(&self.bounds()) {
            return false;
        }
        self.state = PickupState::Collecting;
        self.collect_progress = 0.0;
        true
    }
}

/// Door key
#[derive(Debug, Clone)]
pub struct Key {
    pub position: Vec2,
    pub size: Vec2,
    pub is_active: bool,
}

impl Key {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            size: Vec2::splat(KEY_SIZE),
            is_active: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_pos_size(self.position, self.size)
    }
}

/// Locked door; solid until unlocked with a key
#[derive(Debug, Clone)]
pub struct Door {
    pub position: Vec2,
    pub size: Vec2,
    pub is_locked: bool,
}

impl Door {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            size: Vec2::new(DOOR_WIDTH, DOOR_HEIGHT),
            is_locked: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_pos_size(self.position, self.size)
    }
}

/// Level exit
#[derive(Debug, Clone)]
pub struct Goal {
    pub position: Vec2,
    pub size: Vec2,
}

impl Goal {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            size: Vec2::splat(GOAL_SIZE),
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_pos_size(self.position, self.size)
    }
}

/// What discovering a secret area grants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SecretReward {
    Score {
        #[serde(default = "default_secret_score")]
        value: u64,
    },
    Crystal {
        #[serde(default = "default_crystal_value")]
        value: u64,
    },
    #[serde(rename = "powerup")]
    PowerUp {
        #[serde(rename = "powerType", default)]
        kind: PowerUpKind,
    },
}

fn default_secret_score() -> u64 {
    SECRET_REWARD
}

fn default_crystal_value() -> u64 {
    CRYSTAL_VALUE
}

/// Hidden region counted by the "find secrets" objective
#[derive(Debug, Clone)]
pub struct SecretArea {
    pub id: String,
    pub bounds: Aabb,
    pub reward: Option<SecretReward>,
    pub is_discovered: bool,
    /// Milliseconds since discovery, capped at the reveal animation length
    pub reveal_ms: f32,
}

/// Reveal animation length after discovery
pub const SECRET_REVEAL_MS: f32 = 1000.0;

impl SecretArea {
    pub fn new(id: impl Into<String>, bounds: Aabb, reward: Option<SecretReward>) -> Self {
        Self {
            id: id.into(),
            bounds,
            reward,
            is_discovered: false,
            reveal_ms: 0.0,
        }
    }

    /// Mark discovered on first overlap; returns true only on that frame
    pub fn check_discovery(&mut self, player: &Aabb) -> bool {
        if self.is_discovered || !player.overlaps(&self.bounds) {
            return false;
        }
        self.is_discovered = true;
        self.reveal_ms = 0.0;
        true
    }

    pub fn update(&mut self, dt_ms: f32) {
        if self.is_discovered && self.reveal_ms < SECRET_REVEAL_MS {
            self.reveal_ms = (self.reveal_ms + dt_ms).min(SECRET_REVEAL_MS);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player_box_at(center: Vec2) -> Aabb {
        Aabb::centered(center, Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT))
    }

    #[test]
    fn test_crystal_collect_lifecycle() {
        let mut crystal = Crystal::new(Vec2::new(100.0, 100.0), CrystalKind::Legendary, 50);
        assert!(crystal.try_collect(&player_box_at(Vec2::new(100.0, 100.0))));
        // Second overlap during the animation does not count again
        assert!(!crystal.try_collect(&player_box_at(Vec2::new(100.0, 100.0))));
        assert!(crystal.is_active());

        crystal.update(100.0, None);
        assert!(crystal.is_active());
        crystal.update(100.0, None);
        assert!(!crystal.is_active());
        assert_eq!(crystal.collect_progress, 1.0);
    }

    #[test]
    fn test_crystal_magnet_pulls_toward_player() {
        let mut crystal = Crystal::new(Vec2::new(100.0, 100.0), CrystalKind::Normal, 10);
        let player_center = Vec2::new(200.0, 100.0);
        crystal.update(16.0, Some((player_center, 240.0)));
        assert!(crystal.being_magnetized);
        assert!(crystal.position.x > 100.0);

        let mut far = Crystal::new(Vec2::new(100.0, 100.0), CrystalKind::Normal, 10);
        far.update(16.0, Some((Vec2::new(500.0, 100.0), 240.0)));
        assert!(!far.being_magnetized);
        assert_eq!(far.position.x, 100.0);
    }

    #[test]
    fn test_spawn_progress_is_normalized() {
        let mut power_up = PowerUp::new(Vec2::ZERO, PowerUpKind::Jump, 5000.0);
        for _ in 0..100 {
            power_up.update(16.0);
        }
        assert_eq!(power_up.spawn_progress, 1.0);
    }

    #[test]
    fn test_secret_discovered_once() {
        let mut area = SecretArea::new("secret_0", Aabb::new(0.0, 0.0, 64.0, 64.0), None);
        let player = Aabb::new(10.0, 10.0, 32.0, 50.0);
        assert!(area.check_discovery(&player));
        assert!(!area.check_discovery(&player));
    }

    #[test]
    fn test_secret_reward_json() {
        let reward: SecretReward = serde_json::from_str(r#"{"type":"score"}"#).unwrap();
        assert_eq!(reward, SecretReward::Score { value: SECRET_REWARD });
        let reward: SecretReward =
            serde_json::from_str(r#"{"type":"powerup","powerType":"magnetism"}"#).unwrap();
        assert_eq!(
            reward,
            SecretReward::PowerUp {
                kind: PowerUpKind::Magnetism
            }
        );
    }

    #[test]
    fn test_easing_endpoints() {
        assert!((ease_out_bounce(1.0) - 1.0).abs() < 1e-4);
        assert!((ease_out_back(1.0) - 1.0).abs() < 1e-4);
        assert!(ease_out_back(0.0).abs() < 1e-4);
    }
}
