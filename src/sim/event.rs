//! Events emitted by the simulation
//!
//! Entities never reach into the orchestrator, audio or UI. They push events
//! into an [`EventSink`]; the orchestrator drains them once per frame to
//! award score, update objectives and trigger sounds/particles.

use glam::Vec2;

use super::arena::Handle;
use super::items::{CrystalKind, PowerUpKind, SecretReward};

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    /// Fell below the level
    OutOfBounds,
    /// Touched an active enemy without stomping it
    Enemy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Jumped { pos: Vec2, jump_number: u32 },
    Landed { pos: Vec2 },
    Footstep,
    EnemyStomped { enemy: Handle, score: u64 },
    KeyCollected,
    DoorUnlocked { door: usize },
    CrystalCollected { crystal: Handle, kind: CrystalKind, value: u64 },
    PowerUpCollected { kind: PowerUpKind, duration_ms: f64 },
    EffectExpired { kind: PowerUpKind },
    SpringBounce { pos: Vec2 },
    SwitchToggled { id: String, target_ids: Vec<String>, activated: bool },
    Teleported { from: Vec2, to: Vec2 },
    SecretFound { id: String, center: Vec2, reward: Option<SecretReward> },
    CrumbleStarted { tile: usize },
    TileCrumbled { tile: usize },
    FallingBlockTriggered { block: Handle },
    ObjectiveCompleted { id: String, reward_score: u64 },
    Died { cause: DeathCause },
    LevelCompleted { time_ms: u64 },
}

/// Narrow output port for simulation side effects
pub trait EventSink {
    fn emit(&mut self, event: GameEvent);
}

impl EventSink for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}
