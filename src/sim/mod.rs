//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must stay free of rendering
//! and platform dependencies:
//! - Frame delta comes in from the caller, split into raw and scaled time
//! - Seeded RNG only
//! - Stable iteration order (grid order for tiles, insertion order for entities)

pub mod aabb;
pub mod arena;
pub mod blocks;
pub mod collision;
pub mod effects;
pub mod enemy;
pub mod event;
pub mod input;
pub mod items;
pub mod level;
pub mod objectives;
pub mod player;
pub mod state;
pub mod tick;

pub use aabb::Aabb;
pub use arena::{Arena, Handle};
pub use blocks::{FallingBlock, FallingState, MovingPlatform, SpecialBlock, SpecialBlockKind};
pub use collision::{Obstacle, ObstacleKind, Phase, Resolution, resolve};
pub use effects::{EffectManager, PlayerModifiers};
pub use enemy::Enemy;
pub use event::{DeathCause, EventSink, GameEvent};
pub use input::{InputState, KeyCode};
pub use items::{
    Crystal, CrystalKind, Door, Goal, Key, PowerUp, PowerUpKind, SecretArea, SecretReward,
};
pub use level::{EntityDescriptor, Level, LevelData, Tile, TileKind};
pub use objectives::{Objective, ObjectiveKind, ObjectiveTracker};
pub use player::{AnimationState, Player, PlayerOutcome};
pub use state::{GamePhase, GameState, World};
pub use tick::{FrameTime, tick};
