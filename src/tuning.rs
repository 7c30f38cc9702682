//! Data-driven game balance
//!
//! Physics parameters default to the values in [`crate::consts`] and can be
//! overridden from a JSON file (partial files are fine, missing keys keep
//! their defaults).

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Player physics parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerTuning {
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_force: f32,
    pub max_speed_x: f32,
    pub terminal_velocity_y: f32,
    pub friction: f32,
    pub ice_friction: f32,
    pub max_jumps: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            move_speed: MOVE_SPEED,
            jump_force: JUMP_FORCE,
            max_speed_x: MAX_SPEED_X,
            terminal_velocity_y: TERMINAL_VELOCITY_Y,
            friction: FRICTION,
            ice_friction: ICE_FRICTION,
            max_jumps: MAX_JUMPS,
        }
    }
}

/// Enemy patrol parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnemyTuning {
    pub gravity: f32,
    pub terminal_velocity: f32,
    /// Used when a spawn descriptor has no `moveRange`
    pub move_range: f32,
    /// Used when a spawn descriptor has no `speed`
    pub speed: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            gravity: ENEMY_GRAVITY,
            terminal_velocity: ENEMY_TERMINAL_VELOCITY,
            move_range: ENEMY_MOVE_RANGE,
            speed: ENEMY_SPEED,
        }
    }
}

/// Complete tuning set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
}

impl Tuning {
    /// Parse tuning overrides from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
