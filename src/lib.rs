//! Chrono-Platformer - a 2D platformer with slow motion and a level editor
//!
//! Core modules:
//! - `sim`: Frame-driven simulation (player physics, collisions, entities, objectives)
//! - `tuning`: Data-driven physics balance
//! - `settings`: Player preferences (slow-motion scale, volumes)
//! - `progress`: Player progress record (levels, best times, achievements)
//! - `audio`: Sound cues derived from simulation events
//! - `editor`: Level document editing model

pub mod audio;
pub mod editor;
pub mod error;
pub mod progress;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use error::LevelError;
pub use progress::PlayerProgress;
pub use settings::Settings;
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Player hitbox
    pub const PLAYER_WIDTH: f32 = 32.0;
    pub const PLAYER_HEIGHT: f32 = 50.0;

    /// Player physics defaults (pixels, seconds)
    pub const GRAVITY: f32 = 980.0;
    pub const MOVE_SPEED: f32 = 250.0;
    pub const JUMP_FORCE: f32 = 500.0;
    pub const MAX_SPEED_X: f32 = 300.0;
    pub const TERMINAL_VELOCITY_Y: f32 = 1000.0;
    /// Per-frame horizontal decay when no direction is held
    pub const FRICTION: f32 = 0.85;
    /// Friction while standing on ice
    pub const ICE_FRICTION: f32 = 0.02;
    pub const MAX_JUMPS: u32 = 2;

    /// Horizontal speeds below this snap to zero
    pub const VELOCITY_DEAD_ZONE: f32 = 0.1;
    /// Overlaps below this on both axes are ignored (anti-jitter)
    pub const COLLISION_TOLERANCE: f32 = 0.1;
    /// Overlaps closer than this count as a tie between the axes
    pub const MTV_TIE_EPSILON: f32 = 0.001;
    /// Skin used for "standing on" contact tests
    pub const CONTACT_SKIN: f32 = 1.0;
    /// Falling this far below the level bottom is fatal
    pub const FALL_OUT_MARGIN: f32 = 200.0;

    /// Stomp bounce as a fraction of jump force
    pub const STOMP_BOUNCE: f32 = 0.6;
    pub const STOMP_SCORE: u64 = 100;

    /// Animation thresholds (px/s)
    pub const JUMP_ANIM_VY: f32 = -50.0;
    pub const RUN_ANIM_VX: f32 = 30.0;

    /// Footsteps (raw milliseconds)
    pub const FOOTSTEP_INTERVAL_MS: f32 = 300.0;
    pub const FOOTSTEP_MIN_SPEED: f32 = 10.0;

    /// Time scale while slow motion is held
    pub const SLOW_MOTION_SCALE: f32 = 0.3;

    /// Enemy defaults
    pub const ENEMY_WIDTH: f32 = 45.0;
    pub const ENEMY_HEIGHT: f32 = 50.0;
    pub const ENEMY_GRAVITY: f32 = 980.0;
    pub const ENEMY_TERMINAL_VELOCITY: f32 = 600.0;
    pub const ENEMY_MOVE_RANGE: f32 = 80.0;
    pub const ENEMY_SPEED: f32 = 50.0;
    /// Ledge probe distance ahead of / below the enemy
    pub const LEDGE_PROBE: f32 = 5.0;

    /// Items
    pub const CRYSTAL_SIZE: f32 = 24.0;
    pub const CRYSTAL_VALUE: u64 = 10;
    pub const CRYSTAL_SPAWN_MS: f32 = 300.0;
    pub const CRYSTAL_COLLECT_MS: f32 = 200.0;
    pub const MAGNET_FORCE: f32 = 300.0;
    pub const POWER_UP_SIZE: f32 = 28.0;
    pub const POWER_UP_DURATION_MS: f64 = 5000.0;
    pub const POWER_UP_SPAWN_MS: f32 = 400.0;
    pub const POWER_UP_COLLECT_MS: f32 = 300.0;
    pub const MAGNET_BASE_RANGE: f32 = 120.0;
    pub const GOAL_SIZE: f32 = 32.0;
    pub const KEY_SIZE: f32 = 20.0;
    pub const DOOR_WIDTH: f32 = 32.0;
    pub const DOOR_HEIGHT: f32 = 64.0;
    pub const SECRET_REWARD: u64 = 100;

    /// Special blocks
    pub const BLOCK_SIZE: f32 = 32.0;
    pub const SPRING_FORCE: f32 = 800.0;
    pub const SPRING_COOLDOWN_MS: f32 = 100.0;
    pub const SPRING_COMPRESS_MS: f32 = 150.0;
    pub const CONVEYOR_SPEED: f32 = 100.0;
    pub const TELEPORT_COOLDOWN_MS: f32 = 500.0;

    /// Falling blocks and crumbling tiles
    pub const FALL_DELAY_MS: f32 = 1000.0;
    pub const FALLING_BLOCK_GRAVITY: f32 = 800.0;
    pub const CRUMBLE_MS: f32 = 500.0;

    /// Moving platform defaults
    pub const PLATFORM_WIDTH: f32 = 96.0;
    pub const PLATFORM_HEIGHT: f32 = 16.0;
    pub const PLATFORM_SPEED: f32 = 50.0;
}

/// Convert a millisecond frame delta to seconds
#[inline]
pub fn ms_to_secs(ms: f32) -> f32 {
    ms / 1000.0
}

/// Format milliseconds as `m:ss`
pub fn format_time(ms: u64) -> String {
    let seconds = ms / 1000;
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0:00");
        assert_eq!(format_time(61_500), "1:01");
        assert_eq!(format_time(600_000), "10:00");
    }
}
