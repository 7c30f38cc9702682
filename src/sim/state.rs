//! Game state and level session management
//!
//! [`GameState`] owns the player, the live [`World`] and the run-level
//! bookkeeping (score, phase, objectives). Loading a level is the only
//! fallible operation; everything per-frame happens in [`super::tick`].

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::arena::{Arena, Handle};
use super::blocks::{FallingBlock, MovingPlatform};
use super::enemy::Enemy;
use super::event::{DeathCause, GameEvent};
use super::items::{Crystal, Door, Goal, Key, PowerUp};
use super::level::{EntityDescriptor, Level, LevelData};
use super::objectives::{LevelMeta, ObjectiveTracker};
use super::player::Player;
use crate::consts::*;
use crate::error::LevelError;
use crate::tuning::Tuning;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Waiting for level data; ticks are skipped
    LoadingLevel,
    Playing,
    Paused,
    GameOver,
    LevelComplete,
    /// Level data was rejected
    Error,
}

/// Everything in the level except the player
#[derive(Debug, Clone, Default)]
pub struct World {
    pub level: Level,
    pub enemies: Arena<Enemy>,
    pub platforms: Vec<MovingPlatform>,
    pub keys: Vec<Key>,
    pub doors: Vec<Door>,
    pub goal: Option<Goal>,
    pub falling_blocks: Arena<FallingBlock>,
    pub crystals: Arena<Crystal>,
    pub power_ups: Arena<PowerUp>,
}

impl World {
    /// A level with no entities
    pub fn empty(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    /// Spawn every entity described by the level data
    pub fn spawn(level: Level, tuning: &Tuning, rng: &mut Pcg32) -> Self {
        let mut world = Self::empty(level);
        let data = &world.level.data;

        for entity in &data.entities {
            match *entity {
                EntityDescriptor::Enemy {
                    x,
                    y,
                    move_range,
                    speed,
                } => {
                    let direction = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
                    world.enemies.insert(Enemy::new(
                        Vec2::new(x, y),
                        move_range.unwrap_or(tuning.enemy.move_range),
                        speed.unwrap_or(tuning.enemy.speed),
                        direction,
                        &tuning.enemy,
                    ));
                }
                EntityDescriptor::Key { x, y } => world.keys.push(Key::new(Vec2::new(x, y))),
                EntityDescriptor::Door { x, y } => world.doors.push(Door::new(Vec2::new(x, y))),
                EntityDescriptor::Goal { x, y } => {
                    if world.goal.is_none() {
                        world.goal = Some(Goal::new(Vec2::new(x, y)));
                    }
                }
                EntityDescriptor::Player { .. } | EntityDescriptor::Unknown => {}
            }
        }

        world.platforms = data
            .moving_platforms
            .iter()
            .map(|p| {
                let start = Vec2::new(p.x, p.y);
                let end = Vec2::new(p.end_x.unwrap_or(p.x), p.end_y.unwrap_or(p.y));
                MovingPlatform::new(start, end, Vec2::new(p.width, p.height), p.speed)
            })
            .collect();

        world.falling_blocks = data
            .falling_blocks
            .iter()
            .map(|b| FallingBlock::new(Vec2::new(b.x, b.y), Vec2::new(b.width, b.height)))
            .collect();

        world.crystals = data
            .crystals
            .iter()
            .map(|c| Crystal::new(Vec2::new(c.x, c.y), c.kind, c.value))
            .collect();

        world.power_ups = data
            .power_ups
            .iter()
            .map(|p| PowerUp::new(Vec2::new(p.x, p.y), p.kind, p.duration))
            .collect();

        world
    }
}

/// RNG seed and stream; each level draws from its own stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        if self.stream == 0 {
            Pcg32::seed_from_u64(self.seed)
        } else {
            Pcg32::new(self.seed, self.stream)
        }
    }
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    pub rng_state: RngState,
    pub tuning: Tuning,
    pub phase: GamePhase,
    /// Index of the current level
    pub level_index: u32,
    /// Run score (persists across levels)
    pub score: u64,
    pub player: Player,
    pub world: World,
    pub objectives: ObjectiveTracker,
    /// Physics time scale while slow motion is held
    pub slow_motion_scale: f32,
    /// Time scale applied on the last frame
    pub time_scale: f32,
    /// Raw session clock in milliseconds
    pub clock_ms: f64,
    /// Raw time spent playing the current level attempt
    pub level_time_ms: f64,
    /// Events produced by the last tick
    pub frame_events: Vec<GameEvent>,
    pub last_death: Option<DeathCause>,
    /// Message for the error screen
    pub error: Option<String>,
    /// Deaths on this level, replayed into the tracker on restart
    pub deaths_this_level: u32,
    /// Crystals spawned by secret rewards; they score but are not level crystals
    pub bonus_crystals: Vec<Handle>,
    pub(super) pause_latch: bool,
    level_data: Option<LevelData>,
}

impl GameState {
    /// New session waiting for its first level
    pub fn new(seed: u64) -> Self {
        Self::with_tuning(seed, Tuning::default())
    }

    pub fn with_tuning(seed: u64, tuning: Tuning) -> Self {
        Self {
            seed,
            rng_state: RngState::new(seed),
            tuning,
            phase: GamePhase::LoadingLevel,
            level_index: 0,
            score: 0,
            player: Player::new(Vec2::ZERO, tuning.player),
            world: World::default(),
            objectives: ObjectiveTracker::new(),
            slow_motion_scale: SLOW_MOTION_SCALE,
            time_scale: 1.0,
            clock_ms: 0.0,
            level_time_ms: 0.0,
            frame_events: Vec::new(),
            last_death: None,
            error: None,
            deaths_this_level: 0,
            bonus_crystals: Vec::new(),
            pause_latch: false,
            level_data: None,
        }
    }

    /// Gate the frame loop while level data is being fetched
    pub fn begin_loading(&mut self) {
        self.phase = GamePhase::LoadingLevel;
    }

    /// Build and enter a level; on failure the session moves to `Error`
    pub fn load_level(&mut self, index: u32, data: LevelData) -> Result<(), LevelError> {
        self.deaths_this_level = 0;
        self.start_level(index, data)
    }

    pub fn load_level_json(&mut self, index: u32, json: &str) -> Result<(), LevelError> {
        match LevelData::from_json(json) {
            Ok(data) => self.load_level(index, data),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Restart the current level, keeping the death count
    pub fn restart_level(&mut self) -> Result<(), LevelError> {
        match self.level_data.clone() {
            Some(data) => self.start_level(self.level_index, data),
            None => {
                log::warn!("Restart requested with no level loaded");
                Ok(())
            }
        }
    }

    /// Reset run-wide progress (score) for a fresh run
    pub fn new_run(&mut self) {
        self.score = 0;
        self.deaths_this_level = 0;
        self.level_data = None;
        self.phase = GamePhase::LoadingLevel;
    }

    pub fn is_playing(&self) -> bool {
        self.phase == GamePhase::Playing
    }

    pub fn level_data(&self) -> Option<&LevelData> {
        self.level_data.as_ref()
    }

    fn start_level(&mut self, index: u32, data: LevelData) -> Result<(), LevelError> {
        let level = Level::from_data(data.clone()).map_err(|e| self.fail(e))?;
        let spawn = level
            .data
            .player_spawn()
            .ok_or(LevelError::MissingPlayerSpawn)
            .map_err(|e| self.fail(e))?;

        self.rng_state.stream = index as u64;
        let mut rng = self.rng_state.to_rng();
        let world = World::spawn(level, &self.tuning, &mut rng);

        self.objectives.initialize(&LevelMeta {
            total_crystals: world.crystals.len() as u32,
            total_secrets: world.level.secret_areas.len() as u32,
            time_trial_target_ms: world.level.data.time_trial_target,
            has_jump_challenge: world.level.has_jump_challenge(),
            custom: world.level.data.objectives.clone(),
        });
        for _ in 0..self.deaths_this_level {
            self.objectives.on_player_death();
        }

        log::info!(
            "Level {} ready: {} enemies, {} crystals, {} platforms",
            index,
            world.enemies.len(),
            world.crystals.len(),
            world.platforms.len()
        );

        self.player = Player::new(spawn, self.tuning.player);
        self.world = world;
        self.level_index = index;
        self.level_data = Some(data);
        self.level_time_ms = 0.0;
        self.frame_events.clear();
        self.bonus_crystals.clear();
        self.last_death = None;
        self.error = None;
        self.phase = GamePhase::Playing;
        Ok(())
    }

    fn fail(&mut self, error: LevelError) -> LevelError {
        log::error!("Level load failed: {}", error);
        self.error = Some(error.to_string());
        self.phase = GamePhase::Error;
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEVEL: &str = r#"{
        "width": 10, "height": 6, "tileSize": 32,
        "tileData": [
            0,0,0,0,0,0,0,0,0,0,
            0,0,0,0,0,0,0,0,0,0,
            0,0,0,0,0,0,0,0,0,0,
            0,0,0,0,0,0,0,0,0,0,
            0,0,0,0,0,0,0,0,0,0,
            1,1,1,1,1,1,1,1,1,1
        ],
        "entities": [
            {"type": "player", "x": 32, "y": 110},
            {"type": "enemy", "x": 200, "y": 110},
            {"type": "enemy", "x": 250, "y": 110, "moveRange": 20, "speed": 30},
            {"type": "goal", "x": 280, "y": 128},
            {"type": "key", "x": 100, "y": 130},
            {"type": "door", "x": 150, "y": 96}
        ],
        "crystals": [{"x": 64, "y": 140}, {"x": 96, "y": 140, "type": "rare", "value": 25}],
        "movingPlatforms": [{"x": 0, "y": 64, "endX": 100, "endY": 64}]
    }"#;

    #[test]
    fn test_new_state_waits_for_level() {
        let state = GameState::new(7);
        assert_eq!(state.phase, GamePhase::LoadingLevel);
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_load_level_spawns_world() {
        let mut state = GameState::new(7);
        state.load_level_json(0, LEVEL).unwrap();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.player.position, Vec2::new(32.0, 110.0));
        assert_eq!(state.world.enemies.len(), 2);
        assert_eq!(state.world.keys.len(), 1);
        assert_eq!(state.world.doors.len(), 1);
        assert!(state.world.goal.is_some());
        assert_eq!(state.world.crystals.len(), 2);
        assert_eq!(state.world.platforms[0].end, Vec2::new(100.0, 64.0));
        assert_eq!(state.world.platforms[0].size, Vec2::new(PLATFORM_WIDTH, PLATFORM_HEIGHT));

        let custom = state
            .world
            .enemies
            .values()
            .find(|e| e.spawn.x == 250.0)
            .unwrap();
        assert_eq!(custom.move_range, 20.0);
        assert_eq!(custom.velocity.x.abs(), 30.0);

        assert!(state.objectives.get("collect_all_crystals").is_some());
        assert!(state.objectives.get("air_time").is_some());
    }

    #[test]
    fn test_enemy_directions_are_seeded() {
        let mut a = GameState::new(99);
        let mut b = GameState::new(99);
        a.load_level_json(0, LEVEL).unwrap();
        b.load_level_json(0, LEVEL).unwrap();
        let dirs = |s: &GameState| -> Vec<f32> {
            s.world.enemies.values().map(|e| e.velocity.x.signum()).collect()
        };
        assert_eq!(dirs(&a), dirs(&b));
    }

    #[test]
    fn test_bad_level_enters_error_phase() {
        let mut state = GameState::new(1);
        let result = state.load_level_json(0, r#"{"width": 2, "height": 2, "tileSize": 32}"#);
        assert!(matches!(result, Err(LevelError::MissingPlayerSpawn)));
        assert_eq!(state.phase, GamePhase::Error);
        assert_eq!(state.error.as_deref(), Some("player not found in level data"));

        let result = state.load_level_json(0, "{not json");
        assert!(matches!(result, Err(LevelError::Parse(_))));
    }

    #[test]
    fn test_restart_replays_deaths() {
        let mut state = GameState::new(1);
        state.load_level_json(0, LEVEL).unwrap();
        state.deaths_this_level = 2;
        state.score = 300;
        state.restart_level().unwrap();
        assert_eq!(state.objectives.stats().death_count, 2);
        assert_eq!(state.score, 300);

        // A fresh load of a level starts clean
        state.load_level_json(1, LEVEL).unwrap();
        assert_eq!(state.objectives.stats().death_count, 0);
    }

    #[test]
    fn test_new_run_resets_score() {
        let mut state = GameState::new(1);
        state.load_level_json(0, LEVEL).unwrap();
        state.score = 1234;
        state.new_run();
        assert_eq!(state.score, 0);
        assert_eq!(state.phase, GamePhase::LoadingLevel);
        assert!(state.level_data().is_none());
    }
}
