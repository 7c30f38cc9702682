//! Per-frame simulation tick
//!
//! Advances the whole session by one rendered frame. Physics runs on the
//! scaled delta (slow motion); timers that must not stretch (effects,
//! footsteps, objective clocks) run on the raw delta.

use glam::Vec2;

use super::aabb::Aabb;
use super::event::{EventSink, GameEvent};
use super::input::{InputState, KeyCode};
use super::items::{Crystal, PowerUp, SecretReward};
use super::player::PlayerOutcome;
use super::state::{GamePhase, GameState};
use crate::consts::*;

/// Frame delta in both clocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Wall-clock milliseconds since the last frame
    pub raw_ms: f32,
    /// `raw_ms * time_scale`; drives physics
    pub scaled_ms: f32,
    pub time_scale: f32,
    /// Raw session clock at this frame
    pub now_ms: f64,
}

impl FrameTime {
    pub fn new(raw_ms: f32, time_scale: f32, now_ms: f64) -> Self {
        Self {
            raw_ms,
            scaled_ms: raw_ms * time_scale,
            time_scale,
            now_ms,
        }
    }

    pub fn unscaled(raw_ms: f32, now_ms: f64) -> Self {
        Self::new(raw_ms, 1.0, now_ms)
    }
}

/// Advance the game state by one frame of `raw_dt_ms` wall-clock time
pub fn tick(state: &mut GameState, input: &InputState, raw_dt_ms: f32) {
    state.frame_events.clear();

    // Pause toggles on the Escape press edge
    let escape = input.is_held(KeyCode::Escape);
    if escape && !state.pause_latch {
        match state.phase {
            GamePhase::Playing => {
                state.phase = GamePhase::Paused;
                log::info!("Paused");
            }
            GamePhase::Paused => {
                state.phase = GamePhase::Playing;
                log::info!("Resumed");
            }
            _ => {}
        }
    }
    state.pause_latch = escape;

    if state.phase != GamePhase::Playing {
        return;
    }

    let raw_dt_ms = if raw_dt_ms.is_finite() { raw_dt_ms.max(0.0) } else { 0.0 };
    state.time_scale = if input.slow_motion() {
        state.slow_motion_scale
    } else {
        1.0
    };
    state.clock_ms += raw_dt_ms as f64;
    state.level_time_ms += raw_dt_ms as f64;
    let time = FrameTime::new(raw_dt_ms, state.time_scale, state.clock_ms);
    let dt = time.scaled_ms;

    let mut events: Vec<GameEvent> = Vec::new();
    let world = &mut state.world;

    for platform in &mut world.platforms {
        platform.update(dt);
    }
    world.level.update(dt, &mut events);
    world.level.update_special_blocks(dt);
    world.level.update_secret_areas(raw_dt_ms);

    for enemy in world.enemies.values_mut() {
        enemy.update(dt, &world.level, &world.platforms);
    }

    let feet = foot_sensor(&state.player.bounds());
    let removal_y = world.level.fall_out_y();
    for (handle, block) in world.falling_blocks.iter_mut() {
        if block.update(dt, Some(&feet), removal_y) {
            events.emit(GameEvent::FallingBlockTriggered { block: handle });
        }
    }

    let magnet = (state.player.modifiers.magnet_range > 0.0)
        .then(|| (state.player.center(), state.player.modifiers.magnet_range));
    for crystal in world.crystals.values_mut() {
        crystal.update(dt, magnet);
    }
    for power_up in world.power_ups.values_mut() {
        power_up.update(dt);
    }

    let outcome = state.player.update(&time, input, &mut state.world, &mut events);

    match outcome {
        PlayerOutcome::Continue => {}
        PlayerOutcome::GameOver(cause) => {
            state.objectives.on_player_death();
            state.deaths_this_level += 1;
            state.last_death = Some(cause);
            events.emit(GameEvent::Died { cause });
            state.phase = GamePhase::GameOver;
            log::info!("Game over: {:?}", cause);
        }
        PlayerOutcome::LevelComplete => {
            state.objectives.on_level_finished(state.level_time_ms);
            events.emit(GameEvent::LevelCompleted {
                time_ms: state.level_time_ms as u64,
            });
            state.phase = GamePhase::LevelComplete;
            log::info!(
                "Level {} complete in {}",
                state.level_index,
                crate::format_time(state.level_time_ms as u64)
            );
        }
    }

    process_events(state, &events);

    let airborne = !state.player.grounded;
    state.objectives.update(raw_dt_ms, airborne, &mut events);

    let world = &mut state.world;
    let dead_enemies: Vec<_> = world
        .enemies
        .iter()
        .filter(|(_, e)| !e.is_active)
        .map(|(h, _)| h)
        .collect();
    for handle in dead_enemies {
        world.enemies.remove(handle);
    }
    let gone_blocks: Vec<_> = world
        .falling_blocks
        .iter()
        .filter(|(_, b)| b.is_gone())
        .map(|(h, _)| h)
        .collect();
    for handle in gone_blocks {
        world.falling_blocks.remove(handle);
    }
    let collected: Vec<_> = world
        .crystals
        .iter()
        .filter(|(_, c)| !c.is_active())
        .map(|(h, _)| h)
        .collect();
    for handle in collected {
        world.crystals.remove(handle);
        state.bonus_crystals.retain(|&h| h != handle);
    }
    let used: Vec<_> = world
        .power_ups
        .iter()
        .filter(|(_, p)| !p.is_active())
        .map(|(h, _)| h)
        .collect();
    for handle in used {
        world.power_ups.remove(handle);
    }

    state.frame_events = events;
}

/// Score, objective counters and secret rewards
fn process_events(state: &mut GameState, events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::EnemyStomped { score, .. } => state.score += score,
            GameEvent::CrystalCollected { crystal, value, .. } => {
                state.score += value;
                if !state.bonus_crystals.contains(crystal) {
                    state.objectives.on_crystal_collected();
                }
            }
            GameEvent::SecretFound { id, center, reward } => {
                state.objectives.on_secret_found();
                log::info!("Secret {} found", id);
                if let Some(reward) = reward {
                    apply_secret_reward(state, *center, *reward);
                }
            }
            _ => {}
        }
    }
}

fn apply_secret_reward(state: &mut GameState, center: Vec2, reward: SecretReward) {
    match reward {
        SecretReward::Score { value } => state.score += value,
        SecretReward::Crystal { value } => {
            let handle = state
                .world
                .crystals
                .insert(Crystal::new(center, Default::default(), value));
            state.bonus_crystals.push(handle);
        }
        SecretReward::PowerUp { kind } => {
            state
                .world
                .power_ups
                .insert(PowerUp::new(center, kind, POWER_UP_DURATION_MS));
        }
    }
}

/// Thin strip under the player's feet, for "standing on" triggers
fn foot_sensor(body: &Aabb) -> Aabb {
    Aabb::new(body.x, body.bottom(), body.width, CONTACT_SKIN)
}
