//! End-to-end frames through the public `GameState` API

use chrono_platformer::editor::{EntityTool, LevelDocument};
use chrono_platformer::sim::{GameEvent, GamePhase, GameState, InputState, KeyCode, tick};
use serde_json::{Value, json};

const FRAME_MS: f32 = 16.0;

/// 20x8 level with a solid floor on the bottom row
fn floor_level(entities: Value, extra: Value) -> String {
    let (w, h) = (20usize, 8usize);
    let mut tiles = vec![0; w * h];
    for tile in tiles.iter_mut().skip(w * (h - 1)) {
        *tile = 1;
    }
    let mut level = json!({
        "width": w,
        "height": h,
        "tileSize": 32,
        "tileData": tiles,
        "entities": entities,
    });
    if let (Some(level), Some(extra)) = (level.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            level.insert(k.clone(), v.clone());
        }
    }
    level.to_string()
}

fn start(seed: u64, json: &str) -> GameState {
    let mut state = GameState::new(seed);
    state.load_level_json(0, json).unwrap();
    assert_eq!(state.phase, GamePhase::Playing);
    state
}

fn run(state: &mut GameState, input: &InputState, frames: usize) {
    for _ in 0..frames {
        tick(state, input, FRAME_MS);
    }
}

#[test]
fn player_rests_on_floor() {
    let json = floor_level(json!([{"type": "player", "x": 100, "y": 174}]), json!({}));
    let mut state = start(1, &json);
    run(&mut state, &InputState::new(), 60);

    assert!((state.player.position.y - 174.0).abs() < 1e-3);
    assert!((state.player.position.x - 100.0).abs() < 1e-3);
    assert_eq!(state.player.velocity.y, 0.0);
    assert!(state.player.grounded);
    assert_eq!(state.phase, GamePhase::Playing);
}

#[test]
fn touching_goal_edge_does_not_finish() {
    // Player right edge at x=132, goal starts exactly there
    let json = floor_level(
        json!([
            {"type": "player", "x": 100, "y": 174},
            {"type": "goal", "x": 132, "y": 192}
        ]),
        json!({}),
    );
    let mut state = start(1, &json);
    run(&mut state, &InputState::new(), 30);

    assert_eq!(state.phase, GamePhase::Playing);
    assert!(!state.objectives.stats().level_finished);
}

#[test]
fn enemy_patrol_turns_at_range() {
    let json = floor_level(
        json!([
            {"type": "player", "x": 40, "y": 174},
            {"type": "enemy", "x": 400, "y": 174, "moveRange": 80, "speed": 50}
        ]),
        json!({}),
    );
    // Pick a seed whose enemy starts walking right
    let mut state = (0..64)
        .map(|seed| start(seed, &json))
        .find(|s| s.world.enemies.values().all(|e| e.velocity.x > 0.0))
        .expect("some seed walks right");

    let mut reversed_at = None;
    let mut max_x: f32 = 400.0;
    for frame in 0..200 {
        tick(&mut state, &InputState::new(), FRAME_MS);
        let enemy = state.world.enemies.values().next().unwrap();
        max_x = max_x.max(enemy.position.x);
        if enemy.velocity.x < 0.0 && reversed_at.is_none() {
            reversed_at = Some(frame);
        }
    }

    let frame = reversed_at.unwrap();
    assert!((99..=101).contains(&frame), "reversed at frame {}", frame);
    assert!(max_x <= 481.0);
    assert_eq!(state.phase, GamePhase::Playing);
}

#[test]
fn enemy_directions_repeat_for_a_seed() {
    let json = floor_level(
        json!([
            {"type": "player", "x": 40, "y": 174},
            {"type": "enemy", "x": 200, "y": 174},
            {"type": "enemy", "x": 300, "y": 174},
            {"type": "enemy", "x": 400, "y": 174},
            {"type": "enemy", "x": 500, "y": 174}
        ]),
        json!({}),
    );
    let directions = |s: &GameState| -> Vec<f32> {
        s.world.enemies.values().map(|e| e.velocity.x.signum()).collect()
    };

    let mut a = start(77, &json);
    let b = start(77, &json);
    assert_eq!(directions(&a), directions(&b));

    let first = directions(&a);
    run(&mut a, &InputState::new(), 20);
    a.restart_level().unwrap();
    assert_eq!(directions(&a), first);
}

#[test]
fn legendary_crystal_scores_once() {
    // Crystal centered on the player body
    let json = floor_level(
        json!([{"type": "player", "x": 100, "y": 174}]),
        json!({"crystals": [{"x": 116, "y": 199, "value": 50, "type": "legendary"}]}),
    );
    let mut state = start(1, &json);
    assert_eq!(state.objectives.stats().total_crystals, 1);

    tick(&mut state, &InputState::new(), FRAME_MS);
    assert_eq!(state.score, 50);
    assert_eq!(state.objectives.stats().crystals_collected, 1);
    assert!(state.frame_events.iter().any(|e| matches!(
        e,
        GameEvent::CrystalCollected { value: 50, .. }
    )));
    // Still animating
    assert_eq!(state.world.crystals.len(), 1);

    run(&mut state, &InputState::new(), 20);
    assert!(state.world.crystals.is_empty());
    assert_eq!(state.score, 50);
    assert_eq!(state.objectives.stats().crystals_collected, 1);
    assert!(state.objectives.is_completed("collect_all_crystals"));
}

#[test]
fn falling_block_waits_before_dropping() {
    // No floor: the player stands on the block alone
    let empty = vec![0; 160];
    let json = json!({
        "width": 20, "height": 8, "tileSize": 32,
        "tileData": empty,
        "entities": [{"type": "player", "x": 100, "y": 150}],
        "fallingBlocks": [{"x": 100, "y": 200}]
    })
    .to_string();
    let mut state = start(1, &json);

    let mut dropped_on = None;
    for frame in 1..=80 {
        tick(&mut state, &InputState::new(), FRAME_MS);
        let block = state.world.falling_blocks.values().next().unwrap();
        if frame == 1 {
            assert!(block.is_triggered());
            assert!(
                state
                    .frame_events
                    .iter()
                    .any(|e| matches!(e, GameEvent::FallingBlockTriggered { .. }))
            );
        }
        if block.is_falling() && dropped_on.is_none() {
            dropped_on = Some(frame);
        }
        if dropped_on.is_none() {
            assert_eq!(block.velocity.y, 0.0);
            assert_eq!(block.position.y, 200.0);
        }
    }

    // 62 frames is 992 ms, 63 frames is 1008 ms
    assert_eq!(dropped_on, Some(63));
    let block = state.world.falling_blocks.values().next().unwrap();
    assert!(block.velocity.y > 0.0);
    assert!(block.position.y > 200.0);
}

#[test]
fn falling_out_ends_the_run_and_restart_keeps_deaths() {
    let empty = vec![0; 160];
    let json = json!({
        "width": 20, "height": 8, "tileSize": 32,
        "tileData": empty,
        "entities": [{"type": "player", "x": 100, "y": 100}]
    })
    .to_string();
    let mut state = start(1, &json);

    for _ in 0..300 {
        tick(&mut state, &InputState::new(), FRAME_MS);
        if state.phase != GamePhase::Playing {
            break;
        }
    }
    assert_eq!(state.phase, GamePhase::GameOver);
    assert!(
        state
            .frame_events
            .iter()
            .any(|e| matches!(e, GameEvent::Died { .. }))
    );

    // Game over freezes the simulation
    let frozen = state.player.position;
    tick(&mut state, &InputState::new(), FRAME_MS);
    assert_eq!(state.player.position, frozen);

    state.restart_level().unwrap();
    assert_eq!(state.phase, GamePhase::Playing);
    assert_eq!(state.deaths_this_level, 1);
    assert_eq!(state.objectives.stats().death_count, 1);
    assert_eq!(state.player.position.y, 100.0);
}

#[test]
fn pause_freezes_the_clock() {
    let json = floor_level(json!([{"type": "player", "x": 100, "y": 174}]), json!({}));
    let mut state = start(1, &json);
    run(&mut state, &InputState::new(), 10);
    let clock = state.level_time_ms;

    let esc = InputState::holding(&[KeyCode::Escape]);
    tick(&mut state, &esc, FRAME_MS);
    assert_eq!(state.phase, GamePhase::Paused);
    run(&mut state, &InputState::new(), 10);
    assert_eq!(state.level_time_ms, clock);
}

#[test]
fn editor_level_is_playable() {
    let mut doc = LevelDocument::new_empty(30, 17, 32);
    doc.fill_bottom();
    doc.place_entity(EntityTool::Player, 2, 13);
    doc.place_entity(EntityTool::Goal, 20, 14);
    doc.validate_for_test().unwrap();

    let json = doc.to_json().unwrap();
    let mut state = GameState::new(9);
    state.load_level_json(0, &json).unwrap();
    assert!(state.is_playing());

    let right = InputState::holding(&[KeyCode::ArrowRight]);
    for _ in 0..400 {
        tick(&mut state, &right, FRAME_MS);
        if state.phase != GamePhase::Playing {
            break;
        }
    }
    assert_eq!(state.phase, GamePhase::LevelComplete);
    assert!(state.objectives.is_completed("no_death"));
}
