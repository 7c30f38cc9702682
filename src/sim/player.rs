//! The player character
//!
//! One call to [`Player::update`] runs the whole per-frame contract in a
//! fixed order: platform carry, input, gravity, horizontal pass, vertical
//! pass, landing, bounds, goal, items, special blocks, enemies, animation.
//! Fatal outcomes are returned as [`PlayerOutcome`] values.

use glam::Vec2;

use super::aabb::Aabb;
use super::blocks::{SpecialBlock, SpecialBlockKind};
use super::collision::{self, Obstacle, ObstacleKind, Phase};
use super::effects::{EffectManager, PlayerModifiers};
use super::event::{DeathCause, EventSink, GameEvent};
use super::input::InputState;
use super::level::{CrumbleState, TileKind};
use super::state::World;
use super::tick::FrameTime;
use crate::consts::*;
use crate::tuning::PlayerTuning;

/// Result of one player update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerOutcome {
    Continue,
    GameOver(DeathCause),
    LevelComplete,
}

/// Sprite animation, derived from physics every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Run,
    Jump,
    Fall,
    DoubleJump,
}

impl AnimationState {
    /// Pure function of the current physics state (no hysteresis)
    pub fn from_physics(grounded: bool, jumps: u32, velocity: Vec2) -> Self {
        if !grounded {
            if jumps > 1 {
                AnimationState::DoubleJump
            } else if velocity.y < JUMP_ANIM_VY {
                AnimationState::Jump
            } else {
                AnimationState::Fall
            }
        } else if velocity.x.abs() > RUN_ANIM_VX {
            AnimationState::Run
        } else {
            AnimationState::Idle
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Top-left corner
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub grounded: bool,
    /// Jumps since the last landing
    pub jumps: u32,
    pub has_key: bool,
    /// -1 facing left, 1 facing right
    pub facing: f32,
    pub modifiers: PlayerModifiers,
    pub effects: EffectManager,
    pub on_ice: bool,
    pub ice_friction: f32,
    pub on_conveyor: bool,
    pub conveyor_force: f32,
    /// Platform carrying the player (index into the platform list)
    pub riding_platform: Option<usize>,
    pub animation: AnimationState,
    pub tuning: PlayerTuning,
    /// Jump key was held last frame
    jump_latch: bool,
    footstep_timer_ms: f32,
}

impl Player {
    pub fn new(spawn: Vec2, tuning: PlayerTuning) -> Self {
        Self {
            position: spawn,
            velocity: Vec2::ZERO,
            size: Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
            grounded: false,
            jumps: 0,
            has_key: false,
            facing: 1.0,
            modifiers: PlayerModifiers::default(),
            effects: EffectManager::new(),
            on_ice: false,
            ice_friction: tuning.ice_friction,
            on_conveyor: false,
            conveyor_force: 0.0,
            riding_platform: None,
            animation: AnimationState::Idle,
            tuning,
            jump_latch: false,
            footstep_timer_ms: 0.0,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_pos_size(self.position, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.position + self.size / 2.0
    }

    /// Point between the feet (particle/sound origin)
    pub fn feet(&self) -> Vec2 {
        Vec2::new(self.position.x + self.size.x / 2.0, self.position.y + self.size.y)
    }

    pub fn update(
        &mut self,
        time: &FrameTime,
        input: &InputState,
        world: &mut World,
        events: &mut impl EventSink,
    ) -> PlayerOutcome {
        let dt = crate::ms_to_secs(time.scaled_ms);
        self.effects.update(time.now_ms, &mut self.modifiers, events);

        if let Some(platform) = self.riding_platform.and_then(|i| world.platforms.get(i)) {
            self.position += platform.delta_movement;
        }

        self.handle_input(input, events);
        let was_grounded = self.grounded;

        if !input.left() && !input.right() {
            let retention = if self.on_ice {
                1.0 - self.ice_friction
            } else {
                self.tuning.friction
            };
            self.velocity.x *= retention;
        }

        self.velocity.y =
            (self.velocity.y + self.tuning.gravity * dt).min(self.tuning.terminal_velocity_y);
        if self.velocity.x.abs() < VELOCITY_DEAD_ZONE {
            self.velocity.x = 0.0;
        }
        let max_x = self.tuning.max_speed_x * self.modifiers.speed_multiplier;
        self.velocity.x = self.velocity.x.clamp(-max_x, max_x);

        let obstacles = collect_obstacles(world);

        self.position.x += self.velocity.x * dt;
        collision::resolve(
            &mut self.position,
            &mut self.velocity,
            self.size,
            &obstacles,
            Phase::Horizontal,
        );

        self.position.y += self.velocity.y * dt;
        let vertical = collision::resolve(
            &mut self.position,
            &mut self.velocity,
            self.size,
            &obstacles,
            Phase::Vertical,
        );
        self.grounded = vertical.landed;
        self.riding_platform = if self.grounded { vertical.platform } else { None };

        if self.grounded && !was_grounded {
            self.jumps = 0;
            events.emit(GameEvent::Landed { pos: self.feet() });
        }
        if self.grounded {
            self.trigger_crumbling(world, events);
        }

        if let Some(outcome) = self.clamp_to_level(world) {
            return outcome;
        }

        if world
            .goal
            .as_ref()
            .is_some_and(|goal| self.bounds().overlaps(&goal.bounds()))
        {
            return PlayerOutcome::LevelComplete;
        }

        self.handle_keys_and_doors(world, events);
        self.handle_pickups(time, world, events);
        self.interact_special_blocks(&mut world.level.special_blocks, dt, events);
        self.discover_secrets(world, events);

        if let Some(outcome) = self.handle_enemies(world, events) {
            return outcome;
        }

        self.animation = AnimationState::from_physics(self.grounded, self.jumps, self.velocity);
        self.update_footsteps(time.raw_ms, events);

        PlayerOutcome::Continue
    }

    fn handle_input(&mut self, input: &InputState, events: &mut impl EventSink) {
        let speed = self.tuning.move_speed * self.modifiers.speed_multiplier;
        if input.left() {
            self.velocity.x = -speed;
            self.facing = -1.0;
        } else if input.right() {
            self.velocity.x = speed;
            self.facing = 1.0;
        }

        if !input.jump() {
            self.jump_latch = false;
            return;
        }
        if self.jump_latch {
            return;
        }
        self.jump_latch = true;

        // Landing resets the counter, so a grounded player always has jumps == 0
        if self.grounded || self.jumps < self.tuning.max_jumps {
            self.velocity.y = -self.tuning.jump_force * self.modifiers.jump_multiplier;
            self.jumps += 1;
            self.grounded = false;
            self.riding_platform = None;
            events.emit(GameEvent::Jumped {
                pos: self.feet(),
                jump_number: self.jumps,
            });
        }
    }

    /// Start crumbling any intact crumbling tile the player stands on
    fn trigger_crumbling(&self, world: &mut World, events: &mut impl EventSink) {
        let body = self.bounds();
        let under: Vec<usize> = world
            .level
            .tiles
            .iter()
            .filter(|t| {
                t.kind == TileKind::Crumbling
                    && t.crumble == CrumbleState::Intact
                    && stands_on(&body, &t.bounds)
            })
            .map(|t| t.grid_index)
            .collect();

        for tile in under {
            if world.level.trigger_crumble(tile) {
                events.emit(GameEvent::CrumbleStarted { tile });
            }
        }
    }

    /// Keep inside the level horizontally; report a fall below it
    fn clamp_to_level(&mut self, world: &World) -> Option<PlayerOutcome> {
        let right_edge = world.level.pixel_width() - self.size.x;
        if self.position.x < 0.0 {
            self.position.x = 0.0;
            self.velocity.x = 0.0;
        } else if self.position.x > right_edge {
            self.position.x = right_edge;
            self.velocity.x = 0.0;
        }

        if self.position.y > world.level.fall_out_y() {
            return Some(PlayerOutcome::GameOver(DeathCause::OutOfBounds));
        }
        None
    }

    fn handle_keys_and_doors(&mut self, world: &mut World, events: &mut impl EventSink) {
        let body = self.bounds();
        for key in world.keys.iter_mut().filter(|k| k.is_active) {
            if body.overlaps(&key.bounds()) {
                key.is_active = false;
                self.has_key = true;
                events.emit(GameEvent::KeyCollected);
            }
        }

        // Locked doors are solid, so the player can only ever touch them
        let contact = body.expanded(CONTACT_SKIN);
        for (index, door) in world.doors.iter_mut().enumerate() {
            if self.has_key && door.is_locked && contact.overlaps(&door.bounds()) {
                door.is_locked = false;
                self.has_key = false;
                log::debug!("Door {} unlocked", index);
                events.emit(GameEvent::DoorUnlocked { door: index });
            }
        }
    }

    fn handle_pickups(&mut self, time: &FrameTime, world: &mut World, events: &mut impl EventSink) {
        let body = self.bounds();
        for (handle, crystal) in world.crystals.iter_mut() {
            if crystal.try_collect(&body) {
                events.emit(GameEvent::CrystalCollected {
                    crystal: handle,
                    kind: crystal.kind,
                    value: crystal.value,
                });
            }
        }

        for power_up in world.power_ups.values_mut() {
            if power_up.try_collect(&body) {
                self.effects.add(
                    power_up.kind,
                    power_up.duration_ms,
                    time.now_ms,
                    &mut self.modifiers,
                );
                events.emit(GameEvent::PowerUpCollected {
                    kind: power_up.kind,
                    duration_ms: power_up.duration_ms,
                });
            }
        }
    }

    fn interact_special_blocks(
        &mut self,
        blocks: &mut [SpecialBlock],
        dt: f32,
        events: &mut impl EventSink,
    ) {
        self.on_ice = false;
        self.on_conveyor = false;
        self.conveyor_force = 0.0;
        let mut partner_cooldown = None;
        let mut teleported = false;

        for block in blocks.iter_mut() {
            let bounds = block.bounds;
            let body = self.bounds();
            let standing_on = self.grounded && stands_on(&body, &bounds);

            match &mut block.kind {
                SpecialBlockKind::Spring {
                    force,
                    cooldown_ms,
                    compress_ms,
                } => {
                    if *cooldown_ms <= 0.0
                        && self.velocity.y > 0.0
                        && self.position.y < bounds.y
                        && body.overlaps(&bounds)
                    {
                        self.velocity.y = -*force;
                        self.grounded = false;
                        self.jumps = 0;
                        self.riding_platform = None;
                        *cooldown_ms = SPRING_COOLDOWN_MS;
                        *compress_ms = SPRING_COMPRESS_MS;
                        events.emit(GameEvent::SpringBounce {
                            pos: Vec2::new(bounds.center().x, bounds.y),
                        });
                    }
                }
                SpecialBlockKind::Ice { friction } => {
                    if standing_on {
                        self.on_ice = true;
                        self.ice_friction = *friction;
                    }
                }
                SpecialBlockKind::Conveyor {
                    direction, speed, ..
                } => {
                    if standing_on {
                        let force = *speed * *direction;
                        self.velocity.x += force * dt;
                        self.on_conveyor = true;
                        self.conveyor_force = force;
                    }
                }
                SpecialBlockKind::Switch {
                    id,
                    target_ids,
                    activated,
                    pressed,
                } => {
                    let now_pressed = body.overlaps(&bounds) && self.velocity.y >= 0.0;
                    if now_pressed && !*pressed {
                        *activated = !*activated;
                        log::debug!("Switch {} -> {}", id, activated);
                        events.emit(GameEvent::SwitchToggled {
                            id: id.clone(),
                            target_ids: target_ids.clone(),
                            activated: *activated,
                        });
                    }
                    *pressed = now_pressed;
                }
                SpecialBlockKind::Teleport {
                    target,
                    partner,
                    cooldown_ms,
                    ..
                } => {
                    // One hop per frame
                    if !teleported && *cooldown_ms <= 0.0 && body.overlaps(&bounds) {
                        teleported = true;
                        let from = self.position;
                        self.position = *target;
                        self.velocity.x *= 0.5;
                        self.velocity.y = self.velocity.y.min(0.0);
                        self.riding_platform = None;
                        *cooldown_ms = TELEPORT_COOLDOWN_MS;
                        partner_cooldown = *partner;
                        events.emit(GameEvent::Teleported {
                            from,
                            to: self.position,
                        });
                    }
                }
            }
        }

        if let Some(SpecialBlock {
            kind: SpecialBlockKind::Teleport { cooldown_ms, .. },
            ..
        }) = partner_cooldown.and_then(|i| blocks.get_mut(i))
        {
            *cooldown_ms = TELEPORT_COOLDOWN_MS;
        }
    }

    fn discover_secrets(&self, world: &mut World, events: &mut impl EventSink) {
        let body = self.bounds();
        for area in &mut world.level.secret_areas {
            if area.check_discovery(&body) {
                log::debug!("Secret {} discovered", area.id);
                events.emit(GameEvent::SecretFound {
                    id: area.id.clone(),
                    center: area.bounds.center(),
                    reward: area.reward,
                });
            }
        }
    }

    fn handle_enemies(
        &mut self,
        world: &mut World,
        events: &mut impl EventSink,
    ) -> Option<PlayerOutcome> {
        for (handle, enemy) in world.enemies.iter_mut() {
            if !enemy.is_active {
                continue;
            }
            let body = self.bounds();
            let foe = enemy.bounds();
            if !body.overlaps(&foe) {
                continue;
            }

            let stomping = self.velocity.y > 0.0 && body.bottom() < foe.y + foe.height * 0.5;
            if stomping {
                enemy.is_active = false;
                self.velocity.y = -self.tuning.jump_force * STOMP_BOUNCE;
                events.emit(GameEvent::EnemyStomped {
                    enemy: handle,
                    score: STOMP_SCORE,
                });
            } else if !self.modifiers.invulnerable {
                return Some(PlayerOutcome::GameOver(DeathCause::Enemy));
            }
        }
        None
    }

    fn update_footsteps(&mut self, raw_ms: f32, events: &mut impl EventSink) {
        if self.grounded && self.velocity.x.abs() > FOOTSTEP_MIN_SPEED {
            self.footstep_timer_ms += raw_ms;
            if self.footstep_timer_ms >= FOOTSTEP_INTERVAL_MS {
                self.footstep_timer_ms = 0.0;
                events.emit(GameEvent::Footstep);
            }
        } else {
            self.footstep_timer_ms = 0.0;
        }
    }
}

/// `body` rests on top of `surface`: horizontal overlap and feet within the contact skin
fn stands_on(body: &Aabb, surface: &Aabb) -> bool {
    body.x < surface.right()
        && body.right() > surface.x
        && (surface.y - body.bottom()).abs() <= CONTACT_SKIN
}

/// Everything the player collides with, in resolution order
fn collect_obstacles(world: &World) -> Vec<Obstacle> {
    let tiles = world.level.tiles.iter().map(|t| Obstacle {
        bounds: t.bounds,
        kind: ObstacleKind::Tile(t.grid_index),
    });
    let platforms = world
        .platforms
        .iter()
        .enumerate()
        .map(|(i, p)| Obstacle {
            bounds: p.bounds(),
            kind: ObstacleKind::Platform(i),
        });
    let doors = world
        .doors
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_locked)
        .map(|(i, d)| Obstacle {
            bounds: d.bounds(),
            kind: ObstacleKind::Door(i),
        });
    let falling = world
        .falling_blocks
        .iter()
        .filter(|(_, b)| !b.is_gone())
        .map(|(h, b)| Obstacle {
            bounds: b.bounds(),
            kind: ObstacleKind::FallingBlock(h),
        });

    tiles.chain(platforms).chain(doors).chain(falling).collect()
}
