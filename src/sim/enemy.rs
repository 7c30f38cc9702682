//! Patrolling ground enemy
//!
//! Walks back and forth around its spawn point. Turns around on a wall hit,
//! at the edge of its patrol range, or when there is no floor ahead.

use glam::Vec2;

use super::aabb::Aabb;
use super::blocks::MovingPlatform;
use super::level::Level;
use crate::consts::*;
use crate::tuning::EnemyTuning;

#[derive(Debug, Clone)]
pub struct Enemy {
    pub position: Vec2,
    pub velocity: Vec2,
    pub size: Vec2,
    pub spawn: Vec2,
    /// Patrol half-range around the spawn x
    pub move_range: f32,
    pub speed: f32,
    pub gravity: f32,
    pub terminal_velocity: f32,
    pub grounded: bool,
    /// Cleared when stomped; the orchestrator removes it at frame end
    pub is_active: bool,
}

impl Enemy {
    /// `direction` picks the initial walking direction (sign only)
    pub fn new(
        spawn: Vec2,
        move_range: f32,
        speed: f32,
        direction: f32,
        tuning: &EnemyTuning,
    ) -> Self {
        let dir = if direction < 0.0 { -1.0 } else { 1.0 };
        Self {
            position: spawn,
            velocity: Vec2::new(speed * dir, 0.0),
            size: Vec2::new(ENEMY_WIDTH, ENEMY_HEIGHT),
            spawn,
            move_range,
            speed,
            gravity: tuning.gravity,
            terminal_velocity: tuning.terminal_velocity,
            grounded: false,
            is_active: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_pos_size(self.position, self.size)
    }

    pub fn update(&mut self, dt_ms: f32, level: &Level, platforms: &[MovingPlatform]) {
        if !self.is_active {
            return;
        }
        let dt = crate::ms_to_secs(dt_ms);

        self.velocity.y = (self.velocity.y + self.gravity * dt).min(self.terminal_velocity);

        // Horizontal: revert and turn around on any hit
        let old_x = self.position.x;
        self.position.x += self.velocity.x * dt;
        if self.hits_wall(level) || self.hits_platform(platforms) {
            self.position.x = old_x;
            self.velocity.x = -self.velocity.x;
        }

        self.position.y += self.velocity.y * dt;
        self.grounded = false;
        self.resolve_tiles_vertical(level);
        self.resolve_platforms_vertical(platforms);

        if self.grounded && !self.floor_ahead(level, platforms) {
            self.velocity.x = -self.velocity.x;
        }

        // Past either end of the patrol: head back toward spawn
        if self.position.x >= self.spawn.x + self.move_range {
            self.velocity.x = -self.speed;
        } else if self.position.x <= self.spawn.x - self.move_range {
            self.velocity.x = self.speed;
        }
    }

    /// Grid cells covered by the body (right/bottom edges exclusive)
    fn covered_cells(&self, level: &Level, include_bottom_edge: bool) -> (i32, i32, i32, i32) {
        let size = level.tile_size();
        let bottom = if include_bottom_edge {
            self.position.y + self.size.y
        } else {
            self.position.y + self.size.y - 1.0
        };
        (
            (self.position.x / size).floor() as i32,
            ((self.position.x + self.size.x - 1.0) / size).floor() as i32,
            (self.position.y / size).floor() as i32,
            (bottom / size).floor() as i32,
        )
    }

    fn hits_wall(&self, level: &Level) -> bool {
        let (left, right, top, bottom) = self.covered_cells(level, false);
        (left..=right).any(|col| (top..=bottom).any(|row| level.is_solid_at(col, row)))
    }

    fn hits_platform(&self, platforms: &[MovingPlatform]) -> bool {
        let body = self.bounds();
        platforms.iter().any(|p| body.overlaps(&p.bounds()))
    }

    fn resolve_tiles_vertical(&mut self, level: &Level) {
        let size = level.tile_size();
        let (left, right, top, bottom) = self.covered_cells(level, true);
        for col in left..=right {
            for row in top..=bottom {
                if !level.is_solid_at(col, row) {
                    continue;
                }
                let tile = Aabb::new(col as f32 * size, row as f32 * size, size, size);
                if !self.bounds().overlaps(&tile) {
                    continue;
                }
                if self.velocity.y > 0.0 {
                    self.position.y = tile.y - self.size.y;
                    self.velocity.y = 0.0;
                    self.grounded = true;
                } else if self.velocity.y < 0.0 {
                    self.position.y = tile.bottom();
                    self.velocity.y = 0.0;
                }
            }
        }
    }

    fn resolve_platforms_vertical(&mut self, platforms: &[MovingPlatform]) {
        for platform in platforms {
            let top = platform.bounds();
            if self.velocity.y >= 0.0 && self.bounds().overlaps(&top) {
                self.position.y = top.y - self.size.y;
                self.position.x += platform.delta_movement.x;
                self.velocity.y = 0.0;
                self.grounded = true;
            }
        }
    }

    fn floor_ahead(&self, level: &Level, platforms: &[MovingPlatform]) -> bool {
        let front_x = if self.velocity.x > 0.0 {
            self.position.x + self.size.x + LEDGE_PROBE
        } else {
            self.position.x - LEDGE_PROBE
        };
        let probe = Vec2::new(front_x, self.position.y + self.size.y + LEDGE_PROBE);
        let (col, row) = level.cell_at(probe);
        level.is_solid_at(col, row) || platforms.iter().any(|p| p.bounds().contains_point(probe))
    }
}
