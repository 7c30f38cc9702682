//! Interactive blocks: special tiles, falling blocks, moving platforms
//!
//! Special blocks are a closed set of variants matched exhaustively; each
//! keeps its own timers as millisecond countdowns driven by the frame delta.

use glam::Vec2;

use super::aabb::Aabb;
use crate::consts::*;

/// Variant data for a special block
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialBlockKind {
    /// Launches the player upward when landed on from above
    Spring {
        force: f32,
        cooldown_ms: f32,
        compress_ms: f32,
    },
    /// Low-friction floor
    Ice { friction: f32 },
    /// Pushes a standing player sideways; `direction` is -1 or 1
    Conveyor {
        direction: f32,
        speed: f32,
        belt_offset: f32,
    },
    /// Toggled on the frame the player first presses it
    Switch {
        id: String,
        target_ids: Vec<String>,
        activated: bool,
        pressed: bool,
    },
    /// Moves the player to `target`; `partner` is the paired teleport's index
    Teleport {
        id: String,
        target: Vec2,
        partner: Option<usize>,
        cooldown_ms: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpecialBlock {
    pub bounds: Aabb,
    pub kind: SpecialBlockKind,
}

impl SpecialBlock {
    pub fn spring(pos: Vec2, force: f32) -> Self {
        Self::at(
            pos,
            SpecialBlockKind::Spring {
                force,
                cooldown_ms: 0.0,
                compress_ms: 0.0,
            },
        )
    }

    pub fn ice(pos: Vec2) -> Self {
        Self::at(
            pos,
            SpecialBlockKind::Ice {
                friction: ICE_FRICTION,
            },
        )
    }

    pub fn conveyor(pos: Vec2, direction: f32, speed: f32) -> Self {
        Self::at(
            pos,
            SpecialBlockKind::Conveyor {
                direction: direction.signum(),
                speed,
                belt_offset: 0.0,
            },
        )
    }

    pub fn switch(pos: Vec2, id: impl Into<String>, target_ids: Vec<String>) -> Self {
        Self::at(
            pos,
            SpecialBlockKind::Switch {
                id: id.into(),
                target_ids,
                activated: false,
                pressed: false,
            },
        )
    }

    pub fn teleport(pos: Vec2, id: impl Into<String>, target: Vec2) -> Self {
        Self::at(
            pos,
            SpecialBlockKind::Teleport {
                id: id.into(),
                target,
                partner: None,
                cooldown_ms: 0.0,
            },
        )
    }

    fn at(pos: Vec2, kind: SpecialBlockKind) -> Self {
        Self {
            bounds: Aabb::from_pos_size(pos, Vec2::splat(BLOCK_SIZE)),
            kind,
        }
    }

    /// Springs, switches and teleports are pass-through triggers
    pub fn is_solid(&self) -> bool {
        matches!(
            self.kind,
            SpecialBlockKind::Ice { .. } | SpecialBlockKind::Conveyor { .. }
        )
    }

    /// Compression amount of a spring, 0..1
    pub fn spring_compression(&self) -> f32 {
        match self.kind {
            SpecialBlockKind::Spring { compress_ms, .. } => {
                (compress_ms / SPRING_COMPRESS_MS).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Tick timers down
    pub fn update(&mut self, dt_ms: f32) {
        match &mut self.kind {
            SpecialBlockKind::Spring {
                cooldown_ms,
                compress_ms,
                ..
            } => {
                *cooldown_ms = (*cooldown_ms - dt_ms).max(0.0);
                *compress_ms = (*compress_ms - dt_ms).max(0.0);
            }
            SpecialBlockKind::Conveyor {
                direction,
                speed,
                belt_offset,
            } => {
                let step = *direction * *speed * crate::ms_to_secs(dt_ms);
                *belt_offset = (*belt_offset + step).rem_euclid(BLOCK_SIZE);
            }
            SpecialBlockKind::Teleport { cooldown_ms, .. } => {
                *cooldown_ms = (*cooldown_ms - dt_ms).max(0.0);
            }
            SpecialBlockKind::Ice { .. } | SpecialBlockKind::Switch { .. } => {}
        }
    }
}

/// Inputs that drive a falling block's state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallingInput {
    PlayerContact,
    Elapsed { ms: f32, fall_delay_ms: f32 },
    BelowLevel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallingState {
    Idle,
    Triggered { elapsed_ms: f32 },
    Falling,
    Gone,
}

impl FallingState {
    /// Transition table; unlisted pairs keep the current state
    pub fn next(self, input: FallingInput) -> FallingState {
        match (self, input) {
            (FallingState::Idle, FallingInput::PlayerContact) => {
                FallingState::Triggered { elapsed_ms: 0.0 }
            }
            (
                FallingState::Triggered { elapsed_ms },
                FallingInput::Elapsed { ms, fall_delay_ms },
            ) => {
                let elapsed_ms = elapsed_ms + ms;
                if elapsed_ms >= fall_delay_ms {
                    FallingState::Falling
                } else {
                    FallingState::Triggered { elapsed_ms }
                }
            }
            (FallingState::Falling, FallingInput::BelowLevel) => FallingState::Gone,
            (state, _) => state,
        }
    }
}

/// A block that drops after the player touches it
#[derive(Debug, Clone)]
pub struct FallingBlock {
    pub position: Vec2,
    pub origin: Vec2,
    pub size: Vec2,
    pub velocity: Vec2,
    pub state: FallingState,
    pub fall_delay_ms: f32,
    pub gravity: f32,
    /// Visual jitter while triggered
    pub shake_offset: Vec2,
}

impl FallingBlock {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            origin: position,
            size,
            velocity: Vec2::ZERO,
            state: FallingState::Idle,
            fall_delay_ms: FALL_DELAY_MS,
            gravity: FALLING_BLOCK_GRAVITY,
            shake_offset: Vec2::ZERO,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_pos_size(self.position, self.size)
    }

    pub fn is_falling(&self) -> bool {
        self.state == FallingState::Falling
    }

    pub fn is_triggered(&self) -> bool {
        !matches!(self.state, FallingState::Idle)
    }

    pub fn is_gone(&self) -> bool {
        self.state == FallingState::Gone
    }

    /// Advance one frame. `contact` is the player's foot sensor.
    /// Returns true on the frame the block gets triggered.
    pub fn update(&mut self, dt_ms: f32, contact: Option<&Aabb>, removal_y: f32) -> bool {
        let mut triggered_now = false;
        if self.state == FallingState::Idle
            && contact.is_some_and(|c| c.overlaps(&self.bounds()))
        {
            self.state = self.state.next(FallingInput::PlayerContact);
            triggered_now = true;
        }

        match self.state {
            FallingState::Idle | FallingState::Gone => {}
            FallingState::Triggered { elapsed_ms } => {
                // Shake a little harder as the drop approaches
                let intensity = 2.0 * (elapsed_ms / self.fall_delay_ms).min(1.0);
                let phase = elapsed_ms * 0.05;
                self.shake_offset = Vec2::new(phase.sin(), (phase * 1.3).cos()) * intensity;
                self.state = self.state.next(FallingInput::Elapsed {
                    ms: dt_ms,
                    fall_delay_ms: self.fall_delay_ms,
                });
                if self.is_falling() {
                    self.shake_offset = Vec2::ZERO;
                    log::debug!("Falling block at {:?} dropped", self.origin);
                }
            }
            FallingState::Falling => {
                let dt = crate::ms_to_secs(dt_ms);
                self.velocity.y += self.gravity * dt;
                self.position.y += self.velocity.y * dt;
                if self.position.y > removal_y {
                    self.state = self.state.next(FallingInput::BelowLevel);
                }
            }
        }

        triggered_now
    }
}

/// A platform that ping-pongs between two points at constant speed
#[derive(Debug, Clone)]
pub struct MovingPlatform {
    pub position: Vec2,
    pub start: Vec2,
    pub end: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub velocity: Vec2,
    /// Displacement applied during the last update (carried riders move by this)
    pub delta_movement: Vec2,
    heading_to_end: bool,
}

impl MovingPlatform {
    pub fn new(start: Vec2, end: Vec2, size: Vec2, speed: f32) -> Self {
        Self {
            position: start,
            start,
            end,
            size,
            speed,
            velocity: Vec2::ZERO,
            delta_movement: Vec2::ZERO,
            heading_to_end: true,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_pos_size(self.position, self.size)
    }

    pub fn update(&mut self, dt_ms: f32) {
        let before = self.position;
        let mut budget = self.speed * crate::ms_to_secs(dt_ms);

        // Spend the whole step, turning around at an endpoint if needed
        while budget > 0.0 {
            let target = if self.heading_to_end { self.end } else { self.start };
            let to_target = target - self.position;
            let distance = to_target.length();
            if distance <= f32::EPSILON {
                if self.start == self.end {
                    break;
                }
                self.heading_to_end = !self.heading_to_end;
                continue;
            }
            if budget >= distance {
                self.position = target;
                budget -= distance;
                self.heading_to_end = !self.heading_to_end;
            } else {
                self.position += to_target / distance * budget;
                budget = 0.0;
            }
        }

        self.delta_movement = self.position - before;
        let dt = crate::ms_to_secs(dt_ms);
        self.velocity = if dt > 0.0 {
            self.delta_movement / dt
        } else {
            Vec2::ZERO
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falling_block_waits_full_delay() {
        let mut block = FallingBlock::new(Vec2::new(64.0, 64.0), Vec2::splat(32.0));
        let contact = Aabb::new(64.0, 31.0, 32.0, 34.0);

        assert!(block.update(500.0, Some(&contact), 1000.0));
        assert!(block.is_triggered());
        assert!(!block.is_falling());

        block.update(499.0, None, 1000.0);
        assert!(!block.is_falling());
        assert_eq!(block.velocity.y, 0.0);

        block.update(1.0, None, 1000.0);
        assert!(block.is_falling());

        block.update(16.0, None, 1000.0);
        assert!(block.velocity.y > 0.0);
        assert!(block.position.y > 64.0);
    }

    #[test]
    fn test_falling_block_removed_below_level() {
        let mut block = FallingBlock::new(Vec2::new(0.0, 0.0), Vec2::splat(32.0));
        block.state = FallingState::Falling;
        for _ in 0..200 {
            block.update(16.0, None, 300.0);
            if block.is_gone() {
                break;
            }
        }
        assert!(block.is_gone());
    }

    #[test]
    fn test_falling_state_ignores_unlisted_inputs() {
        assert_eq!(
            FallingState::Idle.next(FallingInput::BelowLevel),
            FallingState::Idle
        );
        assert_eq!(
            FallingState::Falling.next(FallingInput::PlayerContact),
            FallingState::Falling
        );
    }

    #[test]
    fn test_platform_ping_pong() {
        let mut platform = MovingPlatform::new(
            Vec2::new(0.0, 100.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(PLATFORM_WIDTH, PLATFORM_HEIGHT),
            50.0,
        );
        // 2.5s at 50px/s: out to 100 and back 25
        for _ in 0..25 {
            platform.update(100.0);
        }
        assert!((platform.position.x - 75.0).abs() < 0.01);
        assert!(platform.velocity.x < 0.0);
        assert!((platform.delta_movement.x + 5.0).abs() < 0.01);
    }

    #[test]
    fn test_stationary_platform() {
        let p = Vec2::new(10.0, 10.0);
        let mut platform = MovingPlatform::new(p, p, Vec2::splat(32.0), 50.0);
        platform.update(16.0);
        assert_eq!(platform.position, p);
        assert_eq!(platform.delta_movement, Vec2::ZERO);
    }

    #[test]
    fn test_spring_cooldown_counts_down() {
        let mut spring = SpecialBlock::spring(Vec2::ZERO, SPRING_FORCE);
        if let SpecialBlockKind::Spring {
            cooldown_ms,
            compress_ms,
            ..
        } = &mut spring.kind
        {
            *cooldown_ms = SPRING_COOLDOWN_MS;
            *compress_ms = SPRING_COMPRESS_MS;
        }
        assert_eq!(spring.spring_compression(), 1.0);
        spring.update(60.0);
        spring.update(60.0);
        match spring.kind {
            SpecialBlockKind::Spring { cooldown_ms, .. } => assert_eq!(cooldown_ms, 0.0),
            _ => unreachable!(),
        }
        assert!(!spring.is_solid());
        assert!(SpecialBlock::ice(Vec2::ZERO).is_solid());
    }
}
