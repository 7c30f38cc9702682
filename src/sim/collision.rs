//! Collision response for the player body
//!
//! Movement is split into a horizontal and a vertical pass. After each pass
//! the body is pushed out of every obstacle it overlaps along the axis of
//! least penetration (minimum translation vector). Sub-tolerance overlaps
//! are ignored so a body resting exactly on a surface does not jitter.

use glam::Vec2;

use super::aabb::Aabb;
use super::arena::Handle;
use crate::consts::{COLLISION_TOLERANCE, MTV_TIE_EPSILON};

/// Which movement pass is being resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Horizontal,
    Vertical,
}

/// What an obstacle is, so the caller can react to landing on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleKind {
    /// Grid tile (row-major grid index)
    Tile(usize),
    /// Moving platform (index into the platform list)
    Platform(usize),
    /// Locked door (index into the door list)
    Door(usize),
    FallingBlock(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub bounds: Aabb,
    pub kind: ObstacleKind,
}

/// Outcome of one resolution pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Pushed up out of something while falling
    pub landed: bool,
    /// Last platform landed on during this pass
    pub platform: Option<usize>,
    /// Obstacles landed on (for crumble/fall triggers)
    pub landed_on: Vec<ObstacleKind>,
    /// Pushed down out of something while rising
    pub bumped_head: bool,
    /// Horizontal velocity was zeroed by a wall
    pub blocked: bool,
}

/// Push `pos` out of every overlapping obstacle, in list order
///
/// Each obstacle is tested against the box as already corrected by the
/// previous ones. Velocity components are zeroed only when moving into the
/// obstacle along the resolved axis.
pub fn resolve(
    pos: &mut Vec2,
    vel: &mut Vec2,
    size: Vec2,
    obstacles: &[Obstacle],
    phase: Phase,
) -> Resolution {
    let mut result = Resolution::default();

    for obstacle in obstacles {
        let other = &obstacle.bounds;
        if !is_finite(other) {
            continue;
        }
        let body = Aabb::from_pos_size(*pos, size);
        if !body.overlaps(other) {
            continue;
        }

        let pen = body.penetration(other);
        let (ox, oy) = (pen.overlap.x, pen.overlap.y);
        if ox < COLLISION_TOLERANCE && oy < COLLISION_TOLERANCE {
            continue;
        }

        let tie = (ox - oy).abs() < MTV_TIE_EPSILON;
        if ox > oy || (tie && phase == Phase::Vertical) {
            if pen.delta.y < 0.0 {
                // Body is above: push up
                pos.y -= oy;
                if vel.y > 0.0 {
                    vel.y = 0.0;
                    result.landed = true;
                    result.landed_on.push(obstacle.kind);
                    if let ObstacleKind::Platform(index) = obstacle.kind {
                        result.platform = Some(index);
                    }
                }
            } else {
                pos.y += oy;
                if vel.y < 0.0 {
                    vel.y = 0.0;
                    result.bumped_head = true;
                }
            }
        } else if pen.delta.x < 0.0 {
            pos.x -= ox;
            if vel.x > 0.0 {
                vel.x = 0.0;
                result.blocked = true;
            }
        } else {
            pos.x += ox;
            if vel.x < 0.0 {
                vel.x = 0.0;
                result.blocked = true;
            }
        }
    }

    result
}

fn is_finite(b: &Aabb) -> bool {
    b.x.is_finite() && b.y.is_finite() && b.width.is_finite() && b.height.is_finite()
}
