//! Axis-aligned bounding boxes
//!
//! All collision in the game is box-vs-box. Positions are top-left corners in
//! pixels, y grows downward.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned box (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Penetration of one box into another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Center-to-center delta (self minus other)
    pub delta: Vec2,
    /// Overlap depth per axis (positive when overlapping)
    pub overlap: Vec2,
}

impl Aabb {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_pos_size(pos: Vec2, size: Vec2) -> Self {
        Self::new(pos.x, pos.y, size.x, size.y)
    }

    /// Box of the given size centered on `center`
    pub fn centered(center: Vec2, size: Vec2) -> Self {
        Self::from_pos_size(center - size / 2.0, size)
    }

    #[inline]
    pub fn pos(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Strict overlap test: boxes sharing only an edge do not collide
    #[inline]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    /// Grow the box by `skin` on every side
    pub fn expanded(&self, skin: f32) -> Self {
        Self::new(
            self.x - skin,
            self.y - skin,
            self.width + skin * 2.0,
            self.height + skin * 2.0,
        )
    }

    /// Center delta and per-axis overlap against `other`
    pub fn penetration(&self, other: &Aabb) -> Penetration {
        let delta = self.center() - other.center();
        let half_sum = Vec2::new(
            (self.width + other.width) / 2.0,
            (self.height + other.height) / 2.0,
        );
        Penetration {
            delta,
            overlap: half_sum - delta.abs(),
        }
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.right() && p.y >= self.y && p.y < self.bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_touch_is_not_overlap() {
        let a = Aabb::new(0.0, 0.0, 32.0, 50.0);
        let b = Aabb::new(32.0, 0.0, 32.0, 32.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        let below = Aabb::new(0.0, 50.0, 32.0, 32.0);
        assert!(!a.overlaps(&below));
        assert!(a.expanded(1.0).overlaps(&below));
    }

    #[test]
    fn test_penetration_depths() {
        let a = Aabb::new(0.0, 0.0, 10.0, 10.0);
        let b = Aabb::new(8.0, 3.0, 10.0, 10.0);
        let p = a.penetration(&b);
        assert!((p.overlap.x - 2.0).abs() < 1e-5);
        assert!((p.overlap.y - 7.0).abs() < 1e-5);
        assert!(p.delta.x < 0.0);
        assert!(p.delta.y < 0.0);
    }

    #[test]
    fn test_centered() {
        let b = Aabb::centered(Vec2::new(100.0, 100.0), Vec2::splat(24.0));
        assert_eq!(b.pos(), Vec2::new(88.0, 88.0));
        assert_eq!(b.center(), Vec2::new(100.0, 100.0));
    }
}
