//! Level editor document model
//!
//! Editing operations on a [`LevelData`] with snapshot-based undo/redo.
//! Every mutating call that changes something pushes one snapshot; calls
//! that would change nothing leave the history alone.

use core::fmt;

use glam::Vec2;

use crate::consts::{ENEMY_MOVE_RANGE, ENEMY_SPEED, PLATFORM_HEIGHT, PLATFORM_WIDTH};
use crate::error::LevelError;
use crate::sim::aabb::Aabb;
use crate::sim::level::{EntityDescriptor, LevelData, PlatformDescriptor, TileKind};

/// Maximum undo snapshots kept
pub const MAX_HISTORY: usize = 50;

/// Size of a new document, in tiles
pub const DEFAULT_WIDTH: u32 = 30;
pub const DEFAULT_HEIGHT: u32 = 17;
pub const DEFAULT_TILE_SIZE: u32 = 32;

/// Horizontal travel of a newly placed moving platform
const NEW_PLATFORM_TRAVEL: f32 = 128.0;
const NEW_PLATFORM_SPEED: f32 = 100.0;

/// Entity kinds the editor can place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityTool {
    Player,
    Enemy,
    Goal,
    Key,
    Door,
}

impl EntityTool {
    /// Only one of these may exist in a level
    pub fn is_unique(self) -> bool {
        matches!(self, EntityTool::Player | EntityTool::Goal)
    }

    fn descriptor(self, pos: Vec2) -> EntityDescriptor {
        let (x, y) = (pos.x, pos.y);
        match self {
            EntityTool::Player => EntityDescriptor::Player { x, y },
            EntityTool::Enemy => EntityDescriptor::Enemy {
                x,
                y,
                move_range: Some(ENEMY_MOVE_RANGE),
                speed: Some(ENEMY_SPEED),
            },
            EntityTool::Goal => EntityDescriptor::Goal { x, y },
            EntityTool::Key => EntityDescriptor::Key { x, y },
            EntityTool::Door => EntityDescriptor::Door { x, y },
        }
    }

    fn matches(self, entity: &EntityDescriptor) -> bool {
        matches!(
            (self, entity),
            (EntityTool::Player, EntityDescriptor::Player { .. })
                | (EntityTool::Enemy, EntityDescriptor::Enemy { .. })
                | (EntityTool::Goal, EntityDescriptor::Goal { .. })
                | (EntityTool::Key, EntityDescriptor::Key { .. })
                | (EntityTool::Door, EntityDescriptor::Door { .. })
        )
    }
}

/// Something picked under the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index into `entities`
    Entity(usize),
    /// Index into `moving_platforms`
    Platform(usize),
}

/// Why a level cannot be play-tested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    MissingPlayer,
    MissingGoal,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPlayer => write!(f, "level needs a player"),
            Self::MissingGoal => write!(f, "level needs a goal"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Summary counts for the editor sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    pub width: u32,
    pub height: u32,
    pub walls: usize,
    pub entities: usize,
    pub platforms: usize,
}

/// A level being edited
#[derive(Debug, Clone)]
pub struct LevelDocument {
    data: LevelData,
    history: Vec<LevelData>,
    /// Index of the snapshot matching `data`
    history_index: usize,
}

impl LevelDocument {
    /// Blank level with a sky background
    pub fn new_empty(width: u32, height: u32, tile_size: u32) -> Self {
        Self::from_data(LevelData::empty(width, height, tile_size))
    }

    pub fn from_data(mut data: LevelData) -> Self {
        data.normalize_tiles();
        Self {
            history: vec![data.clone()],
            history_index: 0,
            data,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(Self::from_data(LevelData::from_json(json)?))
    }

    /// Pretty-printed level JSON, same shape the game loads
    pub fn to_json(&self) -> Result<String, LevelError> {
        self.data.to_json()
    }

    pub fn data(&self) -> &LevelData {
        &self.data
    }

    // ---- tiles ----

    fn index(&self, col: u32, row: u32) -> Option<usize> {
        (col < self.data.width && row < self.data.height)
            .then(|| (row * self.data.width + col) as usize)
    }

    /// `None` outside the grid
    pub fn tile_at(&self, col: u32, row: u32) -> Option<TileKind> {
        let index = self.index(col, row)?;
        Some(TileKind::from_code_or_solid(self.data.tile_data[index]))
    }

    /// Paint one tile. Returns false when out of bounds or unchanged.
    pub fn set_tile(&mut self, col: u32, row: u32, kind: TileKind) -> bool {
        if !self.write_tile(col, row, kind) {
            return false;
        }
        self.save_state();
        true
    }

    fn write_tile(&mut self, col: u32, row: u32, kind: TileKind) -> bool {
        let Some(index) = self.index(col, row) else {
            return false;
        };
        let code = kind.code();
        if self.data.tile_data[index] == code {
            return false;
        }
        self.data.tile_data[index] = code;
        true
    }

    /// Fill an inclusive tile rectangle, clipped to the grid, as one undo step
    pub fn fill_rect(
        &mut self,
        col0: u32,
        row0: u32,
        col1: u32,
        row1: u32,
        kind: TileKind,
    ) -> usize {
        let (c0, c1) = (col0.min(col1), col0.max(col1));
        let (r0, r1) = (row0.min(row1), row0.max(row1));
        let mut changed = 0;
        for row in r0..=r1.min(self.data.height.saturating_sub(1)) {
            for col in c0..=c1.min(self.data.width.saturating_sub(1)) {
                if self.write_tile(col, row, kind) {
                    changed += 1;
                }
            }
        }
        if changed > 0 {
            self.save_state();
        }
        changed
    }

    /// Solid ring around the level edge
    pub fn add_borders(&mut self) -> usize {
        let (w, h) = (self.data.width, self.data.height);
        if w == 0 || h == 0 {
            return 0;
        }
        let mut changed = 0;
        for col in 0..w {
            changed += self.write_tile(col, 0, TileKind::Solid) as usize;
            changed += self.write_tile(col, h - 1, TileKind::Solid) as usize;
        }
        for row in 0..h {
            changed += self.write_tile(0, row, TileKind::Solid) as usize;
            changed += self.write_tile(w - 1, row, TileKind::Solid) as usize;
        }
        if changed > 0 {
            self.save_state();
        }
        changed
    }

    /// Solid floor over the bottom two rows
    pub fn fill_bottom(&mut self) -> usize {
        let (w, h) = (self.data.width, self.data.height);
        if w == 0 || h == 0 {
            return 0;
        }
        self.fill_rect(0, h.saturating_sub(2), w - 1, h - 1, TileKind::Solid)
    }

    /// Empty every tile and remove all entities, platforms and blocks
    pub fn clear(&mut self) {
        self.data.tile_data.fill(0);
        self.data.entities.clear();
        self.data.moving_platforms.clear();
        self.data.falling_blocks.clear();
        self.save_state();
    }

    /// Change the grid size. Overlapping tiles are kept, new ones are empty.
    pub fn resize(&mut self, width: u32, height: u32, tile_size: u32) -> Result<(), LevelError> {
        if width == 0 || height == 0 || tile_size == 0 {
            return Err(LevelError::InvalidDimensions {
                width,
                height,
                tile_size,
            });
        }

        let old_width = self.data.width as usize;
        let mut tiles = vec![0; (width * height) as usize];
        for row in 0..height.min(self.data.height) as usize {
            for col in 0..width.min(self.data.width) as usize {
                tiles[row * width as usize + col] = self.data.tile_data[row * old_width + col];
            }
        }

        self.data.width = width;
        self.data.height = height;
        self.data.tile_size = tile_size;
        self.data.tile_data = tiles;
        self.save_state();
        Ok(())
    }

    // ---- entities ----

    /// Place an entity on the tile containing `col,row`. A second player or
    /// goal replaces the first.
    pub fn place_entity(&mut self, tool: EntityTool, col: u32, row: u32) -> usize {
        let ts = self.data.tile_size as f32;
        let pos = Vec2::new(col as f32 * ts, row as f32 * ts);
        if tool.is_unique() {
            self.data.entities.retain(|e| !tool.matches(e));
        }
        self.data.entities.push(tool.descriptor(pos));
        self.save_state();
        self.data.entities.len() - 1
    }

    /// New platform travelling right from the tile at `col,row`
    pub fn place_platform(&mut self, col: u32, row: u32) -> usize {
        let ts = self.data.tile_size as f32;
        let (x, y) = (col as f32 * ts, row as f32 * ts);
        self.data.moving_platforms.push(PlatformDescriptor {
            x,
            y,
            width: PLATFORM_WIDTH,
            height: PLATFORM_HEIGHT,
            end_x: Some(x + NEW_PLATFORM_TRAVEL),
            end_y: Some(y),
            speed: NEW_PLATFORM_SPEED,
        });
        self.save_state();
        self.data.moving_platforms.len() - 1
    }

    /// Topmost thing under a pixel position; entities before platforms
    pub fn entity_at(&self, pos: Vec2) -> Option<Selection> {
        let hit = |b: Aabb| {
            pos.x >= b.x && pos.x < b.right() && pos.y >= b.y && pos.y < b.bottom()
        };

        let entity = self.data.entities.iter().position(|e| {
            e.position()
                .is_some_and(|p| hit(Aabb::from_pos_size(p, e.size())))
        });
        if let Some(index) = entity {
            return Some(Selection::Entity(index));
        }

        self.data
            .moving_platforms
            .iter()
            .position(|p| hit(Aabb::new(p.x, p.y, p.width, p.height)))
            .map(Selection::Platform)
    }

    /// Delete a selection. Returns false for a stale index.
    pub fn delete(&mut self, selection: Selection) -> bool {
        let removed = match selection {
            Selection::Entity(i) if i < self.data.entities.len() => {
                self.data.entities.remove(i);
                true
            }
            Selection::Platform(i) if i < self.data.moving_platforms.len() => {
                self.data.moving_platforms.remove(i);
                true
            }
            _ => false,
        };
        if removed {
            self.save_state();
        }
        removed
    }

    /// Delete whatever is under `pos`
    pub fn remove_entity_at(&mut self, pos: Vec2) -> bool {
        match self.entity_at(pos) {
            Some(selection) => self.delete(selection),
            None => false,
        }
    }

    /// Move an existing entity to a new pixel position
    pub fn move_entity(&mut self, index: usize, pos: Vec2) -> bool {
        let Some(entity) = self.data.entities.get_mut(index) else {
            return false;
        };
        if entity.position() == Some(pos) {
            return false;
        }
        entity.set_position(pos);
        self.save_state();
        true
    }

    // ---- checks ----

    /// A level needs a player and a goal before it can be play-tested
    pub fn validate_for_test(&self) -> Result<(), ValidationError> {
        let has = |tool: EntityTool| self.data.entities.iter().any(|e| tool.matches(e));
        if !has(EntityTool::Player) {
            return Err(ValidationError::MissingPlayer);
        }
        if !has(EntityTool::Goal) {
            return Err(ValidationError::MissingGoal);
        }
        Ok(())
    }

    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            width: self.data.width,
            height: self.data.height,
            walls: self
                .data
                .tile_data
                .iter()
                .filter(|&&c| c == TileKind::Solid.code())
                .count(),
            entities: self.data.entities.len(),
            platforms: self.data.moving_platforms.len(),
        }
    }

    // ---- history ----

    fn save_state(&mut self) {
        self.history.truncate(self.history_index + 1);
        self.history.push(self.data.clone());
        if self.history.len() > MAX_HISTORY {
            self.history.remove(0);
        }
        self.history_index = self.history.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.history_index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.history_index + 1 < self.history.len()
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.history_index -= 1;
        self.data = self.history[self.history_index].clone();
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.history_index += 1;
        self.data = self.history[self.history_index].clone();
        true
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

impl Default for LevelDocument {
    fn default() -> Self {
        Self::new_empty(DEFAULT_WIDTH, DEFAULT_HEIGHT, DEFAULT_TILE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_document() {
        let doc = LevelDocument::default();
        let data = doc.data();
        assert_eq!((data.width, data.height, data.tile_size), (30, 17, 32));
        assert_eq!(data.tile_data.len(), 30 * 17);
        assert_eq!(data.background_layers[0].color, "#87CEEB");
        assert!(!doc.can_undo());
    }

    #[test]
    fn test_set_tile_and_undo_redo() {
        let mut doc = LevelDocument::new_empty(4, 4, 32);
        assert!(doc.set_tile(1, 2, TileKind::Solid));
        assert!(!doc.set_tile(1, 2, TileKind::Solid));
        assert!(!doc.set_tile(9, 0, TileKind::Solid));
        assert_eq!(doc.tile_at(1, 2), Some(TileKind::Solid));
        assert_eq!(doc.tile_at(4, 0), None);

        assert!(doc.undo());
        assert_eq!(doc.tile_at(1, 2), Some(TileKind::Empty));
        assert!(!doc.undo());
        assert!(doc.redo());
        assert_eq!(doc.tile_at(1, 2), Some(TileKind::Solid));
        assert!(!doc.redo());
    }

    #[test]
    fn test_new_edit_discards_redo() {
        let mut doc = LevelDocument::new_empty(4, 4, 32);
        doc.set_tile(0, 0, TileKind::Solid);
        doc.undo();
        doc.set_tile(1, 1, TileKind::Ice);
        assert!(!doc.can_redo());
        assert_eq!(doc.tile_at(0, 0), Some(TileKind::Empty));
    }

    #[test]
    fn test_history_is_capped() {
        let mut doc = LevelDocument::new_empty(10, 10, 32);
        for i in 0..60 {
            doc.set_tile(i % 10, i / 10, TileKind::Solid);
        }
        assert_eq!(doc.history_len(), MAX_HISTORY);
        let mut undos = 0;
        while doc.undo() {
            undos += 1;
        }
        assert_eq!(undos, MAX_HISTORY - 1);
        // The oldest snapshots were dropped
        assert_eq!(doc.tile_at(0, 0), Some(TileKind::Solid));
    }

    #[test]
    fn test_fill_rect_is_one_step() {
        let mut doc = LevelDocument::new_empty(5, 5, 32);
        assert_eq!(doc.fill_rect(3, 3, 1, 1, TileKind::Crumbling), 9);
        assert_eq!(doc.tile_at(2, 2), Some(TileKind::Crumbling));
        doc.undo();
        assert_eq!(doc.stats().walls, 0);
        assert_eq!(doc.tile_at(2, 2), Some(TileKind::Empty));
        // Clipped to the grid
        assert_eq!(doc.fill_rect(3, 3, 99, 99, TileKind::Solid), 4);
    }

    #[test]
    fn test_borders_and_floor() {
        let mut doc = LevelDocument::new_empty(5, 4, 32);
        assert_eq!(doc.add_borders(), 14);
        assert_eq!(doc.tile_at(2, 1), Some(TileKind::Empty));
        assert_eq!(doc.fill_bottom(), 3);
        assert_eq!(doc.tile_at(2, 2), Some(TileKind::Solid));
    }

    #[test]
    fn test_resize_keeps_overlap() {
        let mut doc = LevelDocument::new_empty(3, 3, 32);
        doc.set_tile(2, 2, TileKind::Solid);
        doc.set_tile(1, 0, TileKind::Ice);
        doc.resize(2, 4, 16).unwrap();
        let data = doc.data();
        assert_eq!(data.tile_data.len(), 8);
        assert_eq!(data.tile_size, 16);
        assert_eq!(doc.tile_at(1, 0), Some(TileKind::Ice));
        assert_eq!(doc.tile_at(1, 3), Some(TileKind::Empty));
        assert!(matches!(
            doc.resize(0, 4, 32),
            Err(LevelError::InvalidDimensions { width: 0, .. })
        ));
    }

    #[test]
    fn test_unique_entities_move() {
        let mut doc = LevelDocument::new_empty(10, 10, 32);
        doc.place_entity(EntityTool::Player, 1, 1);
        doc.place_entity(EntityTool::Enemy, 3, 3);
        doc.place_entity(EntityTool::Enemy, 4, 3);
        doc.place_entity(EntityTool::Player, 5, 5);
        let entities = &doc.data().entities;
        assert_eq!(entities.len(), 3);
        let players: Vec<_> = entities
            .iter()
            .filter(|e| matches!(e, EntityDescriptor::Player { .. }))
            .collect();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].position(), Some(Vec2::new(160.0, 160.0)));
    }

    #[test]
    fn test_select_and_delete() {
        let mut doc = LevelDocument::new_empty(10, 10, 32);
        doc.place_platform(0, 5);
        doc.place_entity(EntityTool::Key, 0, 5);
        assert_eq!(doc.entity_at(Vec2::new(5.0, 165.0)), Some(Selection::Entity(0)));
        assert_eq!(doc.entity_at(Vec2::new(60.0, 165.0)), Some(Selection::Platform(0)));
        assert_eq!(doc.entity_at(Vec2::new(300.0, 300.0)), None);

        assert!(doc.remove_entity_at(Vec2::new(5.0, 165.0)));
        assert!(doc.data().entities.is_empty());
        assert!(!doc.delete(Selection::Entity(3)));
        assert!(doc.delete(Selection::Platform(0)));
        assert!(doc.data().moving_platforms.is_empty());
    }

    #[test]
    fn test_validate_for_test() {
        let mut doc = LevelDocument::new_empty(10, 10, 32);
        assert_eq!(doc.validate_for_test(), Err(ValidationError::MissingPlayer));
        doc.place_entity(EntityTool::Player, 1, 1);
        assert_eq!(doc.validate_for_test(), Err(ValidationError::MissingGoal));
        doc.place_entity(EntityTool::Goal, 8, 8);
        assert_eq!(doc.validate_for_test(), Ok(()));
    }

    #[test]
    fn test_export_round_trips_through_game_loader() {
        let mut doc = LevelDocument::new_empty(6, 4, 32);
        doc.fill_bottom();
        doc.place_entity(EntityTool::Player, 1, 1);
        doc.place_entity(EntityTool::Goal, 4, 1);
        let json = doc.to_json().unwrap();
        let level = crate::sim::Level::from_json(&json).unwrap();
        assert_eq!(level.tiles.len(), 12);
        assert_eq!(level.data.player_spawn(), Some(Vec2::new(32.0, 32.0)));
    }

    #[test]
    fn test_clear() {
        let mut doc = LevelDocument::new_empty(4, 4, 32);
        doc.add_borders();
        doc.place_entity(EntityTool::Door, 1, 1);
        doc.clear();
        assert_eq!(doc.stats().walls, 0);
        assert_eq!(doc.stats().entities, 0);
        assert!(doc.undo());
        assert_eq!(doc.stats().entities, 1);
    }
}
