//! Level data and the derived tile grid
//!
//! [`LevelData`] is the JSON document (levels on disk, editor exports).
//! [`Level`] owns a normalized copy of it plus everything derived from the
//! flat tile array: collidable tiles, grid special blocks and secret areas.
//! [`Level::build_level`] rebuilds all derived collections from scratch and
//! can be called whenever the tile data changes.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::aabb::Aabb;
use super::blocks::{SpecialBlock, SpecialBlockKind};
use super::event::{EventSink, GameEvent};
use super::items::{CrystalKind, PowerUpKind, SecretArea, SecretReward};
use super::objectives::ObjectiveDescriptor;
use crate::consts::*;
use crate::error::LevelError;

/// Tile type codes stored in `tileData`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Empty,
    Solid,
    Crumbling,
    Spring,
    Ice,
    ConveyorLeft,
    ConveyorRight,
    Switch,
    TeleportA,
    TeleportB,
    SecretWall,
}

impl TileKind {
    pub const ALL: [TileKind; 11] = [
        TileKind::Empty,
        TileKind::Solid,
        TileKind::Crumbling,
        TileKind::Spring,
        TileKind::Ice,
        TileKind::ConveyorLeft,
        TileKind::ConveyorRight,
        TileKind::Switch,
        TileKind::TeleportA,
        TileKind::TeleportB,
        TileKind::SecretWall,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TileKind::Empty),
            1 => Some(TileKind::Solid),
            2 => Some(TileKind::Crumbling),
            3 => Some(TileKind::Spring),
            4 => Some(TileKind::Ice),
            5 => Some(TileKind::ConveyorLeft),
            6 => Some(TileKind::ConveyorRight),
            7 => Some(TileKind::Switch),
            8 => Some(TileKind::TeleportA),
            9 => Some(TileKind::TeleportB),
            10 => Some(TileKind::SecretWall),
            _ => None,
        }
    }

    /// Unknown codes behave like plain solid ground
    pub fn from_code_or_solid(code: i32) -> Self {
        Self::from_code(code).unwrap_or(TileKind::Solid)
    }

    pub fn code(self) -> i32 {
        match self {
            TileKind::Empty => 0,
            TileKind::Solid => 1,
            TileKind::Crumbling => 2,
            TileKind::Spring => 3,
            TileKind::Ice => 4,
            TileKind::ConveyorLeft => 5,
            TileKind::ConveyorRight => 6,
            TileKind::Switch => 7,
            TileKind::TeleportA => 8,
            TileKind::TeleportB => 9,
            TileKind::SecretWall => 10,
        }
    }

    /// Blocks movement (player and enemies)
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            TileKind::Solid
                | TileKind::Crumbling
                | TileKind::Ice
                | TileKind::ConveyorLeft
                | TileKind::ConveyorRight
        )
    }
}

/// Crumbling tile lifecycle (gone tiles are removed from the grid)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrumbleState {
    Intact,
    Crumbling { remaining_ms: f32 },
}

/// A collidable tile derived from the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub bounds: Aabb,
    pub kind: TileKind,
    /// Row-major index into `tileData`
    pub grid_index: usize,
    pub crumble: CrumbleState,
}

// ---- JSON document ------------------------------------------------------

/// Spawn descriptors in `entities`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EntityDescriptor {
    Player {
        x: f32,
        y: f32,
    },
    Enemy {
        x: f32,
        y: f32,
        #[serde(rename = "moveRange", default, skip_serializing_if = "Option::is_none")]
        move_range: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        speed: Option<f32>,
    },
    Goal {
        x: f32,
        y: f32,
    },
    Key {
        x: f32,
        y: f32,
    },
    Door {
        x: f32,
        y: f32,
    },
    /// Entity types this version does not know about
    #[serde(other)]
    Unknown,
}

impl EntityDescriptor {
    pub fn position(&self) -> Option<Vec2> {
        match *self {
            EntityDescriptor::Player { x, y }
            | EntityDescriptor::Enemy { x, y, .. }
            | EntityDescriptor::Goal { x, y }
            | EntityDescriptor::Key { x, y }
            | EntityDescriptor::Door { x, y } => Some(Vec2::new(x, y)),
            EntityDescriptor::Unknown => None,
        }
    }

    pub fn set_position(&mut self, pos: Vec2) {
        match self {
            EntityDescriptor::Player { x, y }
            | EntityDescriptor::Enemy { x, y, .. }
            | EntityDescriptor::Goal { x, y }
            | EntityDescriptor::Key { x, y }
            | EntityDescriptor::Door { x, y } => {
                *x = pos.x;
                *y = pos.y;
            }
            EntityDescriptor::Unknown => {}
        }
    }

    /// Footprint used for hit-testing in the editor
    pub fn size(&self) -> Vec2 {
        match self {
            EntityDescriptor::Player { .. } => Vec2::new(PLAYER_WIDTH, PLAYER_HEIGHT),
            EntityDescriptor::Enemy { .. } => Vec2::new(ENEMY_WIDTH, ENEMY_HEIGHT),
            EntityDescriptor::Goal { .. } => Vec2::splat(GOAL_SIZE),
            EntityDescriptor::Key { .. } => Vec2::splat(KEY_SIZE),
            EntityDescriptor::Door { .. } => Vec2::new(DOOR_WIDTH, DOOR_HEIGHT),
            EntityDescriptor::Unknown => Vec2::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDescriptor {
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_platform_width")]
    pub width: f32,
    #[serde(default = "default_platform_height")]
    pub height: f32,
    /// Missing end point means a stationary platform
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_y: Option<f32>,
    #[serde(default = "default_platform_speed")]
    pub speed: f32,
}

fn default_platform_width() -> f32 {
    PLATFORM_WIDTH
}

fn default_platform_height() -> f32 {
    PLATFORM_HEIGHT
}

fn default_platform_speed() -> f32 {
    PLATFORM_SPEED
}

fn default_block_size() -> f32 {
    BLOCK_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallingBlockDescriptor {
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_block_size")]
    pub width: f32,
    #[serde(default = "default_block_size")]
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystalDescriptor {
    pub x: f32,
    pub y: f32,
    #[serde(default = "default_crystal_value")]
    pub value: u64,
    #[serde(rename = "type", default)]
    pub kind: CrystalKind,
}

fn default_crystal_value() -> u64 {
    CRYSTAL_VALUE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUpDescriptor {
    pub x: f32,
    pub y: f32,
    #[serde(rename = "type", default)]
    pub kind: PowerUpKind,
    #[serde(default = "default_power_up_duration")]
    pub duration: f64,
}

fn default_power_up_duration() -> f64 {
    POWER_UP_DURATION_MS
}

/// Side-channel special block (not derived from a tile code)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SpecialBlockDescriptor {
    Spring {
        x: f32,
        y: f32,
        #[serde(rename = "springForce", default = "default_spring_force")]
        spring_force: f32,
    },
    Ice {
        x: f32,
        y: f32,
    },
    Conveyor {
        x: f32,
        y: f32,
        #[serde(default = "default_direction")]
        direction: f32,
        #[serde(default = "default_conveyor_speed")]
        speed: f32,
    },
    Switch {
        x: f32,
        y: f32,
        #[serde(default)]
        id: Option<String>,
        #[serde(rename = "targetIds", default)]
        target_ids: Vec<String>,
    },
    Teleport {
        x: f32,
        y: f32,
        #[serde(default)]
        id: Option<String>,
        #[serde(rename = "targetX")]
        target_x: f32,
        #[serde(rename = "targetY")]
        target_y: f32,
    },
}

fn default_spring_force() -> f32 {
    SPRING_FORCE
}

fn default_direction() -> f32 {
    1.0
}

fn default_conveyor_speed() -> f32 {
    CONVEYOR_SPEED
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchDescriptor {
    pub x: f32,
    pub y: f32,
    pub id: String,
    #[serde(default)]
    pub target_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeleportDescriptor {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub id: Option<String>,
    pub target_x: f32,
    pub target_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretAreaDescriptor {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<SecretReward>,
}

/// Parallax layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundLayer {
    pub color: String,
    #[serde(default)]
    pub scroll_factor: f32,
}

fn default_background_layers() -> Vec<BackgroundLayer> {
    vec![BackgroundLayer {
        color: "#87CEEB".to_string(),
        scroll_factor: 0.0,
    }]
}

/// Level file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelData {
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Tile edge in pixels
    pub tile_size: u32,
    #[serde(default)]
    pub tile_data: Vec<i32>,
    #[serde(default)]
    pub entities: Vec<EntityDescriptor>,
    #[serde(default)]
    pub moving_platforms: Vec<PlatformDescriptor>,
    #[serde(default)]
    pub falling_blocks: Vec<FallingBlockDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub special_blocks: Vec<SpecialBlockDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secret_areas: Vec<SecretAreaDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub switches: Vec<SwitchDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teleports: Vec<TeleportDescriptor>,
    #[serde(default)]
    pub crystals: Vec<CrystalDescriptor>,
    #[serde(default)]
    pub power_ups: Vec<PowerUpDescriptor>,
    #[serde(default = "default_background_layers")]
    pub background_layers: Vec<BackgroundLayer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objectives: Vec<ObjectiveDescriptor>,
    /// Time-trial target in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_trial_target: Option<u64>,
}

impl LevelData {
    /// Blank level of the given size
    pub fn empty(width: u32, height: u32, tile_size: u32) -> Self {
        Self {
            width,
            height,
            tile_size,
            tile_data: vec![0; (width * height) as usize],
            entities: Vec::new(),
            moving_platforms: Vec::new(),
            falling_blocks: Vec::new(),
            special_blocks: Vec::new(),
            secret_areas: Vec::new(),
            switches: Vec::new(),
            teleports: Vec::new(),
            crystals: Vec::new(),
            power_ups: Vec::new(),
            background_layers: default_background_layers(),
            objectives: Vec::new(),
            time_trial_target: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn player_spawn(&self) -> Option<Vec2> {
        self.entities.iter().find_map(|e| match e {
            EntityDescriptor::Player { x, y } => Some(Vec2::new(*x, *y)),
            _ => None,
        })
    }

    /// Bring `tile_data` to exactly `width * height` entries
    pub fn normalize_tiles(&mut self) {
        let expected = (self.width as usize) * (self.height as usize);
        let actual = self.tile_data.len();
        if actual != expected {
            log::warn!(
                "Level tile data has {} entries, expected {} ({}x{}); normalizing",
                actual,
                expected,
                self.width,
                self.height
            );
            self.tile_data.resize(expected, 0);
        }
    }
}

// ---- runtime level ------------------------------------------------------

/// A built level: normalized data plus derived tiles and special blocks
#[derive(Debug, Clone)]
pub struct Level {
    pub data: LevelData,
    pub tiles: Vec<Tile>,
    pub special_blocks: Vec<SpecialBlock>,
    pub secret_areas: Vec<SecretArea>,
}

impl Default for Level {
    /// Empty placeholder used before the first level is loaded
    fn default() -> Self {
        Self {
            data: LevelData::empty(0, 0, BLOCK_SIZE as u32),
            tiles: Vec::new(),
            special_blocks: Vec::new(),
            secret_areas: Vec::new(),
        }
    }
}

impl Level {
    /// Validate, normalize and build
    pub fn from_data(mut data: LevelData) -> Result<Self, LevelError> {
        if data.width == 0 || data.height == 0 || data.tile_size == 0 {
            return Err(LevelError::InvalidDimensions {
                width: data.width,
                height: data.height,
                tile_size: data.tile_size,
            });
        }
        if data.player_spawn().is_none() {
            return Err(LevelError::MissingPlayerSpawn);
        }
        data.normalize_tiles();

        let mut level = Self {
            data,
            tiles: Vec::new(),
            special_blocks: Vec::new(),
            secret_areas: Vec::new(),
        };
        level.build_level();
        Ok(level)
    }

    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        Self::from_data(LevelData::from_json(json)?)
    }

    pub fn width(&self) -> u32 {
        self.data.width
    }

    pub fn height(&self) -> u32 {
        self.data.height
    }

    pub fn tile_size(&self) -> f32 {
        self.data.tile_size as f32
    }

    pub fn pixel_width(&self) -> f32 {
        self.data.width as f32 * self.tile_size()
    }

    pub fn pixel_height(&self) -> f32 {
        self.data.height as f32 * self.tile_size()
    }

    /// Entities that fall past this line are out of the level
    pub fn fall_out_y(&self) -> f32 {
        self.pixel_height() + FALL_OUT_MARGIN
    }

    /// Tile code at a grid cell; out of range reads as empty
    pub fn tile_code_at(&self, col: i32, row: i32) -> i32 {
        if col < 0 || row < 0 || col >= self.data.width as i32 || row >= self.data.height as i32 {
            return 0;
        }
        let index = row as usize * self.data.width as usize + col as usize;
        self.data.tile_data.get(index).copied().unwrap_or(0)
    }

    pub fn tile_at(&self, col: i32, row: i32) -> TileKind {
        TileKind::from_code_or_solid(self.tile_code_at(col, row))
    }

    /// Grid cell blocks movement
    pub fn is_solid_at(&self, col: i32, row: i32) -> bool {
        self.tile_at(col, row).is_solid()
    }

    /// Grid cell containing a pixel position
    pub fn cell_at(&self, pos: Vec2) -> (i32, i32) {
        let size = self.tile_size();
        ((pos.x / size).floor() as i32, (pos.y / size).floor() as i32)
    }

    /// Replace one grid cell; call [`Level::build_level`] afterwards
    pub fn set_tile(&mut self, col: u32, row: u32, kind: TileKind) {
        if col < self.data.width && row < self.data.height {
            let index = (row * self.data.width + col) as usize;
            self.data.tile_data[index] = kind.code();
        }
    }

    /// Rebuild tiles, grid special blocks and secret areas
    pub fn build_level(&mut self) {
        self.tiles.clear();
        self.special_blocks.clear();
        self.secret_areas.clear();

        let width = self.data.width as usize;
        let size = self.tile_size();
        let mut unknown_codes = 0usize;
        let mut teleports_a = Vec::new();
        let mut teleports_b = Vec::new();
        let mut switch_count = 0usize;

        for (index, &code) in self.data.tile_data.iter().enumerate() {
            if code == 0 {
                continue;
            }
            let kind = match TileKind::from_code(code) {
                Some(kind) => kind,
                None => {
                    unknown_codes += 1;
                    TileKind::Solid
                }
            };
            let col = index % width;
            let row = index / width;
            let pos = Vec2::new(col as f32 * size, row as f32 * size);

            if kind.is_solid() {
                self.tiles.push(Tile {
                    bounds: Aabb::from_pos_size(pos, Vec2::splat(size)),
                    kind,
                    grid_index: index,
                    crumble: CrumbleState::Intact,
                });
            }

            match kind {
                TileKind::Spring => {
                    self.special_blocks.push(SpecialBlock::spring(pos, SPRING_FORCE))
                }
                TileKind::Ice => self.special_blocks.push(SpecialBlock::ice(pos)),
                TileKind::ConveyorLeft => {
                    self.special_blocks
                        .push(SpecialBlock::conveyor(pos, -1.0, CONVEYOR_SPEED))
                }
                TileKind::ConveyorRight => {
                    self.special_blocks
                        .push(SpecialBlock::conveyor(pos, 1.0, CONVEYOR_SPEED))
                }
                TileKind::Switch => {
                    switch_count += 1;
                    self.special_blocks.push(SpecialBlock::switch(
                        pos,
                        format!("switch_{}", switch_count),
                        Vec::new(),
                    ));
                }
                TileKind::TeleportA => teleports_a.push(pos),
                TileKind::TeleportB => teleports_b.push(pos),
                TileKind::Empty
                | TileKind::Solid
                | TileKind::Crumbling
                | TileKind::SecretWall => {}
            }
        }

        if unknown_codes > 0 {
            log::warn!("{} tiles with unknown codes treated as solid", unknown_codes);
        }

        self.pair_teleports(&teleports_a, &teleports_b);
        self.build_secret_walls();
        self.apply_side_channels();

        log::info!(
            "Level built: {} solid tiles, {} special blocks, {} secret areas",
            self.tiles.len(),
            self.special_blocks.len(),
            self.secret_areas.len()
        );
    }

    /// Pair A/B teleport tiles by order; leftovers produce nothing.
    /// Arrival puts the player's feet on top of the partner tile.
    fn pair_teleports(&mut self, a: &[Vec2], b: &[Vec2]) {
        let lift = Vec2::new(0.0, PLAYER_HEIGHT);
        for (n, (&from, &to)) in a.iter().zip(b.iter()).enumerate() {
            let first = self.special_blocks.len();
            let mut out = SpecialBlock::teleport(
                from,
                format!("teleport_{}a", n + 1),
                to - lift,
            );
            let mut back = SpecialBlock::teleport(
                to,
                format!("teleport_{}b", n + 1),
                from - lift,
            );
            if let SpecialBlockKind::Teleport { partner, .. } = &mut out.kind {
                *partner = Some(first + 1);
            }
            if let SpecialBlockKind::Teleport { partner, .. } = &mut back.kind {
                *partner = Some(first);
            }
            self.special_blocks.push(out);
            self.special_blocks.push(back);
        }
        if a.len() != b.len() {
            log::debug!(
                "{} teleport tiles without a partner ignored",
                a.len().abs_diff(b.len())
            );
        }
    }

    /// One secret area per 4-connected group of secret-wall tiles
    fn build_secret_walls(&mut self) {
        let width = self.data.width as usize;
        let height = self.data.height as usize;
        let size = self.tile_size();
        let code = TileKind::SecretWall.code();
        let mut visited = vec![false; self.data.tile_data.len()];
        let mut queue = VecDeque::new();

        for start in 0..self.data.tile_data.len() {
            if visited[start] || self.data.tile_data[start] != code {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);
            let (mut min_col, mut min_row) = (usize::MAX, usize::MAX);
            let (mut max_col, mut max_row) = (0usize, 0usize);

            while let Some(index) = queue.pop_front() {
                let (col, row) = (index % width, index / width);
                min_col = min_col.min(col);
                min_row = min_row.min(row);
                max_col = max_col.max(col);
                max_row = max_row.max(row);

                let mut neighbours = Vec::with_capacity(4);
                if col > 0 {
                    neighbours.push(index - 1);
                }
                if col + 1 < width {
                    neighbours.push(index + 1);
                }
                if row > 0 {
                    neighbours.push(index - width);
                }
                if row + 1 < height {
                    neighbours.push(index + width);
                }
                for next in neighbours {
                    if !visited[next] && self.data.tile_data[next] == code {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }

            let bounds = Aabb::new(
                min_col as f32 * size,
                min_row as f32 * size,
                (max_col - min_col + 1) as f32 * size,
                (max_row - min_row + 1) as f32 * size,
            );
            let id = format!("secret_{}", self.secret_areas.len());
            self.secret_areas.push(SecretArea::new(
                id,
                bounds,
                Some(SecretReward::Score {
                    value: SECRET_REWARD,
                }),
            ));
        }
    }

    fn apply_side_channels(&mut self) {
        for (n, descriptor) in self.data.special_blocks.iter().enumerate() {
            let block = match descriptor {
                SpecialBlockDescriptor::Spring { x, y, spring_force } => {
                    SpecialBlock::spring(Vec2::new(*x, *y), *spring_force)
                }
                SpecialBlockDescriptor::Ice { x, y } => SpecialBlock::ice(Vec2::new(*x, *y)),
                SpecialBlockDescriptor::Conveyor {
                    x,
                    y,
                    direction,
                    speed,
                } => SpecialBlock::conveyor(Vec2::new(*x, *y), *direction, *speed),
                SpecialBlockDescriptor::Switch {
                    x,
                    y,
                    id,
                    target_ids,
                } => SpecialBlock::switch(
                    Vec2::new(*x, *y),
                    id.clone().unwrap_or_else(|| format!("switch_custom_{}", n)),
                    target_ids.clone(),
                ),
                SpecialBlockDescriptor::Teleport {
                    x,
                    y,
                    id,
                    target_x,
                    target_y,
                } => SpecialBlock::teleport(
                    Vec2::new(*x, *y),
                    id.clone().unwrap_or_else(|| format!("teleport_custom_{}", n)),
                    Vec2::new(*target_x, *target_y),
                ),
            };
            self.special_blocks.push(block);
        }

        for (n, descriptor) in self.data.teleports.iter().enumerate() {
            self.special_blocks.push(SpecialBlock::teleport(
                Vec2::new(descriptor.x, descriptor.y),
                descriptor
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("teleport_extra_{}", n)),
                Vec2::new(descriptor.target_x, descriptor.target_y),
            ));
        }

        for descriptor in &self.data.switches {
            let at = Vec2::new(descriptor.x, descriptor.y);
            let target = self.special_blocks.iter_mut().find(|b| {
                matches!(b.kind, SpecialBlockKind::Switch { .. }) && b.bounds.pos() == at
            });
            match target {
                Some(block) => {
                    if let SpecialBlockKind::Switch { id, target_ids, .. } = &mut block.kind {
                        *id = descriptor.id.clone();
                        *target_ids = descriptor.target_ids.clone();
                    }
                }
                None => log::warn!("Switch config at {:?} matches no switch tile", at),
            }
        }

        for (n, descriptor) in self.data.secret_areas.iter().enumerate() {
            self.secret_areas.push(SecretArea::new(
                descriptor
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("secret_area_{}", n)),
                Aabb::new(descriptor.x, descriptor.y, descriptor.width, descriptor.height),
                Some(descriptor.reward.unwrap_or(SecretReward::Score {
                    value: SECRET_REWARD,
                })),
            ));
        }
    }

    /// Start the countdown on an intact crumbling tile; returns true if it started
    pub fn trigger_crumble(&mut self, grid_index: usize) -> bool {
        let tile = self.tiles.iter_mut().find(|t| {
            t.grid_index == grid_index
                && t.kind == TileKind::Crumbling
                && t.crumble == CrumbleState::Intact
        });
        match tile {
            Some(tile) => {
                tile.crumble = CrumbleState::Crumbling {
                    remaining_ms: CRUMBLE_MS,
                };
                true
            }
            None => false,
        }
    }

    /// Count down crumbling tiles and remove the finished ones
    pub fn update(&mut self, dt_ms: f32, events: &mut impl EventSink) {
        let mut gone = Vec::new();
        for tile in &mut self.tiles {
            if let CrumbleState::Crumbling { remaining_ms } = &mut tile.crumble {
                *remaining_ms -= dt_ms;
                if *remaining_ms <= 0.0 {
                    gone.push(tile.grid_index);
                }
            }
        }
        if gone.is_empty() {
            return;
        }

        self.tiles.retain(|t| !gone.contains(&t.grid_index));
        for index in gone {
            // Clear the grid too so a rebuild cannot resurrect the tile
            if let Some(code) = self.data.tile_data.get_mut(index) {
                *code = 0;
            }
            events.emit(GameEvent::TileCrumbled { tile: index });
        }
    }

    pub fn update_special_blocks(&mut self, dt_ms: f32) {
        for block in &mut self.special_blocks {
            block.update(dt_ms);
        }
    }

    pub fn update_secret_areas(&mut self, dt_ms: f32) {
        for area in &mut self.secret_areas {
            area.update(dt_ms);
        }
    }

    /// Grid has moving platforms or springs (air-time objective applies)
    pub fn has_jump_challenge(&self) -> bool {
        !self.data.moving_platforms.is_empty()
            || self
                .special_blocks
                .iter()
                .any(|b| matches!(b.kind, SpecialBlockKind::Spring { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn data(width: u32, height: u32, tiles: Vec<i32>) -> LevelData {
        let mut data = LevelData::empty(width, height, 32);
        data.tile_data = tiles;
        data.entities.push(EntityDescriptor::Player { x: 0.0, y: 0.0 });
        data
    }

    #[test]
    fn test_parse_minimal_json_defaults() {
        let json = r#"{
            "width": 2, "height": 1, "tileSize": 32, "tileData": [1, 0],
            "entities": [{"type": "player", "x": 0, "y": 0}, {"type": "spike", "x": 5, "y": 5}]
        }"#;
        let level = Level::from_json(json).unwrap();
        assert_eq!(level.tiles.len(), 1);
        assert_eq!(level.data.background_layers.len(), 1);
        assert_eq!(level.data.background_layers[0].color, "#87CEEB");
        assert_eq!(level.data.entities[1], EntityDescriptor::Unknown);
        assert!(level.data.crystals.is_empty());
    }

    #[test]
    fn test_missing_player_is_error() {
        let json = r#"{"width": 1, "height": 1, "tileSize": 32, "tileData": [0]}"#;
        assert!(matches!(
            Level::from_json(json),
            Err(LevelError::MissingPlayerSpawn)
        ));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut d = data(0, 5, vec![]);
        d.tile_size = 32;
        assert!(matches!(
            Level::from_data(d),
            Err(LevelError::InvalidDimensions { width: 0, .. })
        ));
    }

    #[test]
    fn test_short_tile_data_is_padded() {
        let level = Level::from_data(data(3, 2, vec![1, 1])).unwrap();
        assert_eq!(level.data.tile_data, vec![1, 1, 0, 0, 0, 0]);
        assert_eq!(level.tiles.len(), 2);
    }

    #[test]
    fn test_unknown_code_is_solid() {
        let level = Level::from_data(data(2, 1, vec![42, 0])).unwrap();
        assert_eq!(level.tiles.len(), 1);
        assert_eq!(level.tiles[0].kind, TileKind::Solid);
        assert!(level.is_solid_at(0, 0));
    }

    #[test]
    fn test_build_level_is_idempotent() {
        let mut level =
            Level::from_data(data(4, 2, vec![1, 3, 4, 7, 8, 9, 10, 2])).unwrap();
        let tiles = level.tiles.clone();
        let blocks = level.special_blocks.clone();
        let secrets = level.secret_areas.len();
        level.build_level();
        assert_eq!(level.tiles, tiles);
        assert_eq!(level.special_blocks, blocks);
        assert_eq!(level.secret_areas.len(), secrets);
    }

    #[test]
    fn test_trigger_tiles_are_not_collidable() {
        let level = Level::from_data(data(4, 1, vec![3, 7, 10, 4])).unwrap();
        let kinds: Vec<_> = level.tiles.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TileKind::Ice]);
        // Spring, switch and ice blocks
        assert_eq!(level.special_blocks.len(), 3);
    }

    #[test]
    fn test_teleport_pairing() {
        let level = Level::from_data(data(4, 3, vec![0, 8, 0, 0, 0, 0, 0, 0, 0, 0, 9, 8]))
            .unwrap();
        let teleports: Vec<_> = level
            .special_blocks
            .iter()
            .filter_map(|b| match &b.kind {
                SpecialBlockKind::Teleport {
                    target, partner, ..
                } => Some((b.bounds.pos(), *target, *partner)),
                _ => None,
            })
            .collect();
        // The second A tile has no partner
        assert_eq!(teleports.len(), 2);
        assert_eq!(teleports[0].0, Vec2::new(32.0, 0.0));
        assert_eq!(teleports[0].1, Vec2::new(64.0, 64.0 - PLAYER_HEIGHT));
        assert_eq!(teleports[0].2, Some(1));
        assert_eq!(teleports[1].1, Vec2::new(32.0, -PLAYER_HEIGHT));
        assert_eq!(teleports[1].2, Some(0));
    }

    #[test]
    fn test_secret_walls_flood_fill() {
        // Two separate groups: an L shape and a single tile
        let level = Level::from_data(data(
            4,
            3,
            vec![10, 0, 0, 10, 10, 0, 0, 0, 10, 10, 0, 0],
        ))
        .unwrap();
        assert_eq!(level.secret_areas.len(), 2);
        assert_eq!(level.secret_areas[0].id, "secret_0");
        assert_eq!(level.secret_areas[0].bounds, Aabb::new(0.0, 0.0, 64.0, 96.0));
        assert_eq!(level.secret_areas[1].bounds, Aabb::new(96.0, 0.0, 32.0, 32.0));
    }

    #[test]
    fn test_switch_side_channel_patches_grid_switch() {
        let mut d = data(2, 1, vec![7, 0]);
        d.switches.push(SwitchDescriptor {
            x: 0.0,
            y: 0.0,
            id: "gate".into(),
            target_ids: vec!["door_1".into()],
        });
        let level = Level::from_data(d).unwrap();
        match &level.special_blocks[0].kind {
            SpecialBlockKind::Switch { id, target_ids, .. } => {
                assert_eq!(id, "gate");
                assert_eq!(target_ids, &vec!["door_1".to_string()]);
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_crumble_lifecycle_is_one_way() {
        let mut level = Level::from_data(data(2, 1, vec![2, 1])).unwrap();
        let mut events = Vec::new();
        assert!(level.trigger_crumble(0));
        assert!(!level.trigger_crumble(0));

        level.update(499.0, &mut events);
        assert_eq!(level.tiles.len(), 2);
        level.update(1.0, &mut events);
        assert_eq!(level.tiles.len(), 1);
        assert_eq!(events, vec![GameEvent::TileCrumbled { tile: 0 }]);

        // A rebuild does not bring it back
        level.build_level();
        assert_eq!(level.tiles.len(), 1);
        assert!(!level.trigger_crumble(0));
    }

    proptest! {
        #[test]
        fn prop_tile_data_normalized(width in 1u32..20, height in 1u32..20, len in 0usize..500) {
            let level = Level::from_data(data(width, height, vec![1; len])).unwrap();
            prop_assert_eq!(level.data.tile_data.len(), (width * height) as usize);
            prop_assert!(level.tiles.len() <= (width * height) as usize);
        }
    }
}
