//! Level-load errors
//!
//! Gameplay outcomes (falling out, enemy contact) are never errors; only
//! building a level from bad data can fail.

use core::fmt;

#[derive(Debug)]
pub enum LevelError {
    /// Level JSON could not be parsed
    Parse(serde_json::Error),
    /// No `player` entity in the level's entity list
    MissingPlayerSpawn,
    /// Zero-sized grid or tile
    InvalidDimensions {
        width: u32,
        height: u32,
        tile_size: u32,
    },
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "malformed level data: {e}"),
            Self::MissingPlayerSpawn => write!(f, "player not found in level data"),
            Self::InvalidDimensions {
                width,
                height,
                tile_size,
            } => write!(
                f,
                "invalid level dimensions: {width}x{height} tiles of {tile_size}px"
            ),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LevelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}
