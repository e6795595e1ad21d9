use thiserror::Error;

use crate::core::types::{GroupId, SpriteHandle};

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Sprite not found: {0:?}")]
    SpriteNotFound(SpriteHandle),

    #[error("Sprite {sprite:?} is already playing animation '{current}'")]
    AnimationInProgress { sprite: SpriteHandle, current: String },

    #[error("Sprite {0:?} has no animation to stop")]
    AnimationNotFound(SpriteHandle),

    #[error("Sprite {follower:?} cannot follow {master:?}: the masters would form a cycle")]
    FollowerCycle {
        master: SpriteHandle,
        follower: SpriteHandle,
    },

    #[error("Unit group {0:?} is already in transit")]
    UnitGroupInTransit(GroupId),

    #[error("Unit group not found: {0:?}")]
    UnitGroupNotFound(GroupId),

    #[error("Tile ({x}, {y}) is not adjacent to ({from_x}, {from_y})")]
    NotAdjacent {
        from_x: i32,
        from_y: i32,
        x: i32,
        y: i32,
    },

    #[error("No tile at ({x}, {y})")]
    NoSuchTile { x: i32, y: i32 },

    #[error("Tile ({x}, {y}) already exists")]
    DuplicateTile { x: i32, y: i32 },

    #[error("Component not found: {0}")]
    MissingComponent(String),

    #[error("Animation not found: {0}")]
    MissingAnimation(String),

    #[error("Component anchor '{anchor}' not found for component '{component}'")]
    MissingAnchor { component: String, anchor: String },

    #[error("No feature pairing for placeholder '{placeholder}' on {terrain} terrain")]
    MissingFeaturePairing { terrain: String, placeholder: String },

    #[error("Invalid asset data: {0}")]
    InvalidAsset(String),

    #[error("Animation '{0}' has no duration and cannot loop")]
    ZeroLengthLoop(String),

    #[error("Generation stage '{stage}' exhausted after {attempts} attempts")]
    GenerationExhausted { stage: &'static str, attempts: u32 },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl GameError {
    /// Illegal actions are fatal to the triggering call only; the session logs
    /// and drops them instead of aborting.
    pub fn is_illegal_action(&self) -> bool {
        matches!(
            self,
            Self::AnimationInProgress { .. }
                | Self::AnimationNotFound(_)
                | Self::UnitGroupInTransit(_)
                | Self::NotAdjacent { .. }
                | Self::NoSuchTile { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GameError>;
