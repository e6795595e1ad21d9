//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Stable handle into the sprite arena.
///
/// The generation guards against a stale handle addressing a sprite that
/// later reused the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteHandle {
    pub index: u32,
    pub generation: u32,
}

impl SpriteHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Identifier of a transition engine, unique for the lifetime of a sprite manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineId(pub u64);

/// Identifier for unit groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u32);

impl GroupId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Draw layers. Larger groups are drawn behind smaller ones.
pub mod z_group {
    pub const TILE: i32 = 30;
    pub const FEATURE: i32 = 20;
    pub const UNIT: i32 = 10;
    pub const OVERLAY: i32 = 0;
}

/// Seconds of game time
pub type Seconds = f32;

/// Opacity as an 8-bit channel value
pub type Opacity = u8;

pub const OPAQUE: Opacity = 255;
pub const TRANSPARENT: Opacity = 0;
