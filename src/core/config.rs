//! Game configuration with documented constants
//!
//! Every tunable number lives here. Values load from an optional TOML file;
//! anything the file leaves out keeps its default.

use serde::Deserialize;
use std::path::Path;

use crate::core::error::{GameError, Result};
use crate::core::types::Seconds;

/// Top-level configuration for one game session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub display: DisplayConfig,
    pub tiles: TileGeometry,
    pub map: MapConfig,
    pub terrain: TerrainParams,
    pub units: UnitParams,
    pub assets: AssetPaths,
    /// `tracing` filter directive installed by the binary
    pub log_filter: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            tiles: TileGeometry::default(),
            map: MapConfig::default(),
            terrain: TerrainParams::default(),
            units: UnitParams::default(),
            assets: AssetPaths::default(),
            log_filter: "ascension=info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Frames per second the frame clock measures against
    ///
    /// Frames slower than `1 / target_frame_rate` log a warning, frames
    /// five times slower log an error.
    pub target_frame_rate: u32,
    pub window_width: u32,
    pub window_height: u32,
    /// Pixels per world unit
    pub scale: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_frame_rate: 60,
            window_width: 1000,
            window_height: 600,
            scale: 2.0,
        }
    }
}

/// Pixel geometry of a single hex tile
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TileGeometry {
    /// Full bounding-box width of a tile
    pub tile_width: f32,
    /// Full bounding-box height of a tile
    pub tile_height: f32,
    /// Horizontal inset of the pointed left/right ends
    ///
    /// Neighbouring columns overlap by exactly this width.
    pub point_width: f32,
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self {
            tile_width: 48.0,
            tile_height: 30.0,
            point_width: 16.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Columns; wraps horizontally so it must be even
    pub width: i32,
    pub height: i32,
    pub seed: u64,
    /// Start with every tile explored
    pub reveal_map: bool,
    /// Number of sea animation phases sharing a master sprite
    pub sea_phases: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 14,
            height: 14,
            seed: 111,
            reveal_map: false,
            sea_phases: 3,
        }
    }
}

/// Procedural terrain parameters
///
/// Fractions are of the total tile count. Each stage draws from the tiles
/// earlier stages left over, so the fractions must sum to at most 1.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    pub sea_fraction: f64,
    pub mountain_fraction: f64,
    pub forest_fraction: f64,
    /// Lattice points per map width for the sea noise field
    pub sea_frequency: usize,
    pub mountain_frequency: usize,
    pub forest_frequency: usize,
    /// Villages placed in addition to the one at the origin
    pub village_count: u32,
    /// Minimum hex distance between any two villages
    pub village_min_distance: u32,
    /// Random draws allowed per village before generation gives up
    pub placement_attempts: u32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            sea_fraction: 0.3,
            mountain_fraction: 0.15,
            forest_fraction: 0.2,
            sea_frequency: 3,
            mountain_frequency: 5,
            forest_frequency: 4,
            village_count: 2,
            village_min_distance: 3,
            placement_attempts: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UnitParams {
    /// Walking speed in pixels per second along a diagonal-free baseline
    pub base_speed: f32,
    /// Upper bound of the random per-unit delay before a group move
    pub stagger_delay: Seconds,
    /// Horizontal spacing between units standing on one tile
    pub unit_spacing: f32,
    /// Duration of the shroud fade when a tile is explored
    pub reveal_duration: Seconds,
    /// Asset families of the units in the starting group
    pub starting_units: Vec<String>,
}

impl Default for UnitParams {
    fn default() -> Self {
        Self {
            base_speed: 40.0,
            stagger_delay: 0.3,
            unit_spacing: 12.0,
            reveal_duration: 0.6,
            starting_units: vec!["knight".to_string(), "knight".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub atlas_meta: String,
    pub feature_meta: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            atlas_meta: "data/atlas_meta.json".to_string(),
            feature_meta: "data/feature_meta.json".to_string(),
        }
    }
}

impl GameConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate().map_err(GameError::InvalidConfig)?;
        Ok(config)
    }

    /// Load from a TOML file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        let tiles = &self.tiles;
        if tiles.tile_width <= 0.0 || tiles.tile_height <= 0.0 {
            return Err("Tile dimensions must be positive".into());
        }
        if tiles.point_width < 0.0 || tiles.point_width >= tiles.tile_width {
            return Err(format!(
                "point_width ({}) must be in [0, tile_width ({}))",
                tiles.point_width, tiles.tile_width
            ));
        }

        // Wrapping one period shifts y by width / 2
        if self.map.width <= 0 || self.map.width % 2 != 0 {
            return Err(format!("map width ({}) must be positive and even", self.map.width));
        }
        if self.map.height <= 0 {
            return Err(format!("map height ({}) must be positive", self.map.height));
        }

        let t = &self.terrain;
        for (name, value) in [
            ("sea_fraction", t.sea_fraction),
            ("mountain_fraction", t.mountain_fraction),
            ("forest_fraction", t.forest_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{} ({}) must be within [0, 1]", name, value));
            }
        }
        if t.sea_fraction + t.mountain_fraction + t.forest_fraction > 1.0 {
            return Err("Terrain fractions must sum to at most 1".into());
        }
        if t.sea_frequency == 0 || t.mountain_frequency == 0 || t.forest_frequency == 0 {
            return Err("Noise frequencies must be at least 1".into());
        }

        if self.units.base_speed <= 0.0 {
            return Err("Unit base_speed must be positive".into());
        }
        if self.units.stagger_delay < 0.0 || self.units.reveal_duration < 0.0 {
            return Err("Durations must not be negative".into());
        }
        if self.display.target_frame_rate == 0 {
            return Err("target_frame_rate must be positive".into());
        }

        Ok(())
    }
}
