//! Procedural world generation: noise, terrain classification and feature
//! templates.

pub mod features;
pub mod perlin;
pub mod terrain;

pub use features::{FeatureMap, FeatureMeta, FeaturePlacement, PlacedFeature};
pub use perlin::TileablePerlin;
pub use terrain::{TerrainGenerator, TerrainSummary};
