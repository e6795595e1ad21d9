//! Ascension - hex-tile strategy game core
//!
//! Sprite transitions and the sprite arena live in [`renderer`], the wrapping
//! hex map with pathfinding and fog of war in [`campaign`], procedural terrain
//! in [`worldgen`], unit groups in [`units`], and [`session`] ties them
//! together for one run.

pub mod campaign;
pub mod core;
pub mod renderer;
pub mod session;
pub mod units;
pub mod worldgen;
