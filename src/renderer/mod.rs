//! Rendering core: hex projection, sprites and frame timing.
//!
//! Nothing here talks to a graphics API. Sprites are reduced to
//! [`SpriteQuad`]s and handed to whatever implements [`Renderer`].

pub mod hex;
pub mod metrics;
pub mod sprites;

pub use hex::HexLayout;
pub use metrics::{FrameClock, FramePace};
pub use sprites::{Renderer, SpriteManager, SpriteQuad, Viewport};
