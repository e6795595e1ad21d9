//! Sprites: atlas metadata, animations, transition engines and the arena
//! that ticks and draws them.

pub mod animation;
pub mod atlas;
pub mod instance;
pub mod manager;
pub mod sprite;
pub mod transition;

pub use animation::{Animation, AnimationPlayer, AnimationStage};
pub use atlas::{AssetProvider, SpriteAtlas, SpriteComponent, SpriteRegion, CENTER_ANCHOR};
pub use instance::{Renderer, SpriteQuad, Viewport};
pub use manager::{DrawStats, SpriteManager};
pub use sprite::{DrawKey, ScreenTransform, Sprite, Visual};
pub use transition::{
    Callback, CallbackRegistry, Completion, FadeEngine, Hook, MoveEngine, MoveWithAnimationEngine,
    StaticDelay, Transition, TransitionEngine,
};
