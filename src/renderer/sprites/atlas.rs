//! Texture atlas metadata: named components, anchors and animations.
//!
//! Pixel data stays with the renderer. The core only needs each component's
//! rectangle and anchor points, and each animation's ordered stages.

use ahash::AHashMap;
use glam::Vec2;
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;

use crate::core::error::{GameError, Result};
use crate::renderer::sprites::animation::{Animation, AnimationStage};

/// Anchor every component has, defaulting to the true centre
pub const CENTER_ANCHOR: &str = "center";

/// A region within a texture atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct SpriteRegion {
    /// X position in pixels.
    pub x: u32,
    /// Y position in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl SpriteRegion {
    /// Create a new sprite region.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get UV coordinates (offset and size) for this region.
    pub fn uv(&self, atlas_width: u32, atlas_height: u32) -> ([f32; 2], [f32; 2]) {
        let u0 = self.x as f32 / atlas_width as f32;
        let v0 = self.y as f32 / atlas_height as f32;
        let u_size = self.width as f32 / atlas_width as f32;
        let v_size = self.height as f32 / atlas_height as f32;
        ([u0, v0], [u_size, v_size])
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

/// One drawable image in the atlas, with named anchor points measured from
/// its top-left corner.
#[derive(Clone, Debug)]
pub struct SpriteComponent {
    pub name: String,
    pub rect: SpriteRegion,
    anchors: AHashMap<String, Vec2>,
}

impl SpriteComponent {
    pub fn new(name: impl Into<String>, rect: SpriteRegion) -> Self {
        Self {
            name: name.into(),
            rect,
            anchors: AHashMap::new(),
        }
    }

    pub fn with_anchor(mut self, name: impl Into<String>, x: f32, y: f32) -> Self {
        self.anchors.insert(name.into(), Vec2::new(x, y));
        self
    }

    pub fn true_center(&self) -> Vec2 {
        self.rect.size() / 2.0
    }

    /// Look up an anchor; `center` falls back to the true centre
    pub fn get_anchor(&self, anchor: &str) -> Result<Vec2> {
        match self.anchors.get(anchor) {
            Some(point) => Ok(*point),
            None if anchor == CENTER_ANCHOR => Ok(self.true_center()),
            None => Err(GameError::MissingAnchor {
                component: self.name.clone(),
                anchor: anchor.to_string(),
            }),
        }
    }
}

/// Source of component and animation metadata
pub trait AssetProvider {
    fn component(&self, name: &str) -> Result<Rc<SpriteComponent>>;
    fn animation(&self, name: &str) -> Result<Rc<Animation>>;
}

#[derive(Debug, Deserialize)]
struct AtlasFile {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    components: Vec<ComponentMeta>,
    #[serde(default)]
    animations: Vec<AnimationMeta>,
}

#[derive(Debug, Deserialize)]
struct ComponentMeta {
    name: String,
    #[serde(flatten)]
    rect: SpriteRegion,
    #[serde(default)]
    anchors: AHashMap<String, [f32; 2]>,
}

#[derive(Debug, Deserialize)]
struct AnimationMeta {
    name: String,
    #[serde(default)]
    anchor: Option<String>,
    stages: Vec<StageMeta>,
}

#[derive(Debug, Deserialize)]
struct StageMeta {
    component: String,
    duration: f32,
    #[serde(default)]
    anchor: Option<String>,
}

/// Atlas metadata with animations resolved against their components
#[derive(Debug, Default)]
pub struct SpriteAtlas {
    /// Atlas width in pixels.
    pub width: u32,
    /// Atlas height in pixels.
    pub height: u32,
    components: AHashMap<String, Rc<SpriteComponent>>,
    animations: AHashMap<String, Rc<Animation>>,
}

impl SpriteAtlas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Load atlas metadata from a JSON string
    pub fn load_from_json(json: &str) -> Result<Self> {
        let file: AtlasFile = serde_json::from_str(json)?;
        let mut atlas = Self::new(file.width, file.height);

        for meta in file.components {
            let mut component = SpriteComponent::new(meta.name, meta.rect);
            for (anchor, [x, y]) in meta.anchors {
                component = component.with_anchor(anchor, x, y);
            }
            atlas.add_component(component);
        }

        for meta in file.animations {
            let default_anchor = meta.anchor.unwrap_or_else(|| CENTER_ANCHOR.to_string());
            let stages = meta
                .stages
                .into_iter()
                .map(|stage| {
                    (
                        stage.component,
                        stage.duration,
                        stage.anchor.unwrap_or_else(|| default_anchor.clone()),
                    )
                })
                .collect::<Vec<_>>();
            atlas.add_animation(&meta.name, &stages)?;
        }

        tracing::debug!(
            "Loaded atlas with {} components and {} animations",
            atlas.components.len(),
            atlas.animations.len()
        );
        Ok(atlas)
    }

    /// Load atlas metadata from a JSON file on disk
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_json(&content)
    }

    pub fn add_component(&mut self, component: SpriteComponent) {
        self.components
            .insert(component.name.clone(), Rc::new(component));
    }

    /// Add an animation from `(component, duration, anchor)` stages
    ///
    /// Components and anchors are resolved now so that playback never fails
    /// a lookup.
    pub fn add_animation(&mut self, name: &str, stages: &[(String, f32, String)]) -> Result<()> {
        let mut resolved = Vec::with_capacity(stages.len());
        for (component_name, duration, anchor) in stages {
            if *duration < 0.0 || !duration.is_finite() {
                return Err(GameError::InvalidAsset(format!(
                    "animation '{}' stage '{}' has duration {}",
                    name, component_name, duration
                )));
            }
            let component = self.component(component_name)?;
            component.get_anchor(anchor)?;
            resolved.push(AnimationStage {
                component,
                duration: *duration,
                anchor: anchor.clone(),
            });
        }
        self.animations
            .insert(name.to_string(), Rc::new(Animation::new(name, resolved)));
        Ok(())
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }
}

impl AssetProvider for SpriteAtlas {
    fn component(&self, name: &str) -> Result<Rc<SpriteComponent>> {
        self.components
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::MissingComponent(name.to_string()))
    }

    fn animation(&self, name: &str) -> Result<Rc<Animation>> {
        self.animations
            .get(name)
            .cloned()
            .ok_or_else(|| GameError::MissingAnimation(name.to_string()))
    }
}
