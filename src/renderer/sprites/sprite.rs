//! Drawable entity stored in the sprite arena.

use glam::Vec2;
use ordered_float::OrderedFloat;
use std::rc::Rc;

use crate::core::error::Result;
use crate::core::types::{Opacity, Seconds, SpriteHandle, OPAQUE};
use crate::renderer::sprites::atlas::{SpriteComponent, CENTER_ANCHOR};
use crate::renderer::sprites::transition::Transition;

/// The broadcastable part of a sprite's appearance.
///
/// This is what a master copies onto its followers.
#[derive(Clone, Debug)]
pub struct Visual {
    pub component: Option<Rc<SpriteComponent>>,
    /// Offset added to the position when drawing
    pub displacement: Vec2,
    /// How long the component is meant to be shown, if it is an animation stage
    pub duration: Option<Seconds>,
    pub anchor: String,
    /// The anchor resolved against the component
    anchor_point: Vec2,
}

impl Default for Visual {
    fn default() -> Self {
        Self {
            component: None,
            displacement: Vec2::ZERO,
            duration: None,
            anchor: CENTER_ANCHOR.to_string(),
            anchor_point: Vec2::ZERO,
        }
    }
}

impl Visual {
    pub fn anchor_point(&self) -> Vec2 {
        self.anchor_point
    }
}

/// Bottom-left corner and size of a sprite on screen
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScreenTransform {
    pub position: Vec2,
    pub size: Vec2,
}

/// Total order used to draw sprites back to front.
///
/// Higher z groups come first, then higher y, then the handle as a stable
/// tiebreaker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DrawKey {
    neg_z_group: i32,
    neg_y: OrderedFloat<f32>,
    handle: SpriteHandle,
}

impl DrawKey {
    pub fn new(z_group: i32, y: f32, handle: SpriteHandle) -> Self {
        Self {
            neg_z_group: -z_group,
            neg_y: OrderedFloat(-y),
            handle,
        }
    }

    pub fn z_group(&self) -> i32 {
        -self.neg_z_group
    }

    pub fn handle(&self) -> SpriteHandle {
        self.handle
    }
}

#[derive(Debug)]
pub struct Sprite {
    pub handle: SpriteHandle,
    position: Vec2,
    z_group: i32,
    visual: Visual,
    opacity: Opacity,
    visible: bool,
    dirty: bool,
    /// Bumped on every visual change so the manager knows when to resync followers
    visual_version: u64,
    transform: ScreenTransform,
    pub(crate) parent: Option<SpriteHandle>,
    pub(crate) children: Vec<SpriteHandle>,
    pub(crate) master: Option<SpriteHandle>,
    pub(crate) followers: Vec<SpriteHandle>,
    pub(crate) engines: Vec<Transition>,
}

impl Sprite {
    pub fn new(handle: SpriteHandle, position: Vec2, z_group: i32) -> Self {
        Self {
            handle,
            position,
            z_group,
            visual: Visual::default(),
            opacity: OPAQUE,
            visible: true,
            dirty: true,
            visual_version: 0,
            transform: ScreenTransform::default(),
            parent: None,
            children: Vec::new(),
            master: None,
            followers: Vec::new(),
            engines: Vec::new(),
        }
    }

    /// Position relative to the parent, or in the world if there is none
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        if self.position != position {
            self.position = position;
            self.dirty = true;
        }
    }

    pub fn z_group(&self) -> i32 {
        self.z_group
    }

    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    pub fn component_name(&self) -> Option<&str> {
        self.visual.component.as_deref().map(|c| c.name.as_str())
    }

    /// Switch the displayed component
    ///
    /// The anchor is resolved first; on error the sprite is left untouched.
    pub fn set_component(
        &mut self,
        component: Rc<SpriteComponent>,
        displacement: Vec2,
        duration: Option<Seconds>,
        anchor: &str,
    ) -> Result<()> {
        let anchor_point = component.get_anchor(anchor)?;
        self.apply_visual(Visual {
            component: Some(component),
            displacement,
            duration,
            anchor: anchor.to_string(),
            anchor_point,
        });
        Ok(())
    }

    /// Take over a visual wholesale; used to sync followers to their master
    pub fn apply_visual(&mut self, visual: Visual) {
        self.visual = visual;
        self.visual_version += 1;
        self.dirty = true;
    }

    pub fn visual_version(&self) -> u64 {
        self.visual_version
    }

    pub fn opacity(&self) -> Opacity {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: Opacity) {
        self.opacity = opacity;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn parent(&self) -> Option<SpriteHandle> {
        self.parent
    }

    pub fn children(&self) -> &[SpriteHandle] {
        &self.children
    }

    pub fn master(&self) -> Option<SpriteHandle> {
        self.master
    }

    pub fn followers(&self) -> &[SpriteHandle] {
        &self.followers
    }

    pub fn engines(&self) -> &[Transition] {
        &self.engines
    }

    /// The incomplete animation player, if one is running
    pub fn running_animation(&self) -> Option<&Transition> {
        self.engines.iter().find(|t| t.is_running_animation())
    }

    pub fn transform(&self) -> ScreenTransform {
        self.transform
    }

    /// Recompute the screen transform from the accumulated parent offset
    /// and clear the dirty flag
    pub fn update_transform(&mut self, parent_offset: Vec2) {
        let world = self.position + parent_offset;
        let anchor = self.visual.anchor_point;
        let size = self
            .visual
            .component
            .as_ref()
            .map(|c| c.rect.size())
            .unwrap_or(Vec2::ZERO);
        self.transform = ScreenTransform {
            position: Vec2::new(
                world.x + self.visual.displacement.x - anchor.x,
                world.y + self.visual.displacement.y - size.y + anchor.y,
            ),
            size,
        };
        self.dirty = false;
    }

    pub fn draw_key(&self) -> DrawKey {
        DrawKey::new(self.z_group, self.position.y, self.handle)
    }
}
