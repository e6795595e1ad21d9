//! Screen-space quad data handed to the renderer.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::core::types::Opacity;
use crate::renderer::sprites::atlas::SpriteRegion;

/// One sprite ready for drawing. 32 bytes, 16-byte aligned.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteQuad {
    /// Bottom-left corner in screen space.
    pub position: [f32; 2],
    /// Size in pixels.
    pub size: [f32; 2],
    /// Packed UV offset (16-bit u, 16-bit v normalized to 0-65535).
    pub uv_offset: u32,
    /// Packed UV size (16-bit width, 16-bit height normalized).
    pub uv_size: u32,
    /// White tint with the sprite's opacity in the alpha byte, RGBA8.
    pub color_tint: u32,
    /// Padding for 16-byte alignment.
    pub _padding: u32,
}

impl SpriteQuad {
    pub fn new(
        position: Vec2,
        size: Vec2,
        region: SpriteRegion,
        atlas_size: (u32, u32),
        opacity: Opacity,
    ) -> Self {
        let (uv_offset, uv_size) = region.uv(atlas_size.0.max(1), atlas_size.1.max(1));
        Self {
            position: position.to_array(),
            size: size.to_array(),
            uv_offset: pack_unorm16(uv_offset),
            uv_size: pack_unorm16(uv_size),
            color_tint: 0xFFFF_FF00 | opacity as u32,
            _padding: 0,
        }
    }

    pub fn opacity(&self) -> Opacity {
        (self.color_tint & 0xFF) as Opacity
    }
}

fn pack_unorm16(value: [f32; 2]) -> u32 {
    let u = (value[0].clamp(0.0, 1.0) * 65535.0) as u32;
    let v = (value[1].clamp(0.0, 1.0) * 65535.0) as u32;
    u | (v << 16)
}

/// The visible window onto the world, in screen units
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// World position of the bottom-left corner
    pub offset: Vec2,
    pub size: Vec2,
}

impl Viewport {
    pub fn new(offset: Vec2, size: Vec2) -> Self {
        Self { offset, size }
    }

    /// Viewport of `size` centred on `center`
    pub fn centered_on(center: Vec2, size: Vec2) -> Self {
        Self::new(center - size / 2.0, size)
    }

    /// Does the rectangle at `position` with `size` overlap the view?
    pub fn intersects(&self, position: Vec2, size: Vec2) -> bool {
        let max = self.offset + self.size;
        position.x < max.x
            && position.x + size.x > self.offset.x
            && position.y < max.y
            && position.y + size.y > self.offset.y
    }

    /// Convert a point relative to the window into world space
    pub fn to_world(&self, screen: Vec2) -> Vec2 {
        screen + self.offset
    }
}

/// What the core needs from whatever draws the frame.
pub trait Renderer {
    fn viewport(&self) -> Viewport;

    /// Pixel size of the texture atlas the quads' regions refer to
    fn atlas_size(&self) -> (u32, u32);

    /// Draw one z group, back to front
    fn draw_batch(&mut self, z_group: i32, quads: &[SpriteQuad]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_quad_size() {
        assert_eq!(std::mem::size_of::<SpriteQuad>(), 32);
    }

    #[test]
    fn test_sprite_quad_alignment() {
        assert_eq!(std::mem::align_of::<SpriteQuad>(), 16);
    }

    #[test]
    fn test_sprite_quad_packing() {
        let quad = SpriteQuad::new(
            Vec2::new(100.0, 200.0),
            Vec2::new(48.0, 30.0),
            SpriteRegion::new(128, 64, 32, 16),
            (256, 256),
            128,
        );

        assert_eq!(quad.position, [100.0, 200.0]);
        assert_eq!(quad.size, [48.0, 30.0]);
        assert_eq!(quad.opacity(), 128);
        assert_eq!(quad.color_tint >> 8, 0x00FF_FFFF);

        let u_off = quad.uv_offset & 0xFFFF;
        let v_off = (quad.uv_offset >> 16) & 0xFFFF;
        assert!(u_off > 32000 && u_off < 33000); // ~0.5
        assert!(v_off > 16000 && v_off < 17000); // ~0.25
    }

    #[test]
    fn test_quad_bytes_cast() {
        let quads = [SpriteQuad::zeroed(); 3];
        let bytes: &[u8] = bytemuck::cast_slice(&quads);
        assert_eq!(bytes.len(), 96);
    }

    #[test]
    fn test_viewport_intersection() {
        let view = Viewport::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 50.0));
        assert!(view.intersects(Vec2::new(90.0, 40.0), Vec2::new(20.0, 20.0)));
        assert!(view.intersects(Vec2::new(-10.0, -10.0), Vec2::new(20.0, 20.0)));
        assert!(!view.intersects(Vec2::new(100.0, 0.0), Vec2::new(10.0, 10.0)));
        assert!(!view.intersects(Vec2::new(0.0, -30.0), Vec2::new(10.0, 30.0)));
    }

    #[test]
    fn test_centered_viewport() {
        let view = Viewport::centered_on(Vec2::ZERO, Vec2::new(100.0, 60.0));
        assert_eq!(view.offset, Vec2::new(-50.0, -30.0));
        assert_eq!(view.to_world(Vec2::new(50.0, 30.0)), Vec2::ZERO);
    }
}
