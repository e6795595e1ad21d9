//! Hex grid projection between tile coordinates and screen space.
//!
//! Columns are laid out brick-wise: each step in `x` moves right by
//! `tile_width - point_width` and up by half a tile, each step in `y` moves
//! up by a whole tile. Screen y grows upwards.

use glam::Vec2;

use crate::campaign::map::{Direction, HexCoord};
use crate::core::config::TileGeometry;

/// Projection for one tile geometry, with the direction speed multipliers
/// computed once up front.
#[derive(Debug, Clone, Copy)]
pub struct HexLayout {
    pub tile_width: f32,
    pub tile_height: f32,
    pub point_width: f32,
    perspective_sin: f32,
    diagonal_distance_multiplier: f32,
}

impl HexLayout {
    pub fn new(geometry: TileGeometry) -> Self {
        let column_step = geometry.tile_width - geometry.point_width;
        // Centre-to-centre distance of the unsquashed regular hexagon
        let true_distance = column_step / (3.0_f32.sqrt() / 2.0);
        let diagonal = Vec2::new(column_step, geometry.tile_height / 2.0).length();
        Self {
            tile_width: geometry.tile_width,
            tile_height: geometry.tile_height,
            point_width: geometry.point_width,
            perspective_sin: geometry.tile_height / true_distance,
            diagonal_distance_multiplier: diagonal / true_distance,
        }
    }

    /// Horizontal distance between neighbouring columns
    pub fn column_step(&self) -> f32 {
        self.tile_width - self.point_width
    }

    /// Bottom-left corner of the tile's bounding box
    pub fn tile_origin(&self, coord: HexCoord) -> Vec2 {
        Vec2::new(
            coord.x as f32 * self.column_step(),
            coord.y as f32 * self.tile_height + coord.x as f32 * self.tile_height / 2.0,
        )
    }

    /// Centre of the tile
    pub fn tile_center(&self, coord: HexCoord) -> Vec2 {
        self.tile_origin(coord) + Vec2::new(self.tile_width / 2.0, self.tile_height / 2.0)
    }

    /// Screen size of a tile's bounding box
    pub fn tile_size(&self) -> Vec2 {
        Vec2::new(self.tile_width, self.tile_height)
    }

    /// Vertical squash of the view
    pub fn perspective_sin(&self) -> f32 {
        self.perspective_sin
    }

    pub fn diagonal_distance_multiplier(&self) -> f32 {
        self.diagonal_distance_multiplier
    }

    /// Screen speed for a move in `direction`, so that every direction takes
    /// the same time per tile
    pub fn speed_multiplier(&self, direction: Direction) -> f32 {
        if direction.is_vertical() {
            self.perspective_sin
        } else {
            self.diagonal_distance_multiplier
        }
    }

    /// Resolve a screen point to the tile that contains it
    pub fn tile_at(&self, point: Vec2) -> HexCoord {
        let step = self.column_step();
        let half_height = self.tile_height / 2.0;
        let column = (point.x / step).floor() as i32;
        let row = (point.y / half_height).floor() as i32;

        let local_x = point.x - column as f32 * step;
        let local_y = point.y - row as f32 * half_height;

        let chosen = if local_x >= self.point_width {
            column
        } else {
            // Inside the overlap of two columns; the right tile's pointed
            // edge crosses the box diagonally, flipping every other row.
            let t = local_y / half_height;
            let edge_x = if (row - column).rem_euclid(2) == 0 {
                self.point_width * (1.0 - t)
            } else {
                self.point_width * t
            };
            if local_x >= edge_x {
                column
            } else {
                column - 1
            }
        };

        let y = ((point.y - chosen as f32 * half_height) / self.tile_height).floor() as i32;
        HexCoord::new(chosen, y)
    }
}

impl Default for HexLayout {
    fn default() -> Self {
        Self::new(TileGeometry::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> HexLayout {
        HexLayout::new(TileGeometry {
            tile_width: 48.0,
            tile_height: 30.0,
            point_width: 16.0,
        })
    }

    #[test]
    fn test_hex_to_world_origin() {
        let world = layout().tile_origin(HexCoord::new(0, 0));
        assert!(world.x.abs() < 0.001);
        assert!(world.y.abs() < 0.001);
    }

    #[test]
    fn test_brick_offset() {
        let layout = layout();
        let a = layout.tile_origin(HexCoord::new(1, 0));
        assert_eq!(a, Vec2::new(32.0, 15.0));
        let b = layout.tile_origin(HexCoord::new(1, -1));
        assert_eq!(b, Vec2::new(32.0, -15.0));
    }

    #[test]
    fn test_center_roundtrip() {
        let layout = layout();
        for x in -6..6 {
            for y in -6..6 {
                let coord = HexCoord::new(x, y);
                assert_eq!(layout.tile_at(layout.tile_center(coord)), coord);
            }
        }
    }

    #[test]
    fn test_pointed_ends_resolve_to_their_column() {
        let layout = layout();
        let coord = HexCoord::new(2, -1);
        let origin = layout.tile_origin(coord);
        // Just inside the left point, at mid height
        let left_point = origin + Vec2::new(1.0, 15.0);
        assert_eq!(layout.tile_at(left_point), coord);
        // Just inside the right point
        let right_point = origin + Vec2::new(47.0, 15.0);
        assert_eq!(layout.tile_at(right_point), coord);
    }

    #[test]
    fn test_corner_of_box_belongs_to_neighbour() {
        let layout = layout();
        let coord = HexCoord::new(0, 0);
        let origin = layout.tile_origin(coord);
        // Bottom-left corner of the bounding box lies outside the hexagon,
        // inside the south-west neighbour
        let corner = origin + Vec2::new(1.0, 1.0);
        assert_eq!(layout.tile_at(corner), HexCoord::new(-1, 0));
        // Top-left corner belongs to the north-west neighbour
        let top_corner = origin + Vec2::new(1.0, 29.0);
        assert_eq!(layout.tile_at(top_corner), HexCoord::new(-1, 1));
    }

    #[test]
    fn test_speed_multipliers() {
        let layout = layout();
        // Squashed vertically: vertical moves are slower on screen than diagonal ones
        assert!(layout.perspective_sin() > 0.0);
        assert!(layout.perspective_sin() < layout.diagonal_distance_multiplier());
        assert_eq!(layout.speed_multiplier(Direction::North), layout.perspective_sin());
        assert_eq!(
            layout.speed_multiplier(Direction::SouthWest),
            layout.diagonal_distance_multiplier()
        );
    }

    #[test]
    fn test_equal_time_per_tile() {
        let layout = layout();
        let origin = layout.tile_center(HexCoord::new(0, 0));
        let times: Vec<f32> = Direction::ALL
            .iter()
            .map(|d| {
                let (dx, dy) = d.delta();
                let dest = layout.tile_center(HexCoord::new(dx, dy));
                (dest - origin).length() / layout.speed_multiplier(*d)
            })
            .collect();
        for t in &times {
            assert!((t - times[0]).abs() < 0.001);
        }
    }
}
