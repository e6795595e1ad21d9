//! Campaign map - wraparound hex tile map
//!
//! Tiles are addressed by axial coordinates. The map wraps horizontally:
//! shifting `x` by one map width shifts `y` by half a width so that rows stay
//! level on screen.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::error::{GameError, Result};
use crate::core::types::SpriteHandle;

/// Axial hex coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct HexCoord {
    pub x: i32,
    pub y: i32,
}

/// The six adjacency offsets, in canonical order
pub const ADJACENT_DIFFS: [(i32, i32); 6] = [(1, -1), (-1, 0), (0, -1), (0, 1), (1, 0), (-1, 1)];

impl HexCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Get all 6 adjacent hexes
    pub fn neighbors(&self) -> [HexCoord; 6] {
        ADJACENT_DIFFS.map(|(dx, dy)| self.offset(dx, dy))
    }

    pub fn is_adjacent(&self, other: &HexCoord) -> bool {
        ADJACENT_DIFFS.contains(&(other.x - self.x, other.y - self.y))
    }

    /// Distance in hex steps
    ///
    /// When the deltas pull in opposite directions (or one is zero) the
    /// diagonal steps absorb the smaller one; otherwise both must be walked.
    pub fn distance(&self, other: &HexCoord) -> u32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        if dx.signum() * dy.signum() <= 0 {
            dx.unsigned_abs().max(dy.unsigned_abs())
        } else {
            (dx + dy).unsigned_abs()
        }
    }

    /// Coordinates exactly `radius` steps away, walking the ring clockwise
    pub fn ring(&self, radius: u32) -> Vec<HexCoord> {
        if radius == 0 {
            return vec![*self];
        }
        let r = radius as i32;
        let mut results = Vec::with_capacity(6 * radius as usize);
        let mut current = self.offset(-r, r);
        for direction in [
            Direction::NorthEast,
            Direction::SouthEast,
            Direction::South,
            Direction::SouthWest,
            Direction::NorthWest,
            Direction::North,
        ] {
            let (dx, dy) = direction.delta();
            for _ in 0..radius {
                results.push(current);
                current = current.offset(dx, dy);
            }
        }
        results
    }
}

/// Hex directions as seen on screen (y up)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "n")]
    North,
    #[serde(rename = "ne")]
    NorthEast,
    #[serde(rename = "se")]
    SouthEast,
    #[serde(rename = "s")]
    South,
    #[serde(rename = "sw")]
    SouthWest,
    #[serde(rename = "nw")]
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    pub fn delta(&self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::NorthEast => (1, 0),
            Self::SouthEast => (1, -1),
            Self::South => (0, -1),
            Self::SouthWest => (-1, 0),
            Self::NorthWest => (-1, 1),
        }
    }

    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.delta() == (dx, dy))
    }

    /// Straight up or down the screen
    pub fn is_vertical(&self) -> bool {
        matches!(self, Self::North | Self::South)
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::North => Self::South,
            Self::NorthEast => Self::SouthWest,
            Self::SouthEast => Self::NorthWest,
            Self::South => Self::North,
            Self::SouthWest => Self::NorthEast,
            Self::NorthWest => Self::SouthEast,
        }
    }
}

/// Terrain classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    #[default]
    Plains,
    Sea,
    Forest,
    Mountain,
}

impl Terrain {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plains => "plains",
            Self::Sea => "sea",
            Self::Forest => "forest",
            Self::Mountain => "mountain",
        }
    }

    /// Atlas component for the static tile; sea tiles follow an animation instead
    pub fn component_name(&self) -> &'static str {
        match self {
            Self::Plains => "terrain.grassland",
            Self::Sea => "terrain.sea",
            Self::Forest => "terrain.forest",
            Self::Mountain => "terrain.mountain",
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self, Self::Sea)
    }
}

/// Named places on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    Village,
}

impl Locale {
    pub fn component_name(&self) -> &'static str {
        match self {
            Self::Village => "locale.village",
        }
    }
}

/// A single hex tile
#[derive(Debug, Clone)]
pub struct Tile {
    pub coord: HexCoord,
    pub terrain: Terrain,
    pub explored: bool,
    pub edged: bool,
    pub locale: Option<Locale>,
    /// Terrain sprite, present while the tile is explored and in view
    pub sprite: Option<SpriteHandle>,
    /// Fog overlay, present while the tile is edged but unexplored and in view
    pub shroud: Option<SpriteHandle>,
}

impl Tile {
    pub fn new(coord: HexCoord) -> Self {
        Self {
            coord,
            terrain: Terrain::Plains,
            explored: false,
            edged: false,
            locale: None,
            sprite: None,
            shroud: None,
        }
    }

    pub fn with_terrain(mut self, terrain: Terrain) -> Self {
        self.terrain = terrain;
        self
    }
}

/// The wraparound tile map
#[derive(Debug, Clone)]
pub struct TileMap {
    tiles: AHashMap<HexCoord, Tile>,
    pub width: i32,
    pub height: i32,
    pub min_x: i32,
    pub min_y: i32,
}

impl TileMap {
    /// Create an empty map with the given bounds
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            tiles: AHashMap::new(),
            width,
            height,
            min_x: (1 - width).div_euclid(2),
            min_y: (1 - height).div_euclid(2),
        }
    }

    /// Create a map filled with plains tiles, centred on the origin
    ///
    /// Each column is shifted down by half its index so the map is a
    /// rectangle on screen.
    pub fn generate_square(width: i32, height: i32) -> Self {
        let mut map = Self::new(width, height);
        for x in map.min_x..map.min_x + width {
            let y_offset = map.column_offset(x);
            for y in map.min_y + y_offset..map.min_y + height + y_offset {
                let coord = HexCoord::new(x, y);
                map.tiles.insert(coord, Tile::new(coord));
            }
        }
        map
    }

    /// Vertical shift of a column's y range
    fn column_offset(&self, x: i32) -> i32 {
        -(x + 1).div_euclid(2)
    }

    /// Screen row of a wrapped coordinate, counted from the bottom of the map
    ///
    /// Tiles on the map have rows in `[0, height)`.
    pub fn row(&self, coord: &HexCoord) -> i32 {
        let wrapped = self.wrap(*coord);
        wrapped.y - self.column_offset(wrapped.x) - self.min_y
    }

    pub fn add_tile(&mut self, tile: Tile) -> Result<()> {
        let coord = tile.coord;
        if self.tiles.contains_key(&coord) {
            return Err(GameError::DuplicateTile { x: coord.x, y: coord.y });
        }
        self.tiles.insert(coord, tile);
        Ok(())
    }

    /// Wrap a coordinate into the map's x range
    ///
    /// One modular step replaces the repeated-shift formulation: shifting by
    /// `k` widths moves `y` by `k * width / 2`, and after the shift `x` lies
    /// in `[min_x, min_x + width)`, so a second application has `k = 0`.
    pub fn wrap(&self, coord: HexCoord) -> HexCoord {
        let k = (coord.x - self.min_x).div_euclid(self.width);
        HexCoord::new(coord.x - k * self.width, coord.y + k * self.width / 2)
    }

    pub fn get(&self, coord: &HexCoord) -> Option<&Tile> {
        self.tiles.get(&self.wrap(*coord))
    }

    pub fn get_mut(&mut self, coord: &HexCoord) -> Option<&mut Tile> {
        let wrapped = self.wrap(*coord);
        self.tiles.get_mut(&wrapped)
    }

    /// Like [`get`](Self::get) but a missing tile is an error
    pub fn tile(&self, coord: &HexCoord) -> Result<&Tile> {
        self.get(coord)
            .ok_or(GameError::NoSuchTile { x: coord.x, y: coord.y })
    }

    pub fn contains(&self, coord: &HexCoord) -> bool {
        self.get(coord).is_some()
    }

    /// Wrapped neighbours that exist on the map
    pub fn neighbors(&self, coord: &HexCoord) -> Vec<HexCoord> {
        coord
            .neighbors()
            .into_iter()
            .map(|n| self.wrap(n))
            .filter(|n| self.tiles.contains_key(n))
            .collect()
    }

    /// The raw offset that leads from `from` to `to` across the wrap seam
    pub fn step_between(&self, from: &HexCoord, to: &HexCoord) -> Option<(i32, i32)> {
        let target = self.wrap(*to);
        ADJACENT_DIFFS
            .into_iter()
            .find(|&(dx, dy)| self.wrap(from.offset(dx, dy)) == target)
    }

    /// Wrap-aware hex distance: the shortest way round the cylinder
    pub fn distance(&self, a: &HexCoord, b: &HexCoord) -> u32 {
        let a = self.wrap(*a);
        let b = self.wrap(*b);
        let half = self.width / 2;
        [0, 1, -1]
            .into_iter()
            .map(|k| a.distance(&b.offset(k * self.width, -k * half)))
            .min()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All coordinates in deterministic (sorted) order
    pub fn coords(&self) -> Vec<HexCoord> {
        let mut coords: Vec<HexCoord> = self.tiles.keys().copied().collect();
        coords.sort();
        coords
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn tiles_mut(&mut self) -> impl Iterator<Item = &mut Tile> {
        self.tiles.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_getadjacent() {
        let expected = [
            HexCoord::new(0, -2),
            HexCoord::new(-2, -1),
            HexCoord::new(-1, -2),
            HexCoord::new(-1, 0),
            HexCoord::new(0, -1),
            HexCoord::new(-2, 0),
        ];
        assert_eq!(HexCoord::new(-1, -1).neighbors(), expected);
    }

    #[test]
    fn test_isadjacent() {
        let origin = HexCoord::new(-1, -1);
        for n in origin.neighbors() {
            assert!(origin.is_adjacent(&n));
        }
        assert!(!origin.is_adjacent(&origin));
        assert!(!origin.is_adjacent(&HexCoord::new(-3, -1)));
        assert!(origin.is_adjacent(&HexCoord::new(-2, 0)));
    }

    #[test]
    fn test_hex_distance() {
        let origin = HexCoord::new(-1, -1);
        for n in origin.neighbors() {
            assert_eq!(origin.distance(&n), 1);
        }
        assert_eq!(origin.distance(&HexCoord::new(1, 1)), 4);
        assert_eq!(origin.distance(&HexCoord::new(-3, -3)), 4);
        assert_eq!(origin.distance(&HexCoord::new(-3, -1)), 2);
        assert_eq!(origin.distance(&HexCoord::new(-3, 0)), 2);
        assert_eq!(origin.distance(&HexCoord::new(-3, 1)), 2);
    }

    #[test]
    fn test_distance_is_not_max_of_three_deltas() {
        // max(|dx|, |dy|, |dx - dy|) reports 2 here; the true distance is 4
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(2, 2);
        assert_eq!(a.distance(&b), 4);
        // ... and reports 2 where opposite-signed deltas cost only 1
        assert_eq!(a.distance(&HexCoord::new(1, -1)), 1);
    }

    #[test]
    fn test_ring() {
        let center = HexCoord::new(2, -3);
        let ring = center.ring(2);
        assert_eq!(ring.len(), 12);
        for coord in &ring {
            assert_eq!(center.distance(coord), 2);
        }
        assert_eq!(center.ring(0), vec![center]);
    }

    #[test]
    fn test_direction_roundtrip() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.delta();
            assert_eq!(Direction::from_delta(dx, dy), Some(direction));
            let (ox, oy) = direction.opposite().delta();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
        assert_eq!(Direction::from_delta(2, 2), None);
    }

    #[test]
    fn test_generate_square_counts() {
        let map = TileMap::generate_square(14, 14);
        assert_eq!(map.len(), 196);
        assert_eq!(map.min_x, -7);
        assert!(map.contains(&HexCoord::new(0, 0)));
        assert!(map.contains(&HexCoord::new(-7, -3)));
        assert!(map.contains(&HexCoord::new(6, -10)));
    }

    #[test]
    fn test_wrap_shifts_y_by_half_width() {
        let map = TileMap::generate_square(14, 14);
        let wrapped = map.wrap(HexCoord::new(7, -3));
        assert_eq!(wrapped, HexCoord::new(-7, 4));
        assert_eq!(map.wrap(wrapped), wrapped);
        assert!(map.contains(&HexCoord::new(7, -3)));
    }

    #[test]
    fn test_neighbors_cross_seam() {
        let map = TileMap::generate_square(14, 14);
        let edge = HexCoord::new(6, -3);
        let neighbors = map.neighbors(&edge);
        assert_eq!(neighbors.len(), 6);
        for n in &neighbors {
            assert!(n.x >= map.min_x && n.x < map.min_x + map.width);
        }
        assert_eq!(map.step_between(&edge, &HexCoord::new(-7, 4)), Some((1, 0)));
    }

    #[test]
    fn test_rows_span_height() {
        let map = TileMap::generate_square(14, 14);
        for tile in map.tiles() {
            let row = map.row(&tile.coord);
            assert!((0..14).contains(&row));
        }
        // Moving north-east stays on the same row every other column
        assert_eq!(map.row(&HexCoord::new(1, 0)), map.row(&HexCoord::new(2, 0)));
        assert_eq!(map.row(&HexCoord::new(1, 0)), map.row(&HexCoord::new(0, 0)) + 1);
        assert_eq!(map.row(&HexCoord::new(0, 1)), map.row(&HexCoord::new(0, 0)) + 1);
    }

    #[test]
    fn test_wrap_distance() {
        let map = TileMap::generate_square(14, 14);
        let a = HexCoord::new(6, -3);
        let b = HexCoord::new(-7, 4);
        assert_eq!(map.distance(&a, &b), 1);
        assert_eq!(map.distance(&a, &a), 0);
    }

    #[test]
    fn test_add_duplicate_tile() {
        let mut map = TileMap::generate_square(4, 4);
        let result = map.add_tile(Tile::new(HexCoord::new(0, 0)));
        assert!(matches!(result, Err(GameError::DuplicateTile { x: 0, y: 0 })));
    }
}
