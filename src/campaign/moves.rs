//! Movement rules: which hexes connect and what a step costs.

use crate::campaign::map::{HexCoord, TileMap};

/// Adjacency, step cost and distance estimate for a search space
pub trait MoveRules {
    /// Hexes reachable in one step from `coord`
    fn adjacent(&self, coord: HexCoord) -> Vec<HexCoord>;

    fn is_adjacent(&self, from: HexCoord, to: HexCoord) -> bool;

    /// Cost of a single step, `None` if the hexes are not adjacent
    fn cost(&self, from: HexCoord, to: HexCoord) -> Option<u32> {
        self.is_adjacent(from, to).then_some(1)
    }

    /// Lower bound on the cost between two hexes
    fn distance(&self, from: HexCoord, to: HexCoord) -> u32;

    /// The representative of `coord` that searches key on
    fn canonical(&self, coord: HexCoord) -> HexCoord {
        coord
    }
}

/// Unbounded hex plane with uniform step cost
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleHexMoveRules;

impl MoveRules for SimpleHexMoveRules {
    fn adjacent(&self, coord: HexCoord) -> Vec<HexCoord> {
        coord.neighbors().to_vec()
    }

    fn is_adjacent(&self, from: HexCoord, to: HexCoord) -> bool {
        from.is_adjacent(&to)
    }

    fn distance(&self, from: HexCoord, to: HexCoord) -> u32 {
        from.distance(&to)
    }
}

/// Moves restricted to the tiles of a wrapping map
#[derive(Debug, Clone, Copy)]
pub struct MapMoveRules<'m> {
    map: &'m TileMap,
}

impl<'m> MapMoveRules<'m> {
    pub fn new(map: &'m TileMap) -> Self {
        Self { map }
    }
}

impl MoveRules for MapMoveRules<'_> {
    fn adjacent(&self, coord: HexCoord) -> Vec<HexCoord> {
        self.map.neighbors(&coord)
    }

    fn is_adjacent(&self, from: HexCoord, to: HexCoord) -> bool {
        self.map.contains(&to) && self.map.step_between(&from, &to).is_some()
    }

    /// Shortest distance around the cylinder; never overestimates
    fn distance(&self, from: HexCoord, to: HexCoord) -> u32 {
        self.map.distance(&from, &to)
    }

    fn canonical(&self, coord: HexCoord) -> HexCoord {
        self.map.wrap(coord)
    }
}
