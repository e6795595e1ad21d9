//! Fog of war
//!
//! A tile is hidden, edged (known to exist, drawn under a shroud) or
//! explored (terrain revealed, edged implied). Tiles only ever move forward
//! through those states.

use serde::{Deserialize, Serialize};

use crate::campaign::map::{Direction, HexCoord, Tile, TileMap};
use crate::core::error::Result;

/// Visibility state for a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FogState {
    Hidden,
    Edged,
    Explored,
}

impl FogState {
    pub fn of(tile: &Tile) -> Self {
        if tile.explored {
            Self::Explored
        } else if tile.edged {
            Self::Edged
        } else {
            Self::Hidden
        }
    }
}

/// A tile revealed by a move, and the direction it lies in from the mover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    pub coord: HexCoord,
    pub direction: Direction,
}

/// Tiles whose fog state changed after a move
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FogUpdate {
    pub explored: Vec<Reveal>,
    pub edged: Vec<HexCoord>,
}

impl FogUpdate {
    pub fn is_empty(&self) -> bool {
        self.explored.is_empty() && self.edged.is_empty()
    }
}

fn explore(tile: &mut Tile) -> bool {
    let changed = !tile.explored;
    tile.explored = true;
    tile.edged = true;
    changed
}

fn edge(tile: &mut Tile) -> bool {
    if tile.explored || tile.edged {
        return false;
    }
    tile.edged = true;
    true
}

/// Set up the fog around the starting tile
///
/// The origin and its neighbours are explored and the ring beyond is edged.
/// With `reveal_map` every tile starts explored.
pub fn init_fog(map: &mut TileMap, origin: HexCoord, reveal_map: bool) -> Result<()> {
    let origin = map.tile(&origin)?.coord;

    if reveal_map {
        for tile in map.tiles_mut() {
            explore(tile);
        }
        tracing::debug!(tiles = map.len(), "Map revealed");
        return Ok(());
    }

    let mut inner = map.neighbors(&origin);
    inner.push(origin);
    for coord in &inner {
        if let Some(tile) = map.get_mut(coord) {
            explore(tile);
        }
    }
    for coord in &inner {
        for outer in map.neighbors(coord) {
            if let Some(tile) = map.get_mut(&outer) {
                edge(tile);
            }
        }
    }
    tracing::debug!(origin = ?origin, "Fog initialised");
    Ok(())
}

/// Explore around a group that has just moved to `coord`
///
/// Unexplored neighbours become explored; anything next to a newly explored
/// tile that was still hidden becomes edged.
pub fn explore_after_move_to(map: &mut TileMap, coord: HexCoord) -> Result<FogUpdate> {
    let center = map.tile(&coord)?.coord;
    let mut update = FogUpdate::default();

    for direction in Direction::ALL {
        let (dx, dy) = direction.delta();
        let neighbor = map.wrap(center.offset(dx, dy));
        if let Some(tile) = map.get_mut(&neighbor) {
            if explore(tile) {
                update.explored.push(Reveal {
                    coord: neighbor,
                    direction,
                });
            }
        }
    }

    let newly_explored: Vec<HexCoord> = update.explored.iter().map(|r| r.coord).collect();
    for explored in newly_explored {
        for outer in map.neighbors(&explored) {
            if let Some(tile) = map.get_mut(&outer) {
                if edge(tile) {
                    update.edged.push(outer);
                }
            }
        }
    }

    if !update.is_empty() {
        tracing::debug!(
            at = ?center,
            explored = update.explored.len(),
            edged = update.edged.len(),
            "Explored after move"
        );
    }
    Ok(update)
}
