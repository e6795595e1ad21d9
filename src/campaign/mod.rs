//! The campaign map: hex tiles, movement rules, pathfinding and fog of war.

pub mod map;
pub mod moves;
pub mod pathfinding;
pub mod visibility;

pub use map::{Direction, HexCoord, Locale, Terrain, Tile, TileMap};
pub use moves::{MapMoveRules, MoveRules, SimpleHexMoveRules};
pub use pathfinding::{AStar, Dijkstra, Reachable, SearchGoal};
pub use visibility::{explore_after_move_to, init_fog, FogState, FogUpdate, Reveal};
