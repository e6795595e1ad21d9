//! Units, unit groups and group movement.

pub mod group;

pub use group::{Facing, GroupMove, MoveContext, Unit, UnitGroup, UnitSet, STAND_ANCHOR};
