//! Units and unit groups on the campaign map
//!
//! A group moves one tile at a time. Its logical coordinate changes as soon
//! as the move is accepted; each unit then waits a small random delay and
//! walks across. The group stays in transit until the last unit arrives.

use glam::Vec2;
use rand::{Rng, RngCore};
use std::cell::Cell;
use std::rc::Rc;

use crate::campaign::map::{Direction, HexCoord, TileMap};
use crate::core::config::UnitParams;
use crate::core::error::{GameError, Result};
use crate::core::types::{z_group, GroupId, Seconds, SpriteHandle};
use crate::renderer::hex::HexLayout;
use crate::renderer::sprites::animation::Animation;
use crate::renderer::sprites::atlas::{AssetProvider, SpriteComponent};
use crate::renderer::sprites::manager::SpriteManager;
use crate::renderer::sprites::transition::{
    CallbackRegistry, MoveEngine, MoveWithAnimationEngine, TransitionEngine,
};

/// Anchor unit components stand on
pub const STAND_ANCHOR: &str = "stand";

/// Which way a unit's sprite faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Facing for a step; straight up faces right, straight down faces left
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::NorthEast | Direction::SouthEast | Direction::North => Self::Right,
            Direction::SouthWest | Direction::NorthWest | Direction::South => Self::Left,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    /// Asset family, e.g. `knight` for `unit.knight.walk_right`
    pub name: String,
    pub facing: Facing,
    pub sprite: Option<SpriteHandle>,
}

impl Unit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            facing: Facing::default(),
            sprite: None,
        }
    }

    pub fn walk_animation_name(&self, facing: Facing) -> String {
        format!("unit.{}.walk_{}", self.name, facing.suffix())
    }

    pub fn stand_component_name(&self, facing: Facing) -> String {
        format!("unit.{}.stand_{}", self.name, facing.suffix())
    }
}

/// Borrowed world state a group move works against
pub struct MoveContext<'a> {
    pub map: &'a TileMap,
    pub layout: &'a HexLayout,
    pub sprites: &'a mut SpriteManager,
    pub assets: &'a dyn AssetProvider,
    pub params: &'a UnitParams,
    pub rng: &'a mut dyn RngCore,
}

/// An accepted move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupMove {
    pub from: HexCoord,
    /// Destination, wrapped onto the map
    pub to: HexCoord,
    pub direction: Direction,
}

#[derive(Debug)]
pub struct UnitGroup {
    pub id: GroupId,
    coord: HexCoord,
    units: Vec<Unit>,
    /// Units still walking; shared with their arrival callbacks
    pending: Rc<Cell<usize>>,
}

impl UnitGroup {
    pub fn new(id: GroupId, coord: HexCoord) -> Self {
        Self {
            id,
            coord,
            units: Vec::new(),
            pending: Rc::new(Cell::new(0)),
        }
    }

    pub fn coord(&self) -> HexCoord {
        self.coord
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn add_unit(&mut self, unit: Unit) {
        self.units.push(unit);
    }

    /// Whether any unit sprite is still walking
    ///
    /// A group with no live unit sprites has nothing to animate, so its moves
    /// complete as soon as they are accepted and it is never in transit.
    pub fn in_transit(&self) -> bool {
        self.pending.get() > 0
    }

    /// Where unit `index` stands on the tile at `coord`
    ///
    /// Units fan out horizontally around the tile centre.
    pub fn unit_position(&self, layout: &HexLayout, coord: HexCoord, index: usize, spacing: f32) -> Vec2 {
        let spread = (self.units.len().max(1) - 1) as f32 / 2.0;
        layout.tile_center(coord) + Vec2::new((index as f32 - spread) * spacing, 0.0)
    }

    /// Create standing sprites for units that have none yet
    pub fn add_sprites(
        &mut self,
        sprites: &mut SpriteManager,
        assets: &dyn AssetProvider,
        layout: &HexLayout,
        spacing: f32,
    ) -> Result<()> {
        for index in 0..self.units.len() {
            if self.units[index].sprite.is_some() {
                continue;
            }
            let position = self.unit_position(layout, self.coord, index, spacing);
            let unit = &self.units[index];
            let component = assets.component(&unit.stand_component_name(unit.facing))?;
            let handle = sprites.create_with_component(position, z_group::UNIT, component, STAND_ANCHOR)?;
            self.units[index].sprite = Some(handle);
        }
        Ok(())
    }

    /// Move one tile towards `target`
    ///
    /// Fails without touching any state if the group is still moving, the
    /// target is off the map or not adjacent, or a unit's assets are missing.
    pub fn move_to(&mut self, target: HexCoord, ctx: &mut MoveContext<'_>) -> Result<GroupMove> {
        if self.in_transit() {
            return Err(GameError::UnitGroupInTransit(self.id));
        }
        let to = ctx.map.tile(&target)?.coord;
        let (dx, dy) = ctx.map.step_between(&self.coord, &to).ok_or(GameError::NotAdjacent {
            from_x: self.coord.x,
            from_y: self.coord.y,
            x: target.x,
            y: target.y,
        })?;
        let direction = Direction::from_delta(dx, dy).ok_or(GameError::NotAdjacent {
            from_x: self.coord.x,
            from_y: self.coord.y,
            x: target.x,
            y: target.y,
        })?;

        let facing = Facing::for_direction(direction);
        let speed = ctx.params.base_speed * ctx.layout.speed_multiplier(direction);
        let mut walks: Vec<(Rc<Animation>, Rc<SpriteComponent>)> = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            let walk = ctx.assets.animation(&unit.walk_animation_name(facing))?;
            let resting = ctx.assets.component(&unit.stand_component_name(facing))?;
            // Settling happens on arrival, long after this call returns
            resting.get_anchor(STAND_ANCHOR)?;
            walks.push((walk, resting));
        }

        let from = self.coord;
        // Walk to the unwrapped neighbour so a seam crossing looks like one step
        let visual_target = from.offset(dx, dy);
        let spacing = ctx.params.unit_spacing;
        let stagger = ctx.params.stagger_delay;

        self.coord = to;
        for (index, (walk, resting)) in walks.into_iter().enumerate() {
            let destination = self.unit_position(ctx.layout, visual_target, index, spacing);
            let settled = self.unit_position(ctx.layout, to, index, spacing);
            let unit = &mut self.units[index];
            unit.facing = facing;
            let Some(handle) = unit.sprite.filter(|h| ctx.sprites.contains(*h)) else {
                continue;
            };

            let delay: Seconds = if stagger > 0.0 {
                ctx.rng.gen_range(0.0..stagger)
            } else {
                0.0
            };
            self.pending.set(self.pending.get() + 1);
            let pending = self.pending.clone();
            let callbacks = CallbackRegistry::new().on_complete(move |sprites, done| {
                let start = sprites.sprite(done.sprite)?.position();
                let engine = MoveWithAnimationEngine::new(MoveEngine::new(start, destination, speed), walk)
                    .with_resting(resting, STAND_ANCHOR);
                let arrived = pending.clone();
                let arrival = CallbackRegistry::new().on_complete(move |sprites, done| {
                    arrived.set(arrived.get().saturating_sub(1));
                    sprites.set_position(done.sprite, settled)
                });
                let started = sprites.start_transition(
                    done.sprite,
                    TransitionEngine::MoveWithAnimation(engine),
                    done.overshoot,
                    arrival,
                );
                if started.is_err() {
                    pending.set(pending.get().saturating_sub(1));
                }
                started.map(|_| ())
            });
            if let Err(err) = ctx.sprites.delay(handle, delay, 0.0, callbacks) {
                self.pending.set(self.pending.get().saturating_sub(1));
                return Err(err);
            }
        }

        tracing::debug!(
            group = ?self.id,
            ?from,
            ?to,
            ?direction,
            walking = self.pending.get(),
            "Group move started"
        );
        Ok(GroupMove { from, to, direction })
    }
}

/// Every unit group in the session
#[derive(Debug, Default)]
pub struct UnitSet {
    groups: Vec<UnitGroup>,
    next_id: u32,
}

impl UnitSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group of units named by asset family
    pub fn new_group<S: Into<String>>(&mut self, coord: HexCoord, names: impl IntoIterator<Item = S>) -> GroupId {
        let id = GroupId::new(self.next_id);
        self.next_id += 1;
        let mut group = UnitGroup::new(id, coord);
        for name in names {
            group.add_unit(Unit::new(name));
        }
        self.groups.push(group);
        id
    }

    pub fn group(&self, id: GroupId) -> Result<&UnitGroup> {
        self.groups
            .iter()
            .find(|g| g.id == id)
            .ok_or(GameError::UnitGroupNotFound(id))
    }

    pub fn group_mut(&mut self, id: GroupId) -> Result<&mut UnitGroup> {
        self.groups
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(GameError::UnitGroupNotFound(id))
    }

    pub fn groups(&self) -> &[UnitGroup] {
        &self.groups
    }

    pub fn groups_at(&self, coord: HexCoord) -> impl Iterator<Item = &UnitGroup> {
        self.groups.iter().filter(move |g| g.coord == coord)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn add_sprites(
        &mut self,
        sprites: &mut SpriteManager,
        assets: &dyn AssetProvider,
        layout: &HexLayout,
        spacing: f32,
    ) -> Result<()> {
        for group in &mut self.groups {
            group.add_sprites(sprites, assets, layout, spacing)?;
        }
        Ok(())
    }

    pub fn move_group(&mut self, id: GroupId, target: HexCoord, ctx: &mut MoveContext<'_>) -> Result<GroupMove> {
        self.group_mut(id)?.move_to(target, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{TileGeometry, UnitParams};
    use crate::renderer::sprites::atlas::{SpriteAtlas, SpriteRegion};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn atlas() -> SpriteAtlas {
        let mut atlas = SpriteAtlas::new(256, 256);
        for (i, suffix) in ["left", "right"].into_iter().enumerate() {
            let y = i as u32 * 24;
            atlas.add_component(
                SpriteComponent::new(format!("unit.knight.stand_{suffix}"), SpriteRegion::new(0, y, 16, 24))
                    .with_anchor(STAND_ANCHOR, 8.0, 22.0),
            );
            for frame in 1..=2 {
                atlas.add_component(
                    SpriteComponent::new(
                        format!("unit.knight.walk_{suffix}.{frame}"),
                        SpriteRegion::new(16 * frame, y, 16, 24),
                    )
                    .with_anchor(STAND_ANCHOR, 8.0, 22.0),
                );
            }
            let stages: Vec<(String, f32, String)> = (1..=2)
                .map(|frame| (format!("unit.knight.walk_{suffix}.{frame}"), 0.2, STAND_ANCHOR.to_string()))
                .collect();
            atlas
                .add_animation(&format!("unit.knight.walk_{suffix}"), &stages)
                .unwrap();
        }
        atlas
    }

    struct World {
        map: TileMap,
        layout: HexLayout,
        sprites: SpriteManager,
        atlas: SpriteAtlas,
        params: UnitParams,
        rng: ChaCha8Rng,
        units: UnitSet,
    }

    impl World {
        fn new(start: HexCoord, names: &[&str]) -> Self {
            let mut world = Self {
                map: TileMap::generate_square(14, 14),
                layout: HexLayout::new(TileGeometry::default()),
                sprites: SpriteManager::new(),
                atlas: atlas(),
                params: UnitParams::default(),
                rng: ChaCha8Rng::seed_from_u64(5),
                units: UnitSet::new(),
            };
            world.units.new_group(start, names.iter().copied());
            world
                .units
                .add_sprites(&mut world.sprites, &world.atlas, &world.layout, world.params.unit_spacing)
                .unwrap();
            world
        }

        fn move_group(&mut self, target: HexCoord) -> Result<GroupMove> {
            let mut ctx = MoveContext {
                map: &self.map,
                layout: &self.layout,
                sprites: &mut self.sprites,
                assets: &self.atlas,
                params: &self.params,
                rng: &mut self.rng,
            };
            self.units.move_group(GroupId(0), target, &mut ctx)
        }

        fn group(&self) -> &UnitGroup {
            self.units.group(GroupId(0)).unwrap()
        }

        fn run_until_arrived(&mut self) -> usize {
            let mut ticks = 0;
            while self.group().in_transit() && ticks < 400 {
                self.sprites.tick(0.05);
                ticks += 1;
            }
            ticks
        }
    }

    #[test]
    fn test_facing_table() {
        assert_eq!(Facing::for_direction(Direction::NorthEast), Facing::Right);
        assert_eq!(Facing::for_direction(Direction::SouthEast), Facing::Right);
        assert_eq!(Facing::for_direction(Direction::North), Facing::Right);
        assert_eq!(Facing::for_direction(Direction::SouthWest), Facing::Left);
        assert_eq!(Facing::for_direction(Direction::NorthWest), Facing::Left);
        assert_eq!(Facing::for_direction(Direction::South), Facing::Left);
    }

    #[test]
    fn test_units_fan_out() {
        let world = World::new(HexCoord::new(0, 0), &["knight", "knight", "knight"]);
        let center = world.layout.tile_center(HexCoord::new(0, 0));
        let group = world.group();
        assert_eq!(group.unit_position(&world.layout, group.coord(), 1, 12.0), center);
        assert_eq!(
            group.unit_position(&world.layout, group.coord(), 0, 12.0),
            center - Vec2::new(12.0, 0.0)
        );
        for unit in group.units() {
            let sprite = world.sprites.sprite(unit.sprite.unwrap()).unwrap();
            assert_eq!(sprite.component_name(), Some("unit.knight.stand_right"));
        }
    }

    #[test]
    fn test_move_walks_and_arrives() {
        let mut world = World::new(HexCoord::new(0, 0), &["knight", "knight"]);
        let moved = world.move_group(HexCoord::new(-1, 0)).unwrap();
        assert_eq!(moved.direction, Direction::SouthWest);
        assert_eq!(moved.to, HexCoord::new(-1, 0));
        assert!(world.group().in_transit());
        assert_eq!(world.group().coord(), HexCoord::new(-1, 0));

        // A second move is refused while walking
        assert!(matches!(
            world.move_group(HexCoord::new(-2, 0)),
            Err(GameError::UnitGroupInTransit(_))
        ));

        world.run_until_arrived();
        assert!(!world.group().in_transit());
        let group = world.group();
        for (index, unit) in group.units().iter().enumerate() {
            assert_eq!(unit.facing, Facing::Left);
            let sprite = world.sprites.sprite(unit.sprite.unwrap()).unwrap();
            assert_eq!(
                sprite.position(),
                group.unit_position(&world.layout, HexCoord::new(-1, 0), index, 12.0)
            );
            assert_eq!(sprite.component_name(), Some("unit.knight.stand_left"));
            assert!(sprite.engines().is_empty());
        }
    }

    #[test]
    fn test_units_walk_mid_move() {
        let mut world = World::new(HexCoord::new(0, 0), &["knight"]);
        world.move_group(HexCoord::new(0, 1)).unwrap();
        // Past the longest stagger, short of arrival
        for _ in 0..8 {
            world.sprites.tick(0.05);
        }
        let handle = world.group().units()[0].sprite.unwrap();
        let sprite = world.sprites.sprite(handle).unwrap();
        let name = sprite.component_name().unwrap();
        assert!(name.starts_with("unit.knight.walk_right."), "{name}");
        assert!(world.group().in_transit());
    }

    #[test]
    fn test_move_across_seam_snaps_to_wrapped_tile() {
        let mut world = World::new(HexCoord::new(6, -3), &["knight"]);
        let moved = world.move_group(HexCoord::new(7, -3)).unwrap();
        assert_eq!(moved.to, HexCoord::new(-7, 4));
        world.run_until_arrived();

        let group = world.group();
        assert_eq!(group.coord(), HexCoord::new(-7, 4));
        let sprite = world.sprites.sprite(group.units()[0].sprite.unwrap()).unwrap();
        assert_eq!(sprite.position(), world.layout.tile_center(HexCoord::new(-7, 4)));
    }

    #[test]
    fn test_illegal_moves_leave_state_unchanged() {
        let mut world = World::new(HexCoord::new(0, 0), &["knight"]);
        assert!(matches!(
            world.move_group(HexCoord::new(2, 2)),
            Err(GameError::NotAdjacent { x: 2, y: 2, .. })
        ));
        assert!(matches!(
            world.move_group(HexCoord::new(0, 40)),
            Err(GameError::NoSuchTile { .. })
        ));
        assert!(!world.group().in_transit());
        assert_eq!(world.group().coord(), HexCoord::new(0, 0));
        let handle = world.group().units()[0].sprite.unwrap();
        assert!(world.sprites.sprite(handle).unwrap().engines().is_empty());
    }

    #[test]
    fn test_missing_walk_animation_leaves_state_unchanged() {
        let mut world = World::new(HexCoord::new(0, 0), &["knight"]);
        world.units.group_mut(GroupId(0)).unwrap().add_unit(Unit::new("archer"));
        assert!(matches!(
            world.move_group(HexCoord::new(1, 0)),
            Err(GameError::MissingAnimation(ref name)) if name == "unit.archer.walk_right"
        ));
        assert_eq!(world.group().coord(), HexCoord::new(0, 0));
        assert!(!world.group().in_transit());
    }

    #[test]
    fn test_resting_pose_without_stand_anchor_rejected_up_front() {
        let mut world = World::new(HexCoord::new(0, 0), &["knight"]);
        world.atlas.add_component(SpriteComponent::new(
            "unit.knight.stand_left",
            SpriteRegion::new(0, 0, 16, 24),
        ));
        assert!(matches!(
            world.move_group(HexCoord::new(-1, 0)),
            Err(GameError::MissingAnchor { ref component, ref anchor })
                if component == "unit.knight.stand_left" && anchor == STAND_ANCHOR
        ));
        assert_eq!(world.group().coord(), HexCoord::new(0, 0));
        assert!(!world.group().in_transit());
        let handle = world.group().units()[0].sprite.unwrap();
        assert!(world.sprites.sprite(handle).unwrap().engines().is_empty());

        // Moves the other way still use the intact right-facing pose
        world.move_group(HexCoord::new(1, 0)).unwrap();
        world.run_until_arrived();
        assert!(!world.group().in_transit());
        assert_eq!(world.group().coord(), HexCoord::new(1, 0));
    }

    #[test]
    fn test_group_without_sprites_moves_instantly() {
        let mut world = World::new(HexCoord::new(0, 0), &["knight"]);
        let hidden = world.units.new_group(HexCoord::new(0, 0), ["knight"]);
        let mut ctx = MoveContext {
            map: &world.map,
            layout: &world.layout,
            sprites: &mut world.sprites,
            assets: &world.atlas,
            params: &world.params,
            rng: &mut world.rng,
        };
        let moved = world.units.move_group(hidden, HexCoord::new(1, 0), &mut ctx).unwrap();
        assert_eq!(moved.to, HexCoord::new(1, 0));

        let group = world.units.group(hidden).unwrap();
        assert_eq!(group.coord(), HexCoord::new(1, 0));
        assert!(!group.in_transit());
        assert_eq!(group.units()[0].facing, Facing::Right);
    }

    #[test]
    fn test_unknown_group() {
        let mut world = World::new(HexCoord::new(0, 0), &["knight"]);
        let mut ctx = MoveContext {
            map: &world.map,
            layout: &world.layout,
            sprites: &mut world.sprites,
            assets: &world.atlas,
            params: &world.params,
            rng: &mut world.rng,
        };
        assert!(matches!(
            world.units.move_group(GroupId(9), HexCoord::new(1, 0), &mut ctx),
            Err(GameError::UnitGroupNotFound(GroupId(9)))
        ));
    }
}
