//! Tile sprites: created for tiles in view, dropped for tiles out of it.
//!
//! Sea tiles don't animate on their own. Each follows one of a few hidden
//! master sprites that loop the sea animation out of phase with each other.

use glam::Vec2;

use crate::campaign::map::{HexCoord, Terrain, TileMap};
use crate::core::error::Result;
use crate::core::types::{z_group, SpriteHandle};
use crate::renderer::hex::HexLayout;
use crate::renderer::sprites::atlas::{AssetProvider, CENTER_ANCHOR};
use crate::renderer::sprites::instance::Viewport;
use crate::renderer::sprites::manager::SpriteManager;
use crate::worldgen::features::FeatureMap;

/// Overlay drawn on edged, unexplored tiles
pub const SHROUD_COMPONENT: &str = "terrain.shroud";

/// Sprite changes made by one [`TileLayer::refresh`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub created: usize,
    pub deleted: usize,
    pub moved: usize,
}

/// Borrowed state a refresh reads from
pub struct TileView<'a> {
    pub assets: &'a dyn AssetProvider,
    pub features: &'a FeatureMap,
    pub layout: &'a HexLayout,
    pub viewport: Viewport,
}

#[derive(Debug)]
pub struct TileLayer {
    sea_masters: Vec<SpriteHandle>,
}

impl TileLayer {
    /// Start one looping sea master per phase, spread evenly over the cycle
    pub fn new(sprites: &mut SpriteManager, assets: &dyn AssetProvider, phases: u32) -> Result<Self> {
        let animation = assets.animation(Terrain::Sea.component_name())?;
        let phases = phases.max(1);
        let cycle = animation.total_duration();

        let mut sea_masters = Vec::with_capacity(phases as usize);
        for phase in 0..phases {
            let master = sprites.create(Vec2::ZERO, z_group::TILE);
            sprites.sprite_mut(master)?.set_visible(false);
            let offset = cycle * phase as f32 / phases as f32;
            sprites.start_looping_animation(master, animation.clone(), offset)?;
            sea_masters.push(master);
        }
        tracing::debug!(phases, cycle, "Sea masters started");
        Ok(Self { sea_masters })
    }

    pub fn sea_masters(&self) -> &[SpriteHandle] {
        &self.sea_masters
    }

    /// Master sprite a sea tile at `coord` follows
    pub fn sea_master_for(&self, coord: HexCoord) -> Option<SpriteHandle> {
        let phases = self.sea_masters.len() as i32;
        if phases == 0 {
            return None;
        }
        let phase = (coord.x + 2 * coord.y).rem_euclid(phases);
        self.sea_masters.get(phase as usize).copied()
    }

    /// The copy of `coord` around the cylinder nearest the middle of the view
    pub fn display_coord(map: &TileMap, layout: &HexLayout, coord: HexCoord, viewport: Viewport) -> HexCoord {
        let period = map.width as f32 * layout.column_step();
        let view_center = viewport.offset.x + viewport.size.x / 2.0;
        let k = ((view_center - layout.tile_center(coord).x) / period).round() as i32;
        coord.offset(k * map.width, -k * map.width / 2)
    }

    /// Bring tile sprites in line with fog state and the viewport
    ///
    /// Explored tiles in view get a terrain sprite with its features and
    /// locale as children. Edged but unexplored tiles in view get a shroud.
    /// Everything else has its sprites deleted.
    pub fn refresh(&self, map: &mut TileMap, sprites: &mut SpriteManager, view: &TileView<'_>) -> Result<RefreshStats> {
        let mut stats = RefreshStats::default();
        let tile_size = view.layout.tile_size();

        for coord in map.coords() {
            let display = Self::display_coord(map, view.layout, coord, view.viewport);
            let in_view = view
                .viewport
                .intersects(view.layout.tile_origin(display), tile_size);
            let center = view.layout.tile_center(display);
            let tile = map.tile(&coord)?;
            let want_terrain = in_view && tile.explored;
            let want_shroud = in_view && tile.edged && !tile.explored;
            let current_sprite = tile.sprite.filter(|h| sprites.contains(*h));
            let current_shroud = tile.shroud.filter(|h| sprites.contains(*h));

            let sprite = match (want_terrain, current_sprite) {
                (true, Some(handle)) => {
                    stats.moved += Self::place(sprites, handle, center)?;
                    Some(handle)
                }
                (true, None) => {
                    stats.created += 1;
                    Some(self.create_tile_sprite(map, sprites, view, coord, center)?)
                }
                (false, Some(handle)) => {
                    sprites.delete(handle)?;
                    stats.deleted += 1;
                    None
                }
                (false, None) => None,
            };

            let shroud = match (want_shroud, current_shroud) {
                (true, Some(handle)) => {
                    stats.moved += Self::place(sprites, handle, center)?;
                    Some(handle)
                }
                (true, None) => {
                    stats.created += 1;
                    let component = view.assets.component(SHROUD_COMPONENT)?;
                    Some(sprites.create_with_component(center, z_group::OVERLAY, component, CENTER_ANCHOR)?)
                }
                (false, Some(handle)) => {
                    sprites.delete(handle)?;
                    stats.deleted += 1;
                    None
                }
                (false, None) => None,
            };

            if let Some(tile) = map.get_mut(&coord) {
                tile.sprite = sprite;
                tile.shroud = shroud;
            }
        }

        if stats != RefreshStats::default() {
            tracing::debug!(
                created = stats.created,
                deleted = stats.deleted,
                moved = stats.moved,
                "Tile sprites refreshed"
            );
        }
        Ok(stats)
    }

    fn place(sprites: &mut SpriteManager, handle: SpriteHandle, center: Vec2) -> Result<usize> {
        if sprites.sprite(handle)?.position() == center {
            return Ok(0);
        }
        sprites.set_position(handle, center)?;
        Ok(1)
    }

    fn create_tile_sprite(
        &self,
        map: &TileMap,
        sprites: &mut SpriteManager,
        view: &TileView<'_>,
        coord: HexCoord,
        center: Vec2,
    ) -> Result<SpriteHandle> {
        let tile = map.tile(&coord)?;
        // Resolve everything first so a missing asset leaves no partial sprite
        let features = view.features.placements_for(map, coord)?;
        let mut children = Vec::with_capacity(features.len() + 1);
        for feature in features {
            let offset = feature.offset - view.layout.tile_size() / 2.0;
            children.push((view.assets.component(&feature.component)?, offset));
        }
        if let Some(locale) = tile.locale {
            children.push((view.assets.component(locale.component_name())?, Vec2::ZERO));
        }

        let handle = match (tile.terrain.is_animated(), self.sea_master_for(coord)) {
            (true, Some(master)) => {
                let handle = sprites.create(center, z_group::TILE);
                sprites.add_follower(master, handle)?;
                handle
            }
            _ => {
                let name = match tile.terrain {
                    // Without a master a sea tile shows the animation's first frame
                    Terrain::Sea => {
                        let animation = view.assets.animation(tile.terrain.component_name())?;
                        animation
                            .stages
                            .first()
                            .map(|s| s.component.name.clone())
                            .unwrap_or_default()
                    }
                    terrain => terrain.component_name().to_string(),
                };
                let component = view.assets.component(&name)?;
                sprites.create_with_component(center, z_group::TILE, component, CENTER_ANCHOR)?
            }
        };

        for (component, offset) in children {
            let child = sprites.create_with_component(offset, z_group::FEATURE, component, CENTER_ANCHOR)?;
            sprites.add_child(handle, child)?;
        }
        Ok(handle)
    }
}
