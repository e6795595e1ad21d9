//! The game session: owns the map, sprites and units for one run and drives
//! them frame by frame.
//!
//! Every manager is an ordinary field here and is handed to the systems that
//! need it, so there is exactly one of each per session without any global
//! state.

pub mod tiles;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

use crate::campaign::map::{HexCoord, TileMap};
use crate::campaign::visibility::{explore_after_move_to, init_fog, Reveal};
use crate::core::config::GameConfig;
use crate::core::error::{GameError, Result};
use crate::core::types::{GroupId, Seconds, TRANSPARENT};
use crate::renderer::hex::HexLayout;
use crate::renderer::metrics::{FrameClock, FramePace};
use crate::renderer::sprites::atlas::{AssetProvider, SpriteAtlas};
use crate::renderer::sprites::instance::{Renderer, Viewport};
use crate::renderer::sprites::manager::{DrawStats, SpriteManager};
use crate::renderer::sprites::transition::CallbackRegistry;
use crate::units::group::{GroupMove, MoveContext, UnitSet};
use crate::worldgen::features::FeatureMap;
use crate::worldgen::terrain::{TerrainGenerator, TerrainSummary};

pub use tiles::{RefreshStats, TileLayer, TileView, SHROUD_COMPONENT};

/// Where the map is generated from and the first group starts
pub const ORIGIN: HexCoord = HexCoord::new(0, 0);

pub struct GameSession {
    config: GameConfig,
    assets: Box<dyn AssetProvider>,
    features: FeatureMap,
    layout: HexLayout,
    map: TileMap,
    terrain: TerrainSummary,
    sprites: SpriteManager,
    tiles: TileLayer,
    units: UnitSet,
    player: GroupId,
    rng: ChaCha8Rng,
    viewport: Viewport,
    clock: FrameClock,
}

impl GameSession {
    /// Generate a world and populate it
    ///
    /// Any asset or generation failure here is fatal to startup.
    pub fn new(config: GameConfig, assets: Box<dyn AssetProvider>, features: FeatureMap) -> Result<Self> {
        config.validate().map_err(GameError::InvalidConfig)?;
        let seed = config.map.seed;
        let layout = HexLayout::new(config.tiles);

        let mut map = TileMap::generate_square(config.map.width, config.map.height);
        let terrain = TerrainGenerator::new(config.terrain.clone(), seed).generate(&mut map, ORIGIN)?;
        init_fog(&mut map, ORIGIN, config.map.reveal_map)?;

        let mut sprites = SpriteManager::new();
        let tiles = TileLayer::new(&mut sprites, assets.as_ref(), config.map.sea_phases)?;

        let mut units = UnitSet::new();
        let player = units.new_group(ORIGIN, config.units.starting_units.iter().cloned());
        units.add_sprites(&mut sprites, assets.as_ref(), &layout, config.units.unit_spacing)?;

        let view_size = Vec2::new(
            config.display.window_width as f32,
            config.display.window_height as f32,
        ) / config.display.scale;
        let viewport = Viewport::centered_on(layout.tile_center(ORIGIN), view_size);
        let clock = FrameClock::new(config.display.target_frame_rate);

        let mut session = Self {
            config,
            assets,
            features,
            layout,
            map,
            terrain,
            sprites,
            tiles,
            units,
            player,
            rng: ChaCha8Rng::seed_from_u64(seed),
            viewport,
            clock,
        };
        session.refresh_tiles()?;
        session.sprites.refresh_transforms();

        tracing::info!(
            seed,
            width = session.map.width,
            height = session.map.height,
            sprites = session.sprites.len(),
            "Session started"
        );
        Ok(session)
    }

    /// Load atlas and feature metadata from the configured paths, then start
    pub fn load(config: GameConfig) -> Result<Self> {
        let atlas = SpriteAtlas::load_from_file(Path::new(&config.assets.atlas_meta))?;
        let features = FeatureMap::load_from_file(Path::new(&config.assets.feature_meta))?;
        Self::new(config, Box::new(atlas), features)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn map(&self) -> &TileMap {
        &self.map
    }

    pub fn terrain(&self) -> &TerrainSummary {
        &self.terrain
    }

    pub fn layout(&self) -> &HexLayout {
        &self.layout
    }

    pub fn sprites(&self) -> &SpriteManager {
        &self.sprites
    }

    pub fn units(&self) -> &UnitSet {
        &self.units
    }

    pub fn tiles(&self) -> &TileLayer {
        &self.tiles
    }

    /// The group created at the origin on startup
    pub fn player_group(&self) -> GroupId {
        self.player
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Centre the view on a tile
    pub fn center_on(&mut self, coord: HexCoord) {
        self.viewport = Viewport::centered_on(self.layout.tile_center(coord), self.viewport.size);
    }

    pub fn frame_clock(&self) -> &FrameClock {
        &self.clock
    }

    fn refresh_tiles(&mut self) -> Result<RefreshStats> {
        let view = TileView {
            assets: self.assets.as_ref(),
            features: &self.features,
            layout: &self.layout,
            viewport: self.viewport,
        };
        self.tiles.refresh(&mut self.map, &mut self.sprites, &view)
    }

    /// Advance the world by `dt`
    ///
    /// Transitions run first, so fog changes they cause are visible to the
    /// tile refresh in the same frame.
    pub fn tick(&mut self, dt: Seconds) -> Result<()> {
        self.sprites.tick(dt);
        self.refresh_tiles()?;
        self.sprites.refresh_transforms();
        Ok(())
    }

    /// Tick and draw one frame, timing it against the target frame rate
    pub fn frame(&mut self, dt: Seconds, renderer: &mut dyn Renderer) -> Result<(DrawStats, FramePace)> {
        self.clock.begin_frame();
        self.tick(dt)?;
        let stats = self.draw(renderer);
        Ok((stats, self.clock.end_frame()))
    }

    pub fn draw(&mut self, renderer: &mut dyn Renderer) -> DrawStats {
        self.sprites.draw(renderer)
    }

    /// Order a group one tile towards `target`
    ///
    /// Illegal moves are logged and dropped, returning `Ok(None)`. Anything
    /// else that goes wrong is an asset or data fault and is returned.
    pub fn command_move(&mut self, group: GroupId, target: HexCoord) -> Result<Option<GroupMove>> {
        let mut ctx = MoveContext {
            map: &self.map,
            layout: &self.layout,
            sprites: &mut self.sprites,
            assets: self.assets.as_ref(),
            params: &self.config.units,
            rng: &mut self.rng,
        };
        let moved = match self.units.move_group(group, target, &mut ctx) {
            Ok(moved) => moved,
            Err(err) if err.is_illegal_action() => {
                tracing::warn!(group = ?group, ?target, error = %err, "Dropping illegal move");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let update = explore_after_move_to(&mut self.map, moved.to)?;
        for reveal in update.explored {
            self.lift_shroud(reveal)?;
        }
        Ok(Some(moved))
    }

    /// Fade a revealed tile's shroud while sliding it away from the mover
    fn lift_shroud(&mut self, reveal: Reveal) -> Result<()> {
        let Some(shroud) = self
            .map
            .get_mut(&reveal.coord)
            .and_then(|tile| tile.shroud.take())
        else {
            return Ok(());
        };
        if !self.sprites.contains(shroud) {
            return Ok(());
        }

        let duration = self.config.units.reveal_duration;
        let (dx, dy) = reveal.direction.delta();
        let drift = (self.layout.tile_center(HexCoord::new(dx, dy)) - self.layout.tile_center(ORIGIN)) / 2.0;
        if duration > 0.0 {
            let destination = self.sprites.sprite(shroud)?.position() + drift;
            let speed = drift.length() / duration;
            self.sprites
                .move_to(shroud, destination, speed, 0.0, CallbackRegistry::new())?;
        }
        let remove = CallbackRegistry::new().on_complete(|sprites, done| sprites.delete(done.sprite));
        self.sprites.fade_to(shroud, TRANSPARENT, duration, 0.0, remove)?;
        Ok(())
    }

    /// The tile under a point in window coordinates, if there is one
    pub fn tile_at_screen(&self, screen: Vec2) -> Option<HexCoord> {
        let world = self.viewport.to_world(screen);
        let coord = self.layout.tile_at(world);
        self.map.get(&coord).map(|tile| tile.coord)
    }
}
