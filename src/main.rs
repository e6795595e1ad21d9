//! Ascension - headless runner
//!
//! Generates a map, walks the starting group around and logs what would have
//! been drawn. Useful for profiling and for checking asset metadata.

use ascension::campaign::map::Direction;
use ascension::core::config::GameConfig;
use ascension::core::error::Result;
use ascension::renderer::metrics::FramePace;
use ascension::renderer::sprites::{Renderer, SpriteQuad, Viewport};
use ascension::session::GameSession;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ascension")]
#[command(about = "Run the game core without a window and report render statistics")]
struct Args {
    /// TOML config file; missing means defaults
    #[arg(long, default_value = "ascension.toml")]
    config: PathBuf,

    /// Override the map seed
    #[arg(long)]
    seed: Option<u64>,

    /// Frames to simulate
    #[arg(long, default_value_t = 600)]
    ticks: u32,
}

/// Counts what a real renderer would have drawn
struct HeadlessRenderer {
    viewport: Viewport,
    quads: usize,
    batches: usize,
}

impl Renderer for HeadlessRenderer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn atlas_size(&self) -> (u32, u32) {
        (1024, 1024)
    }

    fn draw_batch(&mut self, _z_group: i32, quads: &[SpriteQuad]) {
        self.quads += quads.len();
        self.batches += 1;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = GameConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.map.seed = seed;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    tracing::info!("Ascension starting...");
    let dt = 1.0 / config.display.target_frame_rate as f32;
    let mut session = GameSession::load(config)?;
    let group = session.player_group();

    // Walk a small loop, one step whenever the group comes to rest
    let route = [
        Direction::NorthEast,
        Direction::North,
        Direction::NorthWest,
        Direction::SouthWest,
        Direction::South,
        Direction::SouthEast,
    ];
    let mut step = 0;
    let mut renderer = HeadlessRenderer {
        viewport: session.viewport(),
        quads: 0,
        batches: 0,
    };

    for _ in 0..args.ticks {
        let current = session.units().group(group)?;
        if !current.in_transit() {
            let (dx, dy) = route[step % route.len()].delta();
            let target = current.coord().offset(dx, dy);
            if let Some(moved) = session.command_move(group, target)? {
                tracing::debug!(to = ?moved.to, "Group moving");
                session.center_on(moved.to);
                step += 1;
            }
        }

        renderer.viewport = session.viewport();
        let (_, pace) = session.frame(dt, &mut renderer)?;
        if pace == FramePace::Critical {
            tracing::warn!("Frame budget blown, consider a smaller map");
        }
    }

    let clock = session.frame_clock();
    let explored = session.map().tiles().filter(|t| t.explored).count();
    tracing::info!(
        ticks = args.ticks,
        moves = step,
        explored,
        sprites = session.sprites().len(),
        quads = renderer.quads,
        batches = renderer.batches,
        avg_frame_ms = clock.avg_frame_time_ms(),
        max_frame_ms = clock.max_frame_time_ms(),
        "Run finished"
    );
    Ok(())
}
