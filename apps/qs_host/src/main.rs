use clap::Parser;
use std::path::PathBuf;

mod tiles;

use quickset_core::{HostTileMap, TileEvent, TileRegistry, TuningOutcome, TILES_SETTING};
use quickset_signals::TileIdentity;
use tiles::{AospTileAdapter, ExtensionTiles, NativeTile, StdoutPanel};

/// Simulated quick-settings host: instantiates native tiles from a spec
/// list, runs the tile registry and prints the committed order.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Native tile spec list, as the host's tile setting would carry it
    #[arg(long, default_value = "wifi,bt,cell,flashlight,rotation,custom(com.example/.Tile)")]
    specs: String,

    /// Preferred order; overrides the config file
    #[arg(long)]
    order: Option<String>,

    /// Explicit config file instead of the usual search paths
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of times to fire the tile setting change
    #[arg(long, default_value_t = 1)]
    rebuilds: u32,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => quickset_config::load_settings_from(path)?,
        None => quickset_config::load_settings()?,
    }
    .with_order_override(args.order.clone());

    let mut host = HostTileMap::new(|spec: &str| Some(NativeTile::new(spec)));
    host.add_callback(|| log::info!("Host: tiles changed"));

    let mut registry = TileRegistry::new(settings, AospTileAdapter, ExtensionTiles)
        .with_panel(StdoutPanel::default());

    for _ in 0..args.rebuilds {
        match registry.on_tuning_changed(&mut host, TILES_SETTING, Some(&args.specs)) {
            TuningOutcome::Rebuilt(plan) => {
                println!("generation {}:", registry.epoch().unwrap_or_default());
                for (i, (key, tile)) in plan.iter().enumerate() {
                    println!("  {:>2}. {:<32} {}", i + 1, key, tile.label());
                }
            }
            TuningOutcome::Failed => anyhow::bail!("tile rebuild failed, see log"),
            TuningOutcome::Ignored => {}
        }
    }

    if let Some(distributor) = registry.event_distributor() {
        let event = TileEvent::state_changed(TileIdentity::extension("gb_tile_torch"));
        let delivered = distributor.publish(&event)?;
        println!("published {} to {} observer(s)", event.to_json()?, delivered);
    }
    if let Some(pulldown) = registry.pulldown_handler() {
        println!(
            "quick pulldown {:?}, engages at right edge: {}",
            pulldown.settings().mode,
            pulldown.engages_at(0.95)
        );
    }

    registry.shutdown();
    Ok(())
}
