//! Demo tiles for the simulated host.

use quickset_core::{
    EventDistributor, ExtensionTileFactory, LiveTile, PlatformTile, PlatformTileAdapter, QsPanel,
    TileContext, TileError, TileEvent,
};
use quickset_signals::TileIdentity;

/// Platform specs the adapter knows how to wrap
const KNOWN_AOSP_SPECS: &[&str] = &[
    "wifi", "bt", "cell", "airplane", "flashlight", "rotation", "dnd", "location", "hotspot",
    "inversion", "saver", "work", "cast",
];

/// Stand-in for the host's native tile object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeTile {
    spec: String,
}

impl NativeTile {
    pub fn new(spec: &str) -> Self {
        Self {
            spec: spec.to_string(),
        }
    }

    pub fn label(&self) -> String {
        self.spec.trim_start_matches("gb_tile_").replace('_', " ")
    }
}

/// Live tile that follows its own events on the distributor
struct DemoTile {
    identity: TileIdentity,
    native: NativeTile,
    epoch: u64,
}

impl DemoTile {
    fn attach(
        identity: TileIdentity,
        native: NativeTile,
        ctx: &TileContext<'_>,
    ) -> Result<Self, TileError> {
        let own = identity.clone();
        ctx.distributor.subscribe(Some(identity.clone()), move |e: &TileEvent| {
            if e.source == own {
                log::debug!("Tile {}: {:?}", own, e.kind);
            }
        })?;
        Ok(Self {
            identity,
            native,
            epoch: ctx.epoch,
        })
    }
}

impl LiveTile<NativeTile> for DemoTile {
    fn handle(&self) -> NativeTile {
        self.native.clone()
    }

    fn handle_destroy(&mut self) -> Result<(), TileError> {
        log::debug!("Tile {}: destroyed (generation {})", self.identity, self.epoch);
        Ok(())
    }
}

pub struct AospTileAdapter;

impl PlatformTileAdapter<NativeTile> for AospTileAdapter {
    fn wrap(
        &self,
        ctx: &TileContext<'_>,
        aosp_key: &str,
        native: &NativeTile,
    ) -> Result<Option<PlatformTile<NativeTile>>, TileError> {
        if !KNOWN_AOSP_SPECS.contains(&aosp_key) {
            return Ok(None);
        }
        let key = format!("aosp_tile_{}", aosp_key);
        let tile = DemoTile::attach(TileIdentity::platform(key.clone()), native.clone(), ctx)?;
        Ok(Some(PlatformTile {
            key,
            tile: Box::new(tile),
        }))
    }
}

pub struct ExtensionTiles;

impl ExtensionTileFactory<NativeTile> for ExtensionTiles {
    fn create(
        &self,
        ctx: &TileContext<'_>,
        key: &str,
    ) -> Result<Option<Box<dyn LiveTile<NativeTile>>>, TileError> {
        if !ctx.is_extension_tile_enabled(key) {
            return Ok(None);
        }
        let tile = DemoTile::attach(TileIdentity::extension(key), NativeTile::new(key), ctx)?;
        Ok(Some(Box::new(tile)))
    }
}

#[derive(Default)]
pub struct StdoutPanel {
    distributor: Option<EventDistributor>,
    refreshes: u32,
}

impl QsPanel for StdoutPanel {
    fn set_event_distributor(&mut self, distributor: EventDistributor) {
        log::info!("Panel: bound to tile event distributor");
        self.distributor = Some(distributor);
    }

    fn update_resources(&mut self) {
        self.refreshes += 1;
        let subscribers = self
            .distributor
            .as_ref()
            .and_then(|d| d.subscriber_count().ok())
            .unwrap_or(0);
        log::info!(
            "Panel: refresh #{} ({} distributor subscribers)",
            self.refreshes,
            subscribers
        );
    }
}
