//! Quick-settings tile reconciliation engine.
//!
//! Merges host platform tiles with extension tiles into a single
//! user-ordered tile set, rebuilding it every time the host's tile
//! configuration changes.

pub mod tile;
pub use tile::{
    ExtensionTileFactory, LiveTile, ManagedTile, PlatformTile, PlatformTileAdapter, TileContext,
    TileError, EXTENSION_TILE_KEYS,
};

pub mod distributor;
pub use distributor::{DistributorError, EventDistributor, SubscriptionId, TileEventObserver};

pub mod order;
pub use order::{
    namespace_collisions, order_tiles, CommitPlan, ExtensionEntry, PlatformEntry, PreferredOrder,
};

pub mod host;
pub use host::{HostTileMap, TileHost, TilesChangedCallback};

pub mod panel;
pub use panel::QsPanel;

pub mod pulldown;
pub use pulldown::QuickPulldownHandler;

pub mod registry;
pub use registry::{RegistryError, TileRegistry, TuningOutcome, TILES_SETTING};

// Re-export shared value types from signals
pub use quickset_signals::{Namespace, TileEvent, TileEventKind, TileIdentity};
