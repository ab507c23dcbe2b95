//! Tile model
//!
//! A host tile set is built from two independently keyed namespaces:
//! - **Platform** tiles the host shell instantiates from its spec list. The
//!   platform adapter wraps them; the host spec string (`aosp_key`) stays the
//!   commit key while the wrapper's `key` is what the preferred order names.
//! - **Extension** tiles built by the extension factory from a fixed catalog.
//!   Their catalog key is both identity and commit key.

use crate::distributor::{DistributorError, EventDistributor};
use quickset_config::QsSettings;
use quickset_signals::{Namespace, TileIdentity};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Catalog of extension tile keys. Order here only decides the placement of
/// leftover extension tiles; the preferred order drives everything else.
pub const EXTENSION_TILE_KEYS: &[&str] = &[
    "gb_tile_nfc",
    "gb_tile_gps_slimkat",
    "gb_tile_gps_alt",
    "gb_tile_ringer_mode",
    "gb_tile_volume",
    "gb_tile_network_mode",
    "gb_tile_smart_radio",
    "gb_tile_sync",
    "gb_tile_torch",
    "gb_tile_sleep",
    "gb_tile_stay_awake",
    "gb_tile_quickrecord",
    "gb_tile_quickapp",
    "gb_tile_quickapp2",
    "gb_tile_quickapp3",
    "gb_tile_quickapp4",
    "gb_tile_expanded_desktop",
    "gb_tile_screenshot",
    "gb_tile_gravitybox",
    "gb_tile_usb_tether",
    "gb_tile_music",
    "gb_tile_lock_screen",
    "gb_tile_quiet_hours",
    "gb_tile_compass",
    "gb_tile_bt_tethering",
];

#[derive(thiserror::Error, Debug)]
pub enum TileError {
    #[error("tile '{key}' failed to construct: {reason}")]
    Construction { key: String, reason: String },

    #[error("tile '{key}' failed to destroy: {reason}")]
    Destroy { key: String, reason: String },

    #[error("tile '{key}' panicked during {phase}")]
    Panicked { key: String, phase: &'static str },

    #[error(transparent)]
    Distributor(#[from] DistributorError),
}

/// A constructed, stateful tile instance.
///
/// `H` is the host's native tile handle, the value stored in the host tile
/// map under the tile's commit key.
pub trait LiveTile<H> {
    /// Native handle committed into the host map
    fn handle(&self) -> H;

    /// Release subscriptions, timers and anything else the tile owns.
    /// Called exactly once, when the tile's generation is torn down.
    fn handle_destroy(&mut self) -> Result<(), TileError>;
}

/// Shared context handed to both factories during a rebuild
pub struct TileContext<'a> {
    pub settings: &'a QsSettings,
    pub distributor: &'a EventDistributor,
    /// Generation being built
    pub epoch: u64,
}

impl<'a> TileContext<'a> {
    pub fn is_extension_tile_enabled(&self, key: &str) -> bool {
        self.settings.is_extension_tile_enabled(key)
    }
}

/// Result of wrapping a native tile
pub struct PlatformTile<H> {
    /// Key the preferred order uses for this tile (e.g. `aosp_tile_wifi`)
    pub key: String,
    pub tile: Box<dyn LiveTile<H>>,
}

/// Wraps host-native tiles into the identity model.
pub trait PlatformTileAdapter<H> {
    /// Returns `Ok(None)` when the native tile type is not supported; the
    /// raw entry is then kept as a leftover.
    fn wrap(
        &self,
        ctx: &TileContext<'_>,
        aosp_key: &str,
        native: &H,
    ) -> Result<Option<PlatformTile<H>>, TileError>;
}

/// Builds extension tiles from catalog keys.
pub trait ExtensionTileFactory<H> {
    /// Returns `Ok(None)` when the tile is switched off; such keys are
    /// omitted entirely rather than treated as leftovers.
    fn create(
        &self,
        ctx: &TileContext<'_>,
        key: &str,
    ) -> Result<Option<Box<dyn LiveTile<H>>>, TileError>;
}

/// A live tile tagged with the namespace it came from
pub enum ManagedTile<H> {
    Platform {
        key: String,
        aosp_key: String,
        handle: H,
        tile: Box<dyn LiveTile<H>>,
    },
    Extension {
        key: String,
        handle: H,
        tile: Box<dyn LiveTile<H>>,
    },
}

impl<H> ManagedTile<H> {
    pub fn namespace(&self) -> Namespace {
        match self {
            ManagedTile::Platform { .. } => Namespace::Platform,
            ManagedTile::Extension { .. } => Namespace::Extension,
        }
    }

    /// Key named by the preferred order
    pub fn identity_key(&self) -> &str {
        match self {
            ManagedTile::Platform { key, .. } | ManagedTile::Extension { key, .. } => key,
        }
    }

    /// Key the tile is stored under in the host map
    pub fn commit_key(&self) -> &str {
        match self {
            ManagedTile::Platform { aosp_key, .. } => aosp_key,
            ManagedTile::Extension { key, .. } => key,
        }
    }

    pub fn identity(&self) -> TileIdentity {
        TileIdentity {
            namespace: self.namespace(),
            key: self.identity_key().to_string(),
        }
    }

    pub fn handle(&self) -> &H {
        match self {
            ManagedTile::Platform { handle, .. } | ManagedTile::Extension { handle, .. } => handle,
        }
    }

    pub fn destroy(&mut self) -> Result<(), TileError> {
        match self {
            ManagedTile::Platform { tile, .. } | ManagedTile::Extension { tile, .. } => {
                tile.handle_destroy()
            }
        }
    }
}

/// Run a tile hook, turning a panic into [`TileError::Panicked`]
pub(crate) fn guarded<R>(
    key: &str,
    phase: &'static str,
    f: impl FnOnce() -> Result<R, TileError>,
) -> Result<R, TileError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(_) => Err(TileError::Panicked {
            key: key.to_string(),
            phase,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct NullTile(String);

    impl LiveTile<String> for NullTile {
        fn handle(&self) -> String {
            self.0.clone()
        }
        fn handle_destroy(&mut self) -> Result<(), TileError> {
            Err(TileError::Destroy {
                key: self.0.clone(),
                reason: "already gone".to_string(),
            })
        }
    }

    #[test]
    fn test_platform_keys() {
        let t = ManagedTile::Platform {
            key: "aosp_tile_wifi".to_string(),
            aosp_key: "wifi".to_string(),
            handle: "native:wifi".to_string(),
            tile: Box::new(NullTile("native:wifi".to_string())),
        };
        assert_eq!(t.identity_key(), "aosp_tile_wifi");
        assert_eq!(t.commit_key(), "wifi");
        assert_eq!(t.identity(), TileIdentity::platform("aosp_tile_wifi"));
        assert_eq!(t.handle(), "native:wifi");
    }

    #[test]
    fn test_extension_keys() {
        let mut t = ManagedTile::Extension {
            key: "gb_tile_sync".to_string(),
            handle: "ext:gb_tile_sync".to_string(),
            tile: Box::new(NullTile("ext:gb_tile_sync".to_string())),
        };
        assert_eq!(t.identity_key(), t.commit_key());
        assert_eq!(t.namespace(), Namespace::Extension);
        assert!(matches!(t.destroy(), Err(TileError::Destroy { .. })));
    }

    #[test]
    fn test_guarded_catches_panic() {
        let r: Result<(), TileError> = guarded("gb_tile_torch", "create", || panic!("boom"));
        assert!(matches!(
            r,
            Err(TileError::Panicked { ref key, phase: "create" }) if key == "gb_tile_torch"
        ));
    }

    #[test]
    fn test_catalog_has_no_duplicates() {
        let unique: HashSet<_> = EXTENSION_TILE_KEYS.iter().collect();
        assert_eq!(unique.len(), EXTENSION_TILE_KEYS.len());
    }
}
