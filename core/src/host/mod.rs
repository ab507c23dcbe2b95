pub mod tile_map;
pub use tile_map::{HostTileMap, TilesChangedCallback};

use crate::order::CommitPlan;
use crate::registry::RegistryError;

/// The host shell's live tile state, as seen by the tile registry.
///
/// The host owns its tile map; the registry only reads it before building a
/// generation and replaces it wholesale on commit.
pub trait TileHost {
    /// Native tile handle stored in the host map
    type Handle: Clone;

    /// Current `(spec, handle)` entries, in host iteration order
    fn native_tiles(&self) -> Vec<(String, Self::Handle)>;

    /// Instantiate native tiles for the given comma-delimited spec list
    fn instantiate_native_tiles(&mut self, specs: Option<&str>) -> Result<(), RegistryError>;

    /// Clear the tile map and the parallel tile spec list
    fn clear_tiles(&mut self);

    /// Replace the tile map contents with `plan`, preserving plan order as
    /// iteration order. The tile spec list is left alone.
    fn install_tiles(&mut self, plan: &CommitPlan<Self::Handle>) -> Result<(), RegistryError>;

    /// Fire every registered "tiles changed" callback in registration order
    fn notify_tiles_changed(&mut self);
}
