//! Tile Registry
//!
//! Drives the rebuild lifecycle of the quick-settings tile set. Each time the
//! host's tile setting changes:
//!
//! 1. [`TileRegistry::prepare`] destroys the current generation and clears
//!    the host tile map.
//! 2. The host instantiates its native tiles.
//! 3. [`TileRegistry::rebuild`] wraps the native tiles, builds extension
//!    tiles, orders everything, commits the plan into the host and fires the
//!    host callbacks.
//!
//! [`TileRegistry::on_tuning_changed`] runs all three and never lets an error
//! or a panic escape to the host.
//!
//! ## Threading
//! Rebuilds run to completion on the caller's thread. The registry does not
//! serialize triggers; the host must only call it from one context at a
//! time. A rebuild that finds a generation still current treats it as a new
//! teardown + rebuild cycle.

use crate::distributor::{DistributorError, EventDistributor};
use crate::host::TileHost;
use crate::order::{
    namespace_collisions, order_tiles, CommitPlan, ExtensionEntry, PlatformEntry, PreferredOrder,
};
use crate::panel::QsPanel;
use crate::pulldown::QuickPulldownHandler;
use crate::tile::{
    guarded, ExtensionTileFactory, ManagedTile, PlatformTileAdapter, TileContext,
    EXTENSION_TILE_KEYS,
};
use quickset_config::QsSettings;
use quickset_signals::{Namespace, TileEvent, TileEventKind, TileIdentity};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Host tuning key that carries the native tile spec list
pub const TILES_SETTING: &str = "sysui_qs_tiles";

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("event distributor error: {0}")]
    Distributor(#[from] DistributorError),

    #[error("host rejected tile commit: {0}")]
    Host(String),

    #[error("duplicate commit key '{0}'")]
    DuplicateCommitKey(String),
}

/// Outcome of a host tuning change
#[derive(Debug)]
pub enum TuningOutcome<H> {
    /// Setting key is not the tile setting
    Ignored,
    /// Tiles rebuilt and committed
    Rebuilt(CommitPlan<H>),
    /// Rebuild aborted; the error was logged
    Failed,
}

/// The live tiles of one rebuild cycle
struct Generation<H> {
    epoch: u64,
    tiles: Vec<ManagedTile<H>>,
    plan: CommitPlan<H>,
}

/// Owns the tile lifecycle across rebuilds.
pub struct TileRegistry<H> {
    settings: QsSettings,
    catalog: Vec<String>,
    platform_adapter: Box<dyn PlatformTileAdapter<H>>,
    extension_factory: Box<dyn ExtensionTileFactory<H>>,
    panel: Option<Box<dyn QsPanel>>,
    panel_bound: bool,
    generation: Option<Generation<H>>,
    distributor: Option<EventDistributor>,
    pulldown: Option<QuickPulldownHandler>,
    next_epoch: u64,
}

impl<H: Clone> TileRegistry<H> {
    pub fn new<P, E>(settings: QsSettings, platform_adapter: P, extension_factory: E) -> Self
    where
        P: PlatformTileAdapter<H> + 'static,
        E: ExtensionTileFactory<H> + 'static,
    {
        Self {
            settings,
            catalog: EXTENSION_TILE_KEYS.iter().map(|k| k.to_string()).collect(),
            platform_adapter: Box::new(platform_adapter),
            extension_factory: Box::new(extension_factory),
            panel: None,
            panel_bound: false,
            generation: None,
            distributor: None,
            pulldown: None,
            next_epoch: 1,
        }
    }

    pub fn with_panel<Q: QsPanel + 'static>(mut self, panel: Q) -> Self {
        self.panel = Some(Box::new(panel));
        self
    }

    /// Replace the extension catalog (order decides extension leftovers)
    pub fn with_catalog<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn settings(&self) -> &QsSettings {
        &self.settings
    }

    /// Epoch of the current generation, if any
    pub fn epoch(&self) -> Option<u64> {
        self.generation.as_ref().map(|g| g.epoch)
    }

    /// Committed keys of the current generation, in order
    pub fn live_keys(&self) -> Vec<String> {
        self.generation
            .as_ref()
            .map(|g| g.plan.keys().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn current_plan(&self) -> Option<&CommitPlan<H>> {
        self.generation.as_ref().map(|g| &g.plan)
    }

    /// Identities of every live tile in the current generation
    pub fn live_tiles(&self) -> Vec<TileIdentity> {
        self.generation
            .as_ref()
            .map(|g| g.tiles.iter().map(|t| t.identity()).collect())
            .unwrap_or_default()
    }

    pub fn event_distributor(&self) -> Option<&EventDistributor> {
        self.distributor.as_ref()
    }

    pub fn pulldown_handler(&self) -> Option<&QuickPulldownHandler> {
        self.pulldown.as_ref()
    }

    /// Host tuning hook. Ignores every key but [`TILES_SETTING`]; for the tile
    /// setting it runs a full teardown and rebuild with `specs` as the native
    /// spec list. Errors are logged, never propagated.
    pub fn on_tuning_changed<T>(
        &mut self,
        host: &mut T,
        key: &str,
        specs: Option<&str>,
    ) -> TuningOutcome<H>
    where
        T: TileHost<Handle = H>,
    {
        if key != TILES_SETTING {
            return TuningOutcome::Ignored;
        }
        match catch_unwind(AssertUnwindSafe(|| self.run_cycle(host, specs))) {
            Ok(Ok(plan)) => TuningOutcome::Rebuilt(plan),
            Ok(Err(e)) => {
                log::error!("Registry: tile rebuild aborted: {}", e);
                TuningOutcome::Failed
            }
            Err(e) => {
                log::error!(
                    "Registry: tile rebuild panicked: {:?} (generation {:?} left for teardown)",
                    e,
                    self.epoch()
                );
                TuningOutcome::Failed
            }
        }
    }

    fn run_cycle<T>(&mut self, host: &mut T, specs: Option<&str>) -> Result<CommitPlan<H>, RegistryError>
    where
        T: TileHost<Handle = H>,
    {
        self.prepare(host);
        host.instantiate_native_tiles(specs)?;
        let order = self.settings.tile_order.clone();
        self.rebuild(host, order.as_deref())
    }

    /// Tear down the current generation, if any, and clear the host tile map.
    pub fn prepare<T>(&mut self, host: &mut T)
    where
        T: TileHost<Handle = H>,
    {
        self.retire_generation();
        host.clear_tiles();
    }

    /// Build, order and commit a new generation from the host's current
    /// native tiles. `raw_order` is the comma-delimited preferred order.
    pub fn rebuild<T>(
        &mut self,
        host: &mut T,
        raw_order: Option<&str>,
    ) -> Result<CommitPlan<H>, RegistryError>
    where
        T: TileHost<Handle = H>,
    {
        // A generation still current means prepare() was skipped or the
        // trigger re-entered: retire it here and ignore its extension entries
        // still sitting in the host map.
        let stale = match self.retire_generation() {
            Some(stale) => {
                log::warn!("Registry: rebuild while a generation is live, retired it first");
                stale
            }
            None => HashSet::new(),
        };

        let epoch = self.next_epoch;
        self.next_epoch += 1;

        let distributor = self
            .distributor
            .get_or_insert_with(|| {
                log::info!("Registry: tile event distributor created");
                EventDistributor::new()
            })
            .clone();

        let ctx = TileContext {
            settings: &self.settings,
            distributor: &distributor,
            epoch,
        };

        let mut tiles: Vec<ManagedTile<H>> = Vec::new();
        let mut platform: Vec<PlatformEntry<H>> = Vec::new();
        let mut extension: Vec<ExtensionEntry<H>> = Vec::new();

        for (aosp_key, native) in host.native_tiles() {
            if stale.contains(&aosp_key) {
                continue;
            }
            let wrapped = guarded(&aosp_key, "wrap", || {
                self.platform_adapter.wrap(&ctx, &aosp_key, &native)
            });
            let key = match wrapped {
                Ok(Some(p)) => {
                    let key = p.key.clone();
                    tiles.push(ManagedTile::Platform {
                        key: p.key,
                        aosp_key: aosp_key.clone(),
                        handle: native.clone(),
                        tile: p.tile,
                    });
                    Some(key)
                }
                Ok(None) => {
                    log::debug!("Registry: platform tile '{}' not supported, kept raw", aosp_key);
                    None
                }
                Err(e) => {
                    log::warn!("Registry: wrapping platform tile '{}' failed: {}", aosp_key, e);
                    None
                }
            };
            platform.push(PlatformEntry {
                aosp_key,
                key,
                handle: native,
            });
        }

        for key in &self.catalog {
            match guarded(key, "create", || self.extension_factory.create(&ctx, key)) {
                Ok(Some(tile)) => {
                    let handle = tile.handle();
                    extension.push(ExtensionEntry {
                        key: key.clone(),
                        handle: handle.clone(),
                    });
                    tiles.push(ManagedTile::Extension {
                        key: key.clone(),
                        handle,
                        tile,
                    });
                }
                Ok(None) => log::debug!("Registry: extension tile '{}' disabled", key),
                Err(e) => log::warn!("Registry: creating extension tile '{}' failed: {}", key, e),
            }
        }

        for key in namespace_collisions(&platform, &extension) {
            log::warn!(
                "Registry: key '{}' exists in both namespaces; extension tile takes precedence",
                key
            );
        }

        let preferred = PreferredOrder::parse(raw_order);
        let plan = order_tiles(&platform, &extension, &preferred);

        // The generation owns every tile built for it from here on, so a
        // failure or panic during commit still leaves them to teardown.
        let live = tiles.len();
        self.generation = Some(Generation {
            epoch,
            tiles,
            plan: plan.clone(),
        });

        if let Err(e) = host.install_tiles(&plan) {
            self.retire_generation();
            host.clear_tiles();
            return Err(e);
        }
        log::info!(
            "Registry: generation {} committed ({} tiles, {} live)",
            epoch,
            plan.len(),
            live
        );
        host.notify_tiles_changed();

        self.wire_singletons(&distributor)?;
        if let Some(panel) = self.panel.as_mut() {
            panel.update_resources();
        }

        Ok(plan)
    }

    fn wire_singletons(&mut self, distributor: &EventDistributor) -> Result<(), RegistryError> {
        if self.pulldown.is_none() {
            self.pulldown = Some(QuickPulldownHandler::new(
                self.settings.pulldown,
                distributor,
            )?);
        }
        if !self.panel_bound {
            if let Some(panel) = self.panel.as_mut() {
                panel.set_event_distributor(distributor.clone());
            }
            self.panel_bound = true;
        }
        Ok(())
    }
}

impl<H> TileRegistry<H> {
    /// Destroy the current generation, returning the commit keys of its
    /// extension tiles. `None` when there was no generation.
    fn retire_generation(&mut self) -> Option<HashSet<String>> {
        let generation = self.generation.take()?;
        log::debug!(
            "Registry: tearing down generation {} ({} tiles)",
            generation.epoch,
            generation.tiles.len()
        );
        let stale = generation
            .tiles
            .iter()
            .filter(|t| t.namespace() == Namespace::Extension)
            .map(|t| t.commit_key().to_string())
            .collect();
        self.destroy_tiles(generation.tiles);
        Some(stale)
    }

    /// Run every destroy hook, continuing past failures, and detach each
    /// tile's subscriptions from the distributor.
    fn destroy_tiles(&self, tiles: Vec<ManagedTile<H>>) {
        for mut tile in tiles {
            let identity = tile.identity();
            if let Err(e) = guarded(&identity.key, "destroy", || tile.destroy()) {
                log::warn!("Registry: destroying {} failed: {}", identity, e);
            }
            if let Some(d) = &self.distributor {
                if let Err(e) = d.detach(&identity) {
                    log::warn!("Registry: detaching {} failed: {}", identity, e);
                }
                if let Err(e) = d.publish(&TileEvent::new(identity.clone(), TileEventKind::Destroyed)) {
                    log::warn!("Registry: announcing destroy of {} failed: {}", identity, e);
                }
            }
        }
    }

    /// Destroy every live tile without touching the host. For session end.
    pub fn shutdown(&mut self) {
        if self.retire_generation().is_some() {
            log::info!("Registry: all tiles destroyed");
        }
    }
}

impl<H> Drop for TileRegistry<H> {
    fn drop(&mut self) {
        self.retire_generation();
    }
}
