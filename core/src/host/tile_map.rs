use super::TileHost;
use crate::order::CommitPlan;
use crate::registry::RegistryError;
use indexmap::IndexMap;

/// Host-side listener for committed tile changes (the panel, tile grid, ...)
pub trait TilesChangedCallback {
    fn on_tiles_changed(&mut self);
}

impl<F: FnMut()> TilesChangedCallback for F {
    fn on_tiles_changed(&mut self) {
        self()
    }
}

/// Insertion-ordered host tile map.
///
/// Applies commit plans on behalf of the host: native tiles are built from
/// the spec list by `native_factory`, and committed order is preserved by
/// the underlying `IndexMap`.
pub struct HostTileMap<H> {
    tiles: IndexMap<String, H>,
    tile_specs: Vec<String>,
    callbacks: Vec<Box<dyn TilesChangedCallback>>,
    native_factory: Box<dyn FnMut(&str) -> Option<H>>,
}

impl<H: Clone> HostTileMap<H> {
    pub fn new<F>(native_factory: F) -> Self
    where
        F: FnMut(&str) -> Option<H> + 'static,
    {
        Self {
            tiles: IndexMap::new(),
            tile_specs: Vec::new(),
            callbacks: Vec::new(),
            native_factory: Box::new(native_factory),
        }
    }

    pub fn add_callback<C: TilesChangedCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn keys(&self) -> Vec<&str> {
        self.tiles.keys().map(|k| k.as_str()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&H> {
        self.tiles.get(key)
    }

    pub fn tile_specs(&self) -> &[String] {
        &self.tile_specs
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl<H: Clone> TileHost for HostTileMap<H> {
    type Handle = H;

    fn native_tiles(&self) -> Vec<(String, H)> {
        self.tiles
            .iter()
            .map(|(k, h)| (k.clone(), h.clone()))
            .collect()
    }

    fn instantiate_native_tiles(&mut self, specs: Option<&str>) -> Result<(), RegistryError> {
        for spec in specs.unwrap_or("").split(',').map(str::trim) {
            if spec.is_empty() || self.tiles.contains_key(spec) {
                continue;
            }
            match (self.native_factory)(spec) {
                Some(handle) => {
                    self.tiles.insert(spec.to_string(), handle);
                    self.tile_specs.push(spec.to_string());
                }
                None => log::debug!("Host: no native tile for spec '{}'", spec),
            }
        }
        Ok(())
    }

    fn clear_tiles(&mut self) {
        self.tiles.clear();
        self.tile_specs.clear();
    }

    fn install_tiles(&mut self, plan: &CommitPlan<H>) -> Result<(), RegistryError> {
        self.tiles.clear();
        for (key, handle) in plan.iter() {
            if self.tiles.insert(key.to_string(), handle.clone()).is_some() {
                return Err(RegistryError::DuplicateCommitKey(key.to_string()));
            }
        }
        Ok(())
    }

    fn notify_tiles_changed(&mut self) {
        for cb in self.callbacks.iter_mut() {
            cb.on_tiles_changed();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{order_tiles, ExtensionEntry, PreferredOrder};
    use std::sync::{Arc, Mutex};

    fn host() -> HostTileMap<String> {
        HostTileMap::new(|spec: &str| {
            if spec.starts_with("broken") {
                None
            } else {
                Some(format!("native:{}", spec))
            }
        })
    }

    #[test]
    fn test_instantiate_from_specs() {
        let mut h = host();
        h.instantiate_native_tiles(Some("wifi, bt,broken,wifi,,cell"))
            .unwrap();
        assert_eq!(h.keys(), vec!["wifi", "bt", "cell"]);
        assert_eq!(h.tile_specs(), &["wifi", "bt", "cell"]);
        assert_eq!(h.get("bt"), Some(&"native:bt".to_string()));
    }

    #[test]
    fn test_install_preserves_plan_order() {
        let mut h = host();
        h.instantiate_native_tiles(Some("wifi,bt")).unwrap();
        let extension = vec![ExtensionEntry {
            key: "gb_tile_nfc".to_string(),
            handle: "ext:gb_tile_nfc".to_string(),
        }];
        let plan = order_tiles(&[], &extension, &PreferredOrder::default());
        h.install_tiles(&plan).unwrap();
        assert_eq!(h.keys(), vec!["gb_tile_nfc"]);
        assert_eq!(h.tile_specs(), &["wifi", "bt"]);

        h.clear_tiles();
        assert!(h.is_empty());
        assert!(h.tile_specs().is_empty());
    }

    #[test]
    fn test_callbacks_fire_in_registration_order() {
        let mut h = host();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["panel", "header", "grid"] {
            let log = log.clone();
            h.add_callback(move || log.lock().unwrap().push(name));
        }
        h.notify_tiles_changed();
        assert_eq!(*log.lock().unwrap(), vec!["panel", "header", "grid"]);
    }
}
