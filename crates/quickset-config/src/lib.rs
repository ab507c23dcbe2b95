use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that replaces the configured tile order string.
pub const TILE_ORDER_ENV: &str = "QS_TILE_ORDER";

/// Which edge of the status bar pulls the panel down fully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PulldownMode {
    #[default]
    Off,
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulldownSettings {
    pub mode: PulldownMode,
    /// Width of the trigger strip as a percentage of the bar, clamped to 1..=100
    pub size_percent: u8,
}

impl Default for PulldownSettings {
    fn default() -> Self {
        Self {
            mode: PulldownMode::Off,
            size_percent: default_size_percent(),
        }
    }
}

/// Resolved quick-settings configuration.
#[derive(Debug, Clone, Default)]
pub struct QsSettings {
    /// Raw comma-delimited preferred tile order. `None` when never set.
    pub tile_order: Option<String>,
    /// Extension tile keys switched off by the user
    pub disabled_extension_tiles: HashSet<String>,
    pub pulldown: PulldownSettings,
}

impl QsSettings {
    pub fn is_extension_tile_enabled(&self, key: &str) -> bool {
        !self.disabled_extension_tiles.contains(key)
    }

    /// Raw order string handed to the tile registry, empty when unset
    pub fn tile_order_raw(&self) -> &str {
        self.tile_order.as_deref().unwrap_or("")
    }

    /// Replace the order string when an override is present
    pub fn with_order_override(mut self, order: Option<String>) -> Self {
        if let Some(order) = order {
            log::info!("Config: tile order overridden ({})", order);
            self.tile_order = Some(order);
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ExtensionTilesToml {
    #[serde(default)]
    disabled: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct PulldownToml {
    #[serde(default)]
    mode: PulldownMode,
    #[serde(default = "default_size_percent")]
    size_percent: u8,
}

fn default_size_percent() -> u8 {
    15
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RootConfigToml {
    #[serde(default)]
    tile_order: Option<String>,
    #[serde(default)]
    extension_tiles: ExtensionTilesToml,
    #[serde(default)]
    pulldown: Option<PulldownToml>,
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("configs/quickset.toml"),
        PathBuf::from("../../configs/quickset.toml"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("quickset").join("quickset.toml"));
    }
    paths
}

/// Try the usual relative paths, then the user config dir, for `quickset.toml`.
pub fn read_config_toml_text() -> anyhow::Result<String> {
    let paths = candidate_paths();
    for p in &paths {
        if let Ok(c) = fs::read_to_string(p) {
            log::debug!("Config: loaded {}", p.display());
            return Ok(c);
        }
    }
    anyhow::bail!("Could not load quickset.toml from {:?}", paths);
}

pub fn parse_settings(text: &str) -> anyhow::Result<QsSettings> {
    let root: RootConfigToml = toml::from_str(text)
        .map_err(|e| anyhow::anyhow!("Failed to parse quickset.toml: {e}"))?;
    let RootConfigToml {
        tile_order,
        extension_tiles,
        pulldown,
    } = root;
    let pulldown = match pulldown {
        Some(p) => {
            if p.size_percent == 0 || p.size_percent > 100 {
                anyhow::bail!(
                    "pulldown.size_percent must be within 1..=100, got {}",
                    p.size_percent
                );
            }
            PulldownSettings {
                mode: p.mode,
                size_percent: p.size_percent,
            }
        }
        None => PulldownSettings::default(),
    };
    Ok(QsSettings {
        tile_order,
        disabled_extension_tiles: extension_tiles.disabled.into_iter().collect(),
        pulldown,
    })
}

/// Load settings from disk, falling back to defaults when no file exists.
/// A file that exists but does not parse is an error.
pub fn load_settings() -> anyhow::Result<QsSettings> {
    let settings = match read_config_toml_text() {
        Ok(text) => parse_settings(&text)?,
        Err(e) => {
            log::warn!("Config: {e}; using defaults");
            QsSettings::default()
        }
    };
    Ok(settings.with_order_override(std::env::var(TILE_ORDER_ENV).ok()))
}

/// Load settings from an explicit file. Unlike [`load_settings`], a missing
/// file is an error.
pub fn load_settings_from(path: &Path) -> anyhow::Result<QsSettings> {
    let text = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Could not read {}: {e}", path.display()))?;
    let settings = parse_settings(&text)?;
    Ok(settings.with_order_override(std::env::var(TILE_ORDER_ENV).ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let text = r#"
            tile_order = "gb_tile_torch,wifi,bt"

            [extension_tiles]
            disabled = ["gb_tile_compass"]

            [pulldown]
            mode = "left"
            size_percent = 20
        "#;
        let settings = parse_settings(text).unwrap();
        assert_eq!(settings.tile_order_raw(), "gb_tile_torch,wifi,bt");
        assert!(!settings.is_extension_tile_enabled("gb_tile_compass"));
        assert!(settings.is_extension_tile_enabled("gb_tile_torch"));
        assert_eq!(settings.pulldown.mode, PulldownMode::Left);
        assert_eq!(settings.pulldown.size_percent, 20);
    }

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let settings = parse_settings("").unwrap();
        assert!(settings.tile_order.is_none());
        assert_eq!(settings.tile_order_raw(), "");
        assert_eq!(settings.pulldown, PulldownSettings::default());
    }

    #[test]
    fn test_pulldown_size_out_of_range() {
        let text = "[pulldown]\nmode = \"right\"\nsize_percent = 0\n";
        assert!(parse_settings(text).is_err());
    }

    #[test]
    fn test_unknown_pulldown_mode_rejected() {
        let text = "[pulldown]\nmode = \"top\"\n";
        assert!(parse_settings(text).is_err());
    }

    #[test]
    fn test_order_override() {
        let settings = parse_settings("tile_order = \"a,b\"").unwrap();
        let kept = settings.clone().with_order_override(None);
        assert_eq!(kept.tile_order_raw(), "a,b");
        let replaced = settings.with_order_override(Some("c".to_string()));
        assert_eq!(replaced.tile_order_raw(), "c");
    }
}
