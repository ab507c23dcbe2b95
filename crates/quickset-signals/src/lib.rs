use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// IDENTITY
// ============================================================================

/// Which layer contributed a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Namespace {
    /// Native tile instantiated by the host shell, keyed by its spec string
    Platform,
    /// Tile contributed by the extension catalog
    Extension,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Platform => write!(f, "platform"),
            Namespace::Extension => write!(f, "extension"),
        }
    }
}

/// Identifies a tile uniquely within its namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct TileIdentity {
    pub namespace: Namespace,
    pub key: String,
}

impl TileIdentity {
    pub fn platform(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Platform,
            key: key.into(),
        }
    }

    pub fn extension(key: impl Into<String>) -> Self {
        Self {
            namespace: Namespace::Extension,
            key: key.into(),
        }
    }
}

impl fmt::Display for TileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// What happened to the source tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "data")]
pub enum TileEventKind {
    /// Tile state (on/off, label, icon) changed
    StateChanged,
    /// Tile was shown or hidden in the panel
    VisibilityChanged { visible: bool },
    /// Tile ran its destroy hook
    Destroyed,
    /// Free-form event understood by specific observers
    Custom(String),
}

/// An event published through the tile event distributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TileEvent {
    pub source: TileIdentity,
    pub kind: TileEventKind,
}

impl TileEvent {
    pub fn new(source: TileIdentity, kind: TileEventKind) -> Self {
        Self { source, kind }
    }

    pub fn state_changed(source: TileIdentity) -> Self {
        Self::new(source, TileEventKind::StateChanged)
    }

    pub fn visibility_changed(source: TileIdentity, visible: bool) -> Self {
        Self::new(source, TileEventKind::VisibilityChanged { visible })
    }

    /// Render as JSON for log lines and debugging tools
    pub fn to_json(&self) -> Result<String, SignalError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SignalError {
    #[error("failed to encode tile event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        assert_eq!(TileIdentity::platform("wifi").to_string(), "platform:wifi");
        assert_eq!(
            TileIdentity::extension("gb_tile_torch").to_string(),
            "extension:gb_tile_torch"
        );
    }

    #[test]
    fn test_identity_namespaces_differ() {
        assert_ne!(TileIdentity::platform("nfc"), TileIdentity::extension("nfc"));
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = TileEvent::visibility_changed(TileIdentity::extension("gb_tile_sync"), false);
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"VisibilityChanged\""));
        assert!(json.contains("\"visible\":false"));
    }
}
