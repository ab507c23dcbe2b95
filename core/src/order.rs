//! Order policy: merge platform and extension tiles into one ordered commit plan.
//!
//! Pure and host-independent. Placement rules:
//! 1. Preferred keys in listed order. Each key is looked up in the extension
//!    set first, then among wrapped platform tiles by identity key. Unknown
//!    keys are skipped.
//! 2. Remaining platform entries (wrapped or raw) in host order.
//! 3. Remaining extension entries in catalog order.
//!
//! A commit key is placed at most once; later duplicates are dropped.

use std::collections::{HashMap, HashSet};

/// A native host tile, wrapped (`key` set) or left raw (`key` is `None`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformEntry<H> {
    /// Host spec string, the commit key
    pub aosp_key: String,
    /// Identity key from the platform adapter
    pub key: Option<String>,
    pub handle: H,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionEntry<H> {
    pub key: String,
    pub handle: H,
}

/// User-preferred tile order parsed from a comma-delimited preference string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferredOrder {
    keys: Vec<String>,
}

impl PreferredOrder {
    /// Absent, empty or all-blank input yields an empty order. Whitespace
    /// around keys is trimmed and empty segments are dropped.
    pub fn parse(raw: Option<&str>) -> Self {
        let keys = raw
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
        Self { keys }
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Immutable ordered sequence of `(commit key, handle)` pairs.
///
/// The only thing the engine hands to the host; iteration order is the
/// tile order until the next rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPlan<H> {
    entries: Vec<(String, H)>,
}

impl<H> CommitPlan<H> {
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &H)> {
        self.entries.iter().map(|(k, h)| (k.as_str(), h))
    }

    pub fn get(&self, key: &str) -> Option<&H> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, h)| h)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, H)> {
        self.entries
    }
}

impl<H> Default for CommitPlan<H> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

struct PlanBuilder<H> {
    entries: Vec<(String, H)>,
    placed: HashSet<String>,
}

impl<H: Clone> PlanBuilder<H> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            placed: HashSet::new(),
        }
    }

    fn push(&mut self, commit_key: &str, handle: &H, why: &str) {
        if !self.placed.insert(commit_key.to_string()) {
            log::warn!("Order: commit key '{}' already placed, dropping duplicate", commit_key);
            return;
        }
        log::debug!("Order: added {} ({})", commit_key, why);
        self.entries.push((commit_key.to_string(), handle.clone()));
    }
}

/// Compute the final tile order.
pub fn order_tiles<H: Clone>(
    platform: &[PlatformEntry<H>],
    extension: &[ExtensionEntry<H>],
    preferred: &PreferredOrder,
) -> CommitPlan<H> {
    let mut platform_left: Vec<Option<&PlatformEntry<H>>> = platform.iter().map(Some).collect();
    let mut extension_left: Vec<Option<&ExtensionEntry<H>>> = extension.iter().map(Some).collect();

    // First occurrence wins the lookup slot; later ones surface as leftovers.
    let mut extension_index: HashMap<&str, usize> = HashMap::new();
    for (i, e) in extension.iter().enumerate() {
        extension_index.entry(e.key.as_str()).or_insert(i);
    }
    let mut platform_index: HashMap<&str, usize> = HashMap::new();
    for (i, p) in platform.iter().enumerate() {
        if let Some(key) = p.key.as_deref() {
            platform_index.entry(key).or_insert(i);
        }
    }

    let mut plan = PlanBuilder::new();

    for key in preferred.keys() {
        if let Some(entry) = extension_index
            .get(key.as_str())
            .and_then(|&i| extension_left[i].take())
        {
            plan.push(&entry.key, &entry.handle, "preferred extension tile");
            continue;
        }
        if let Some(entry) = platform_index
            .get(key.as_str())
            .and_then(|&i| platform_left[i].take())
        {
            plan.push(&entry.aosp_key, &entry.handle, "preferred platform tile");
            continue;
        }
        log::debug!("Order: preferred key '{}' has no live tile, skipped", key);
    }

    for entry in platform_left.into_iter().flatten() {
        plan.push(&entry.aosp_key, &entry.handle, "disabled or unknown platform tile");
    }
    for entry in extension_left.into_iter().flatten() {
        plan.push(&entry.key, &entry.handle, "disabled extension tile");
    }

    CommitPlan {
        entries: plan.entries,
    }
}

/// Keys that appear in both namespaces, by identity or by commit key.
///
/// Collisions are a configuration error. Ordering still resolves them
/// (extension first), but callers should report them.
pub fn namespace_collisions<H>(
    platform: &[PlatformEntry<H>],
    extension: &[ExtensionEntry<H>],
) -> Vec<String> {
    let mut platform_keys: HashSet<&str> = HashSet::new();
    for p in platform {
        platform_keys.insert(p.aosp_key.as_str());
        if let Some(key) = p.key.as_deref() {
            platform_keys.insert(key);
        }
    }
    extension
        .iter()
        .filter(|e| platform_keys.contains(e.key.as_str()))
        .map(|e| e.key.clone())
        .collect()
}
