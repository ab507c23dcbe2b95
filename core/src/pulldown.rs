use crate::distributor::{DistributorError, EventDistributor, SubscriptionId};
use quickset_config::{PulldownMode, PulldownSettings};
use quickset_signals::TileEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Quick pulldown: a touch on one edge of the status bar opens the full
/// panel directly. Gesture handling lives with the host; this handler only
/// owns the trigger geometry and its distributor subscription.
pub struct QuickPulldownHandler {
    settings: PulldownSettings,
    distributor: EventDistributor,
    subscription: SubscriptionId,
    events_seen: Arc<AtomicU64>,
}

impl QuickPulldownHandler {
    pub fn new(
        settings: PulldownSettings,
        distributor: &EventDistributor,
    ) -> Result<Self, DistributorError> {
        let events_seen = Arc::new(AtomicU64::new(0));
        let counter = events_seen.clone();
        let subscription = distributor.subscribe(None, move |_e: &TileEvent| {
            counter.fetch_add(1, Ordering::Relaxed);
        })?;
        log::debug!("Pulldown: handler created ({:?})", settings.mode);
        Ok(Self {
            settings,
            distributor: distributor.clone(),
            subscription,
            events_seen,
        })
    }

    pub fn settings(&self) -> PulldownSettings {
        self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.mode != PulldownMode::Off
    }

    /// Whether a touch at `x_fraction` (0.0 = left edge, 1.0 = right edge)
    /// falls inside the trigger strip
    pub fn engages_at(&self, x_fraction: f32) -> bool {
        let strip = f32::from(self.settings.size_percent.clamp(1, 100)) / 100.0;
        match self.settings.mode {
            PulldownMode::Off => false,
            PulldownMode::Right => x_fraction >= 1.0 - strip,
            PulldownMode::Left => x_fraction <= strip,
        }
    }

    /// Tile events observed since construction
    pub fn events_seen(&self) -> u64 {
        self.events_seen.load(Ordering::Relaxed)
    }

    pub fn distributor(&self) -> &EventDistributor {
        &self.distributor
    }

    pub fn subscription(&self) -> SubscriptionId {
        self.subscription
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickset_signals::TileIdentity;

    fn handler(mode: PulldownMode, size_percent: u8) -> QuickPulldownHandler {
        QuickPulldownHandler::new(
            PulldownSettings { mode, size_percent },
            &EventDistributor::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_right_edge_strip() {
        let h = handler(PulldownMode::Right, 20);
        assert!(h.is_enabled());
        assert!(h.engages_at(0.9));
        assert!(!h.engages_at(0.5));
    }

    #[test]
    fn test_left_edge_strip() {
        let h = handler(PulldownMode::Left, 10);
        assert!(h.engages_at(0.05));
        assert!(!h.engages_at(0.95));
    }

    #[test]
    fn test_off_never_engages() {
        let h = handler(PulldownMode::Off, 100);
        assert!(!h.is_enabled());
        assert!(!h.engages_at(0.0));
        assert!(!h.engages_at(1.0));
    }

    #[test]
    fn test_counts_distributor_events() {
        let d = EventDistributor::new();
        let h = QuickPulldownHandler::new(PulldownSettings::default(), &d).unwrap();
        d.publish(&TileEvent::state_changed(TileIdentity::platform("wifi")))
            .unwrap();
        d.publish(&TileEvent::state_changed(TileIdentity::platform("bt")))
            .unwrap();
        assert_eq!(h.events_seen(), 2);
        assert!(h.distributor().same_as(&d));
    }
}
