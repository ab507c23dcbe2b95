//! Tile Event Distributor
//!
//! Shared publish/subscribe hub that decouples tile instances, the panel and
//! the quick pulldown handler from each other. One distributor lives for the
//! whole host session and survives every rebuild, so observers registered
//! once stay valid.
//!
//! ## Delivery
//! Events are delivered synchronously, in subscription order, on the thread
//! that called [`EventDistributor::publish`]. Nothing is queued.
//!
//! Observers must not publish, subscribe or unsubscribe from inside
//! `on_tile_event`. The distributor does not serialize nested calls: they
//! fail with [`DistributorError::Reentrant`] and the nested event is dropped.

use quickset_signals::{TileEvent, TileIdentity};
use slab::Slab;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Receives events published through the distributor
pub trait TileEventObserver: Send {
    fn on_tile_event(&mut self, event: &TileEvent);
}

impl<F> TileEventObserver for F
where
    F: FnMut(&TileEvent) + Send,
{
    fn on_tile_event(&mut self, event: &TileEvent) {
        self(event)
    }
}

/// Handle returned by [`EventDistributor::subscribe`].
///
/// Slab slots are reused, so the handle carries a generation to reject
/// stale ids that point at a newer subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    pub index: usize,
    pub generation: u64,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributorError {
    #[error("distributor accessed from inside an event delivery")]
    Reentrant,

    #[error("distributor state poisoned by a panicking caller")]
    Poisoned,
}

struct Subscriber {
    owner: Option<TileIdentity>,
    generation: u64,
    observer: Box<dyn TileEventObserver>,
}

#[derive(Default)]
struct Subscribers {
    slots: Slab<Subscriber>,
    /// Slab keys in subscription order
    order: Vec<usize>,
    next_generation: u64,
}

impl Subscribers {
    fn remove(&mut self, index: usize) {
        self.slots.remove(index);
        self.order.retain(|&k| k != index);
    }
}

/// Cloneable handle to the shared subscriber table.
#[derive(Clone, Default)]
pub struct EventDistributor {
    inner: Arc<Mutex<Subscribers>>,
}

impl EventDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Subscribers>, DistributorError> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => Err(DistributorError::Reentrant),
            Err(TryLockError::Poisoned(_)) => Err(DistributorError::Poisoned),
        }
    }

    /// Register an observer. `owner` ties the subscription to a tile so
    /// that [`detach`](Self::detach) can drop it when the tile is destroyed;
    /// session-wide observers (panel, pulldown) pass `None`.
    pub fn subscribe<O>(
        &self,
        owner: Option<TileIdentity>,
        observer: O,
    ) -> Result<SubscriptionId, DistributorError>
    where
        O: TileEventObserver + 'static,
    {
        let mut subs = self.lock()?;
        let generation = subs.next_generation;
        subs.next_generation += 1;

        let entry = subs.slots.vacant_entry();
        let index = entry.key();
        entry.insert(Subscriber {
            owner,
            generation,
            observer: Box::new(observer),
        });
        subs.order.push(index);

        Ok(SubscriptionId { index, generation })
    }

    /// Remove a single subscription. Returns false for unknown or stale ids.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool, DistributorError> {
        let mut subs = self.lock()?;
        let matches = subs
            .slots
            .get(id.index)
            .map(|s| s.generation == id.generation)
            .unwrap_or(false);
        if matches {
            subs.remove(id.index);
        }
        Ok(matches)
    }

    /// Remove every subscription owned by `owner`, returning how many went away
    pub fn detach(&self, owner: &TileIdentity) -> Result<usize, DistributorError> {
        let mut subs = self.lock()?;
        let doomed: Vec<usize> = subs
            .order
            .iter()
            .copied()
            .filter(|&k| subs.slots[k].owner.as_ref() == Some(owner))
            .collect();
        for index in &doomed {
            subs.remove(*index);
        }
        if !doomed.is_empty() {
            log::debug!("Distributor: detached {} subscription(s) of {}", doomed.len(), owner);
        }
        Ok(doomed.len())
    }

    /// Deliver `event` to every observer in subscription order.
    /// Returns the number of observers that received it.
    pub fn publish(&self, event: &TileEvent) -> Result<usize, DistributorError> {
        let mut subs = self.lock()?;
        let order = subs.order.clone();
        let mut delivered = 0;
        for index in order {
            let Some(sub) = subs.slots.get_mut(index) else {
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| sub.observer.on_tile_event(event)));
            match result {
                Ok(()) => delivered += 1,
                Err(_) => log::error!(
                    "Distributor: observer #{} panicked handling event from {}",
                    index,
                    event.source
                ),
            }
        }
        Ok(delivered)
    }

    pub fn subscriber_count(&self) -> Result<usize, DistributorError> {
        Ok(self.lock()?.order.len())
    }

    /// Whether any live subscription is owned by `owner`
    pub fn has_owner(&self, owner: &TileIdentity) -> Result<bool, DistributorError> {
        let subs = self.lock()?;
        Ok(subs.slots.iter().any(|(_, s)| s.owner.as_ref() == Some(owner)))
    }

    /// Owners of all tile-bound subscriptions, in subscription order
    pub fn owners(&self) -> Result<Vec<TileIdentity>, DistributorError> {
        let subs = self.lock()?;
        Ok(subs
            .order
            .iter()
            .filter_map(|&k| subs.slots[k].owner.clone())
            .collect())
    }

    /// True when both handles point at the same subscriber table
    pub fn same_as(&self, other: &EventDistributor) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for EventDistributor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDistributor")
            .field("subscribers", &self.subscriber_count().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickset_signals::TileEventKind;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Box<dyn FnMut(&TileEvent) + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |name: &str| {
            let log = log_clone.clone();
            let name = name.to_string();
            Box::new(move |e: &TileEvent| {
                log.lock().unwrap().push(format!("{}<-{}", name, e.source.key));
            }) as Box<dyn FnMut(&TileEvent) + Send>
        };
        (log, make)
    }

    #[test]
    fn test_delivery_in_subscription_order() {
        let d = EventDistributor::new();
        let (log, make) = recorder();
        d.subscribe(None, make("first")).unwrap();
        d.subscribe(None, make("second")).unwrap();
        d.subscribe(None, make("third")).unwrap();

        let n = d
            .publish(&TileEvent::state_changed(TileIdentity::extension("gb_tile_sync")))
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first<-gb_tile_sync", "second<-gb_tile_sync", "third<-gb_tile_sync"]
        );
    }

    #[test]
    fn test_order_kept_after_slot_reuse() {
        let d = EventDistributor::new();
        let (log, make) = recorder();
        let a = d.subscribe(None, make("a")).unwrap();
        d.subscribe(None, make("b")).unwrap();
        assert!(d.unsubscribe(a).unwrap());
        // Reuses slot 0 but must be delivered after "b"
        d.subscribe(None, make("c")).unwrap();

        d.publish(&TileEvent::state_changed(TileIdentity::platform("wifi")))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["b<-wifi", "c<-wifi"]);
    }

    #[test]
    fn test_stale_subscription_id_rejected() {
        let d = EventDistributor::new();
        let (_log, make) = recorder();
        let old = d.subscribe(None, make("old")).unwrap();
        assert!(d.unsubscribe(old).unwrap());
        let new = d.subscribe(None, make("new")).unwrap();
        assert_eq!(old.index, new.index);

        assert!(!d.unsubscribe(old).unwrap());
        assert_eq!(d.subscriber_count().unwrap(), 1);
    }

    #[test]
    fn test_detach_by_owner() {
        let d = EventDistributor::new();
        let (_log, make) = recorder();
        let torch = TileIdentity::extension("gb_tile_torch");
        d.subscribe(Some(torch.clone()), make("t1")).unwrap();
        d.subscribe(None, make("panel")).unwrap();
        d.subscribe(Some(torch.clone()), make("t2")).unwrap();

        assert_eq!(d.detach(&torch).unwrap(), 2);
        assert!(!d.has_owner(&torch).unwrap());
        assert_eq!(d.subscriber_count().unwrap(), 1);
        assert!(d.owners().unwrap().is_empty());
    }

    #[test]
    fn test_reentrant_publish_rejected() {
        let d = EventDistributor::new();
        let inner = d.clone();
        let nested = Arc::new(Mutex::new(None));
        let nested_clone = nested.clone();
        d.subscribe(None, move |e: &TileEvent| {
            let r = inner.publish(&TileEvent::new(e.source.clone(), TileEventKind::Destroyed));
            *nested_clone.lock().unwrap() = Some(r);
        })
        .unwrap();

        d.publish(&TileEvent::state_changed(TileIdentity::platform("bt")))
            .unwrap();
        assert_eq!(
            *nested.lock().unwrap(),
            Some(Err(DistributorError::Reentrant))
        );
    }

    #[test]
    fn test_panicking_observer_does_not_stop_delivery() {
        let d = EventDistributor::new();
        let (log, make) = recorder();
        d.subscribe(None, |_e: &TileEvent| panic!("observer failure"))
            .unwrap();
        d.subscribe(None, make("after")).unwrap();

        let n = d
            .publish(&TileEvent::state_changed(TileIdentity::platform("cell")))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(*log.lock().unwrap(), vec!["after<-cell"]);
    }

    #[test]
    fn test_clones_share_subscribers() {
        let d = EventDistributor::new();
        let other = d.clone();
        let (_log, make) = recorder();
        other.subscribe(None, make("x")).unwrap();
        assert_eq!(d.subscriber_count().unwrap(), 1);
        assert!(d.same_as(&other));
        assert!(!d.same_as(&EventDistributor::new()));
    }
}
