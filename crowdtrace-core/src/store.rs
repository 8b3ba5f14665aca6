//! Per-artifact sample stores and the weak-value store registry.
//!
//! Every artifact owns one canonical, time-ordered series of snapshots. The
//! registry hands the same store to every entity handle built with the same
//! identifier while at least one handle is alive; once the last strong handle
//! is dropped the store is discarded, and a later registration under the same
//! identifier starts a fresh, empty store.

use crate::ids::ArtifactUrl;
use crate::individual::Individual;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Shared strong handle to one artifact's sample store.
///
/// `Rc<RefCell<_>>` rather than `Arc<Mutex<_>>`: the core is single-threaded
/// by design, and the types encode that assumption.
pub type StoreHandle<T> = Rc<RefCell<SampleStore<T>>>;

/// What `append` did with a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The capture time was new; the snapshot was inserted.
    Inserted,
    /// An equal snapshot already existed at this capture time; nothing changed.
    Unchanged,
    /// A differing snapshot existed at this capture time; last write wins,
    /// the previous value was replaced.
    Replaced,
}

/// Ordered, unique-by-capture-time series of snapshots for one artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleStore<T> {
    entries: BTreeMap<DateTime<Utc>, T>,
}

impl<T> Default for SampleStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SampleStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the number of snapshots in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no snapshot has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the most recent snapshot, or `None` for a zero-snapshot
    /// artifact. Current name/owner/tags queries answer from here.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.entries.values().next_back()
    }

    /// Returns the earliest snapshot captured strictly after `after`, or the
    /// earliest overall when `after` is `None`.
    ///
    /// This is the cursor primitive behind [`StoreIter`]: each call is one
    /// `BTreeMap` range lookup, so a live iteration never holds a borrow
    /// across elements.
    #[must_use]
    pub fn first_after(&self, after: Option<DateTime<Utc>>) -> Option<&T> {
        match after {
            Some(at) => self
                .entries
                .range((Bound::Excluded(at), Bound::Unbounded))
                .map(|(_, snapshot)| snapshot)
                .next(),
            None => self.entries.values().next(),
        }
    }

    /// Iterates the snapshots in ascending capture-time order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<T: Individual + PartialEq> SampleStore<T> {
    /// Inserts a snapshot keyed by its capture time, keeping sort order.
    ///
    /// At most one entry exists per exact capture time. Re-appending an equal
    /// snapshot is a no-op. An append at an existing capture time with a
    /// differing value is an ambiguous-history condition; the policy here is
    /// last-write-wins — the new value replaces the old and the conflict is
    /// logged.
    pub fn append(&mut self, snapshot: T) -> AppendOutcome {
        let captured_at = snapshot.captured_at();
        match self.entries.entry(captured_at) {
            Entry::Vacant(slot) => {
                slot.insert(snapshot);
                AppendOutcome::Inserted
            }
            Entry::Occupied(mut slot) => {
                if *slot.get() == snapshot {
                    AppendOutcome::Unchanged
                } else {
                    warn!(
                        captured_at = %captured_at,
                        "conflicting snapshot at an existing capture time, keeping the later write"
                    );
                    slot.insert(snapshot);
                    AppendOutcome::Replaced
                }
            }
        }
    }
}

/// Lazy, live iterator over one store's snapshots.
///
/// Holds a strong handle and a capture-time cursor instead of a borrow, so
/// the store can be appended to between pulls; each `next` re-reads the
/// current store state. Snapshots appended behind the cursor are not
/// revisited within one traversal.
pub struct StoreIter<T> {
    store: StoreHandle<T>,
    cursor: Option<DateTime<Utc>>,
}

impl<T> StoreIter<T> {
    /// Starts a fresh traversal of the store.
    #[must_use]
    pub fn new(store: StoreHandle<T>) -> Self {
        Self {
            store,
            cursor: None,
        }
    }
}

impl<T: Individual + Clone> Iterator for StoreIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let snapshot = self.store.borrow().first_after(self.cursor).cloned()?;
        self.cursor = Some(snapshot.captured_at());
        Some(snapshot)
    }
}

/// Weak-value cache of sample stores, keyed by artifact identifier.
///
/// The registry never keeps a store alive on its own: it holds `Weak`
/// references, and `obtain` prunes entries whose last strong handle is gone.
/// One thread-local registry exists per artifact kind.
pub struct StoreRegistry<T> {
    stores: RefCell<HashMap<ArtifactUrl, Weak<RefCell<SampleStore<T>>>>>,
}

impl<T> Default for StoreRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> StoreRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stores: RefCell::new(HashMap::new()),
        }
    }

    /// Returns the live store registered under `url`, or allocates, weakly
    /// remembers, and returns a fresh empty one.
    #[must_use]
    pub fn obtain(&self, url: &ArtifactUrl) -> StoreHandle<T> {
        let mut stores = self.stores.borrow_mut();
        if let Some(live) = stores.get(url).and_then(Weak::upgrade) {
            return live;
        }
        let fresh: StoreHandle<T> = Rc::new(RefCell::new(SampleStore::new()));
        stores.retain(|_, weak| weak.strong_count() > 0);
        stores.insert(url.clone(), Rc::downgrade(&fresh));
        debug!(url = %url, "registered fresh sample store");
        fresh
    }

    /// Returns the number of stores with at least one live strong handle.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.stores
            .borrow()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    struct Gauge {
        at: DateTime<Utc>,
        value: u64,
    }

    impl Individual for Gauge {
        fn captured_at(&self) -> DateTime<Utc> {
            self.at
        }

        fn merge(self, other: Self) -> Self {
            Self {
                at: self.at.max(other.at),
                value: self.value + other.value,
            }
        }
    }

    fn gauge(day: u32, value: u64) -> Gauge {
        Gauge {
            at: Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(),
            value,
        }
    }

    #[test]
    fn append_keeps_ascending_order() {
        let mut store = SampleStore::new();
        store.append(gauge(3, 30));
        store.append(gauge(1, 10));
        store.append(gauge(2, 20));
        let values: Vec<_> = store.iter().map(|g| g.value).collect();
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn append_equal_snapshot_is_unchanged() {
        let mut store = SampleStore::new();
        assert_eq!(store.append(gauge(1, 10)), AppendOutcome::Inserted);
        assert_eq!(store.append(gauge(1, 10)), AppendOutcome::Unchanged);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn append_conflicting_snapshot_last_write_wins() {
        let mut store = SampleStore::new();
        store.append(gauge(1, 10));
        assert_eq!(store.append(gauge(1, 99)), AppendOutcome::Replaced);
        assert_eq!(store.latest().map(|g| g.value), Some(99));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn latest_on_empty_store_is_none() {
        let store: SampleStore<Gauge> = SampleStore::new();
        assert!(store.latest().is_none());
    }

    #[test]
    fn store_iter_sees_appends_behind_live_handle() {
        let registry = StoreRegistry::new();
        let url = ArtifactUrl::new("https://example.com/a");
        let store = registry.obtain(&url);
        store.borrow_mut().append(gauge(1, 10));

        let mut iter = StoreIter::new(Rc::clone(&store));
        assert_eq!(iter.next().map(|g| g.value), Some(10));

        store.borrow_mut().append(gauge(2, 20));
        assert_eq!(iter.next().map(|g| g.value), Some(20));
        assert!(iter.next().is_none());
    }

    #[test]
    fn serialization_roundtrip() {
        let mut store = SampleStore::new();
        store.append(gauge(1, 10));
        store.append(gauge(2, 20));
        let json = serde_json::to_string(&store).unwrap();
        let parsed: SampleStore<Gauge> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.latest().map(|g| g.value), Some(20));
    }

    #[test]
    fn registry_shares_store_while_alive() {
        let registry: StoreRegistry<Gauge> = StoreRegistry::new();
        let url = ArtifactUrl::new("https://example.com/shared");
        let first = registry.obtain(&url);
        let second = registry.obtain(&url);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.live_count(), 1);
    }

    #[test]
    fn registry_starts_fresh_after_last_handle_drops() {
        let registry = StoreRegistry::new();
        let url = ArtifactUrl::new("https://example.com/fresh");
        {
            let store = registry.obtain(&url);
            store.borrow_mut().append(gauge(1, 10));
        }
        assert_eq!(registry.live_count(), 0);
        let store = registry.obtain(&url);
        assert!(store.borrow().is_empty());
    }
}
