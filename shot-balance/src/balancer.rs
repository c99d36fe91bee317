use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;
use tracing::trace;

use crate::Item;
use crate::WallClock;

/// Selects an item with spare capacity in the current second.
///
/// Items are fixed at construction. `acquire` and `set_shuffle` take the write lock; the
/// accounting queries take the read lock.
pub struct Balancer<T> {
    inner: RwLock<Inner<T>>,
    clock: WallClock,
}

struct Inner<T> {
    items: Vec<Item<T>>,
    shuffle: bool,
    rng: StdRng,
}

/// Point-in-time usage of a single item.
#[derive(Debug, Clone)]
pub struct ItemStats<T> {
    pub resource: Arc<T>,
    pub max_requests: usize,
    /// Claims made during the current second.
    pub num_requests: usize,
    pub available: usize,
}

impl<T> fmt::Debug for Balancer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Balancer")
            .field("items", &inner.items.len())
            .field("shuffle", &inner.shuffle)
            .finish()
    }
}

impl<T> Balancer<T> {
    /// Creates a new `Balancer` that scans `items` in the given order.
    pub fn new(items: Vec<Item<T>>) -> Self {
        Self::with_clock(items, WallClock::new())
    }

    pub fn with_clock(items: Vec<Item<T>>, clock: WallClock) -> Self {
        Self::with_rng(items, clock, StdRng::from_os_rng())
    }

    /// Creates a new `Balancer` whose shuffles are driven by `rng`.
    pub fn with_rng(items: Vec<Item<T>>, clock: WallClock, rng: StdRng) -> Self {
        Self {
            inner: RwLock::new(Inner {
                items,
                shuffle: false,
                rng,
            }),
            clock,
        }
    }

    /// Enable or disable shuffling of the scan order on each `acquire`.
    ///
    /// A shuffled order persists: later calls start from the last permutation.
    pub fn set_shuffle(&self, shuffle: bool) {
        self.inner.write().shuffle = shuffle;
    }

    pub fn is_shuffled(&self) -> bool {
        self.inner.read().shuffle
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// Sum of every item's per-second ceiling, saturating at `usize::MAX`.
    pub fn total_max_requests(&self) -> usize {
        self.inner
            .read()
            .items
            .iter()
            .map(Item::max_requests)
            .fold(0, usize::saturating_add)
    }

    /// Claims still available across all items in the current second.
    ///
    /// Items whose window has expired count as fully available. Saturates at `usize::MAX`.
    pub fn total_free_requests(&self) -> usize {
        let inner = self.inner.read();
        let now = self.clock.unix_secs();
        inner
            .items
            .iter()
            .map(|item| item.available(now))
            .fold(0, usize::saturating_add)
    }

    /// Per-item usage, in current scan order.
    pub fn snapshot(&self) -> Vec<ItemStats<T>> {
        let inner = self.inner.read();
        let now = self.clock.unix_secs();
        inner
            .items
            .iter()
            .map(|item| ItemStats {
                resource: Arc::clone(item.resource()),
                max_requests: item.max_requests(),
                num_requests: if item.window() == now {
                    item.num_requests()
                } else {
                    0
                },
                available: item.available(now),
            })
            .collect()
    }

    /// Claims the first item with spare capacity and returns its resource.
    ///
    /// Returns `None` if every item is saturated for the current second.
    pub fn acquire(&self) -> Option<Arc<T>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;

        if inner.shuffle {
            inner.items.shuffle(&mut inner.rng);
            debug!(items = inner.items.len(), "shuffled scan order");
        }

        let now = self.clock.unix_secs();
        for (index, item) in inner.items.iter_mut().enumerate() {
            if item.is_saturated(now) {
                continue;
            }
            let count = item.claim(now);
            trace!(index, count, window = now, "claimed item");
            return Some(Arc::clone(item.resource()));
        }

        trace!(window = now, "all items saturated");
        None
    }
}
