use std::sync::Arc;

/// A poolable resource together with its usage in the current one-second window.
///
/// Items do no locking of their own. They are only mutated through a [`crate::Balancer`],
/// which gates every [`Item::claim`] behind [`Item::is_saturated`] inside one critical section.
#[derive(Debug)]
pub struct Item<T> {
    resource: Arc<T>,
    max_requests: usize,
    num_requests: usize,
    /// Epoch second that `num_requests` belongs to.
    window: u64,
}

impl<T> Item<T> {
    /// Creates a new `Item`.
    ///
    /// # Arguments
    ///
    /// * `resource` - The wrapped resource handed out on a successful claim.
    /// * `max_requests` - The most claims allowed within a single second. Zero means the
    ///   item is never eligible.
    pub fn new(resource: T, max_requests: usize) -> Self {
        Self::from_arc(Arc::new(resource), max_requests)
    }

    /// Creates a new `Item` around a resource that is already shared.
    pub fn from_arc(resource: Arc<T>, max_requests: usize) -> Self {
        Self {
            resource,
            max_requests,
            num_requests: 0,
            window: 0,
        }
    }

    pub fn resource(&self) -> &Arc<T> {
        &self.resource
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Raw counter value, which may belong to an expired window.
    pub fn num_requests(&self) -> usize {
        self.num_requests
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    /// Returns true if no more claims are allowed during second `now`.
    ///
    /// Usage recorded against an older window never counts.
    #[inline]
    pub fn is_saturated(&self, now: u64) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        self.window == now && self.num_requests >= self.max_requests
    }

    /// Records one claim during second `now` and returns the new count.
    ///
    /// A new window resets the counter first. This does not check saturation, so claiming
    /// a saturated item overshoots its ceiling.
    #[inline]
    pub fn claim(&mut self, now: u64) -> usize {
        if self.window != now {
            self.window = now;
            self.num_requests = 0;
        }
        self.num_requests += 1;
        self.num_requests
    }

    /// Claims still available during second `now`.
    pub fn available(&self, now: u64) -> usize {
        if self.window == now {
            self.max_requests.saturating_sub(self.num_requests)
        } else {
            self.max_requests
        }
    }
}
