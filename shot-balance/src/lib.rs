//! # shot-balance
//!
//! `shot-balance` picks one of several capacity-bounded resources ("items") to serve a unit
//! of work, while capping how many units each item may receive within a one-second window.
//!
//! ## Core Philosophy
//!
//! Every item carries a per-second ceiling. A [`Balancer`] scans its items, in construction
//! order or in a shuffled order, and claims the first one that still has capacity in the
//! current second. The whole scan-and-claim runs under a single write lock, so two callers
//! can never both take the last unit of the same item.
//!
//! ## Key Concepts
//!
//! * **Lazy Windows**: An item's counter belongs to the epoch second it was last claimed in.
//!   Once the clock moves on, the item is fresh again. There is no background sweeper.
//! * **Fail Fast or Wait**: [`Balancer::acquire`] answers immediately. [`Balancer::acquire_wait`]
//!   retries on a fixed cadence until it succeeds, runs out of attempts or is cancelled.
//! * **Collapsed Failures**: Failure is `None`. Callers that care why can use
//!   [`Balancer::try_acquire_wait`], which reports [`Reason::Exhausted`] or
//!   [`Reason::Cancelled`]. [`Reason::Saturated`] describes a failed [`Balancer::acquire`]
//!   for fail fast callers that want the same error domain.
//!
//! ## Example
//!
//! ```rust
//! use shot_balance::Balancer;
//! use shot_balance::Item;
//!
//! let balancer = Balancer::new(vec![
//!     Item::new("primary", 2),
//!     Item::new("secondary", 1),
//! ]);
//!
//! assert_eq!(balancer.total_max_requests(), 3);
//!
//! if let Some(backend) = balancer.acquire() {
//!     // Dispatch work to `backend`
//!     assert_eq!(*backend, "primary");
//! }
//! ```

mod balancer;
mod clock;
mod item;
mod wait;

pub use balancer::Balancer;
pub use balancer::ItemStats;
pub use clock::WallClock;
pub use item::Item;
pub use wait::WaitPolicy;

/// Why an acquisition produced no item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Reason {
    /// Every item had reached its per-second ceiling.
    ///
    /// Never produced by [`Balancer::try_acquire_wait`]; fail fast callers map a `None`
    /// from [`Balancer::acquire`] to this.
    #[error("all items are saturated for the current window")]
    Saturated,

    /// The retry budget ran out before any item became available.
    #[error("no item became available within {attempts} attempts")]
    Exhausted {
        /// The attempt budget that was exhausted.
        attempts: usize,
    },

    /// The wait was cancelled before any item became available.
    #[error("wait for an available item was cancelled")]
    Cancelled,
}
