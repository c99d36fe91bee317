//! # Tower Shot Balance
//!
//! `tower-shot-balance` dispatches requests across a pool of backend services, using a
//! [`shot_balance::Balancer`] to pick a backend with spare per-second capacity.
//!
//! ## Dispatch Modes
//!
//! 1. **Fail Fast**: If every backend is saturated, the request is rejected immediately
//!    with `ShotError::Overloaded`.
//! 2. **Wait**: With a [`WaitPolicy`], the service retries on a fixed cadence and fails with
//!    `ShotError::Exhausted` once the attempt budget runs out, or `ShotError::Cancelled`
//!    if its cancellation token fires (for example at shutdown).
//! 3. **Error Mapping**: Backend errors and `tower::timeout::error::Elapsed` are converted
//!    into the unified, cloneable [`ShotError`] domain.
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`ShotError`], allowing automatic conversion
//!   to HTTP status codes (408, 503, 500).

mod error;
mod service;
mod utils;

#[cfg(test)]
mod tests;

pub use error::ShotError;
pub use service::BalanceService;
pub use shot_balance::WaitPolicy;
pub use utils::make_fail_fast_svc;
pub use utils::make_wait_svc;
