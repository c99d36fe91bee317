use std::fmt;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use futures::future::BoxFuture;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::Counter;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tower::Service;
use tower::ServiceExt;
use tracing::debug;

use shot_balance::Balancer;
use shot_balance::Reason;
use shot_balance::WaitPolicy;

use crate::error::ShotError;

#[derive(Clone, Debug)]
struct BalanceServiceMetrics {
    acquired: Counter<u64>,
    rejected: Counter<u64>,
}

impl BalanceServiceMetrics {
    fn new() -> Self {
        let meter = global::meter("balance_service");
        Self {
            acquired: meter.u64_counter("balance_acquired").build(),
            rejected: meter.u64_counter("balance_rejected").build(),
        }
    }
}

fn reason_label(reason: &Reason) -> &'static str {
    match reason {
        Reason::Saturated => "saturated",
        Reason::Exhausted { .. } => "exhausted",
        Reason::Cancelled => "cancelled",
    }
}

/// Dispatches each request to a backend picked by a shared [`Balancer`].
///
/// The service is always ready; capacity is claimed in `call`, and the chosen backend is
/// cloned and driven to readiness for that single request.
pub struct BalanceService<S> {
    balancer: Arc<Balancer<S>>,
    wait: Option<WaitPolicy>,
    cancel: CancellationToken,
    instruments: BalanceServiceMetrics,
}

impl<S> Clone for BalanceService<S> {
    fn clone(&self) -> Self {
        Self {
            balancer: Arc::clone(&self.balancer),
            wait: self.wait,
            cancel: self.cancel.clone(),
            instruments: self.instruments.clone(),
        }
    }
}

impl<S> fmt::Debug for BalanceService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceService")
            .field("balancer", &self.balancer)
            .field("wait", &self.wait)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl<S> BalanceService<S> {
    /// Create a fail fast `BalanceService`.
    pub fn new(balancer: Arc<Balancer<S>>) -> Self {
        Self {
            balancer,
            wait: None,
            cancel: CancellationToken::new(),
            instruments: BalanceServiceMetrics::new(),
        }
    }

    /// Wait for a backend according to `policy` instead of failing immediately.
    pub fn with_wait(mut self, policy: WaitPolicy) -> Self {
        self.wait = Some(policy);
        self
    }

    /// Use `cancel` to abandon pending waits, for example at shutdown.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn balancer(&self) -> &Arc<Balancer<S>> {
        &self.balancer
    }
}

impl<S, Req> Service<Req> for BalanceService<S>
where
    S: Service<Req> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<S::Response, BoxError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let balancer = Arc::clone(&self.balancer);
        let wait = self.wait;
        let cancel = self.cancel.clone();
        let instruments = self.instruments.clone();

        Box::pin(async move {
            let acquired = match wait {
                Some(policy) => balancer.try_acquire_wait(&cancel, policy).await,
                None => balancer.acquire().ok_or(Reason::Saturated),
            };

            let backend = match acquired {
                Ok(backend) => {
                    instruments.acquired.add(1, &[]);
                    backend
                }
                Err(reason) => {
                    debug!(%reason, "no backend available");
                    instruments
                        .rejected
                        .add(1, &[KeyValue::new("reason", reason_label(&reason))]);
                    return Err(BoxError::from(ShotError::from(reason)));
                }
            };

            S::clone(&backend).oneshot(req).await.map_err(|err| {
                let err: BoxError = err.into();
                BoxError::from(ShotError::Inner(err.to_string()))
            })
        })
    }
}
