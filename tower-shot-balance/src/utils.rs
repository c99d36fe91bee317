use std::sync::Arc;
use std::time::Duration;

use shot_balance::Balancer;
use shot_balance::WaitPolicy;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::util::BoxCloneSyncService;

use crate::BalanceService;
use crate::ShotError;

/// Reject requests as soon as every backend is saturated
pub fn make_fail_fast_svc<S, Req, Resp>(
    balancer: Arc<Balancer<S>>,
) -> BoxCloneSyncService<Req, Resp, BoxError>
where
    S: Service<Req, Response = Resp> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    Resp: Send + 'static,
    Req: Send + 'static,
{
    BoxCloneSyncService::new(BalanceService::new(balancer))
}

/// Wait for a backend, bounding the whole request with a single unified timeout
pub fn make_wait_svc<S, Req, Resp>(
    balancer: Arc<Balancer<S>>,
    policy: WaitPolicy,
    cancel: CancellationToken,
    timeout: Duration,
) -> BoxCloneSyncService<Req, Resp, BoxError>
where
    S: Service<Req, Response = Resp> + Clone + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
    Resp: Send + 'static,
    Req: Send + 'static,
{
    BoxCloneSyncService::new(
        ServiceBuilder::new()
            .map_err(|err: BoxError| {
                if err.is::<tower::timeout::error::Elapsed>() {
                    BoxError::from(ShotError::Timeout)
                } else {
                    err
                }
            })
            .timeout(timeout)
            .service(
                BalanceService::new(balancer)
                    .with_wait(policy)
                    .with_cancellation(cancel),
            ),
    )
}
