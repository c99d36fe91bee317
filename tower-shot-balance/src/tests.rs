use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use futures::future::Ready;
use futures::future::ready;
use quanta::Clock;
use shot_balance::Balancer;
use shot_balance::Item;
use shot_balance::WaitPolicy;
use shot_balance::WallClock;
use tokio_util::sync::CancellationToken;
use tower::BoxError;
use tower::Service;
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;

use super::*;

#[derive(Clone)]
struct MockService {
    id: usize,
    count: Arc<AtomicUsize>,
    fail: bool,
}

impl MockService {
    fn new(id: usize) -> Self {
        Self {
            id,
            count: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    fn failing(id: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(id)
        }
    }

    fn hits(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Service<()> for MockService {
    type Response = usize;
    type Error = BoxError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        self.count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            ready(Err("backend exploded".into()))
        } else {
            ready(Ok(self.id))
        }
    }
}

fn pool(
    backends: &[MockService],
    max_requests: usize,
) -> (Arc<Balancer<MockService>>, Arc<quanta::Mock>) {
    let (clock, mock) = Clock::mock();
    let items = backends
        .iter()
        .map(|b| Item::new(b.clone(), max_requests))
        .collect();
    (
        Arc::new(Balancer::with_clock(items, WallClock::with_clock(clock))),
        mock,
    )
}

fn shot_error(err: BoxError) -> ShotError {
    err.downcast_ref::<ShotError>()
        .cloned()
        .expect("error should be a ShotError")
}

#[tokio::test]
async fn test_fail_fast_dispatch() {
    let backends = [MockService::new(0), MockService::new(1)];
    let (balancer, mock) = pool(&backends, 2);
    let mut service = BalanceService::new(balancer);

    for expected in [0, 0, 1, 1] {
        let id = service.ready().await.unwrap().call(()).await.unwrap();
        assert_eq!(id, expected);
    }

    let err = service.ready().await.unwrap().call(()).await.unwrap_err();
    assert_eq!(shot_error(err), ShotError::Overloaded);
    assert_eq!(backends[0].hits(), 2);
    assert_eq!(backends[1].hits(), 2);

    // Next window, the first backend is preferred again
    mock.increment(Duration::from_secs(1));
    let id = service.ready().await.unwrap().call(()).await.unwrap();
    assert_eq!(id, 0);
}

#[tokio::test(start_paused = true)]
async fn test_wait_dispatch_recovers() {
    let backends = [MockService::new(0)];
    let (balancer, mock) = pool(&backends, 1);
    let mut service = BalanceService::new(balancer).with_wait(WaitPolicy::new(
        5,
        Duration::from_millis(100),
    ));

    service.ready().await.unwrap().call(()).await.unwrap();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(250)).await;
        mock.increment(Duration::from_secs(1));
    });

    let id = service.ready().await.unwrap().call(()).await.unwrap();
    assert_eq!(id, 0);
    assert_eq!(backends[0].hits(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_wait_dispatch_exhausts() {
    let backends = [MockService::new(0)];
    let (balancer, _mock) = pool(&backends, 0);
    let mut service =
        BalanceService::new(balancer).with_wait(WaitPolicy::new(2, Duration::from_millis(10)));

    let err = service.ready().await.unwrap().call(()).await.unwrap_err();
    assert_eq!(shot_error(err), ShotError::Exhausted { attempts: 2 });
    assert_eq!(backends[0].hits(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_ends_waits() {
    let backends = [MockService::new(0)];
    let (balancer, _mock) = pool(&backends, 0);
    let cancel = CancellationToken::new();
    let service = BalanceService::new(balancer)
        .with_wait(WaitPolicy::new(1_000, Duration::from_secs(1)))
        .with_cancellation(cancel.clone());

    let pending = tokio::spawn(service.oneshot(()));
    tokio::time::sleep(Duration::from_millis(500)).await;
    cancel.cancel();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(shot_error(err), ShotError::Cancelled);
}

#[tokio::test]
async fn test_inner_errors_are_mapped() {
    let backends = [MockService::failing(0)];
    let (balancer, _mock) = pool(&backends, 1);
    let service = BalanceService::new(balancer);

    let err = service.oneshot(()).await.unwrap_err();
    assert_eq!(
        shot_error(err),
        ShotError::Inner("backend exploded".to_string())
    );
}

#[tokio::test]
async fn test_fail_fast_svc_sheds_load() {
    let backends = [MockService::new(0), MockService::new(1)];
    let (balancer, _mock) = pool(&backends, 1);
    let service: BoxCloneSyncService<(), usize, BoxError> = make_fail_fast_svc(balancer);

    let mut handles = vec![];
    for _ in 0..10 {
        let svc = service.clone();
        handles.push(tokio::spawn(async move { svc.oneshot(()).await }));
    }

    let mut success = 0;
    let mut failure = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => success += 1,
            Err(err) => {
                assert_eq!(shot_error(err), ShotError::Overloaded);
                failure += 1;
            }
        }
    }

    assert_eq!(success, 2);
    assert_eq!(failure, 8);
    assert_eq!(backends[0].hits() + backends[1].hits(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_wait_svc_times_out() {
    let backends = [MockService::new(0)];
    let (balancer, _mock) = pool(&backends, 0);
    let service: BoxCloneSyncService<(), usize, BoxError> = make_wait_svc(
        balancer,
        WaitPolicy::new(10, Duration::from_secs(1)),
        CancellationToken::new(),
        Duration::from_millis(1500),
    );

    let err = service.oneshot(()).await.unwrap_err();
    assert_eq!(shot_error(err), ShotError::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_wait_svc_shares_capacity_across_clones() {
    let backends = [MockService::new(0), MockService::new(1)];
    let (balancer, mock) = pool(&backends, 2);
    let service: BoxCloneSyncService<(), usize, BoxError> = make_wait_svc(
        Arc::clone(&balancer),
        WaitPolicy::new(3, Duration::from_millis(100)),
        CancellationToken::new(),
        Duration::from_secs(1),
    );

    let mut handles = vec![];
    for _ in 0..6 {
        let svc = service.clone();
        handles.push(tokio::spawn(async move { svc.oneshot(()).await }));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(balancer.total_free_requests(), 0);
    mock.increment(Duration::from_secs(1));

    let mut success = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            success += 1;
        }
    }

    // Four in the first window, the two waiters in the next
    assert_eq!(success, 6);
    assert_eq!(backends[0].hits(), 4);
    assert_eq!(backends[1].hits(), 2);
}

#[test]
fn test_reasons_map_to_errors() {
    use shot_balance::Reason;

    assert_eq!(ShotError::from(Reason::Saturated), ShotError::Overloaded);
    assert_eq!(
        ShotError::from(Reason::Exhausted { attempts: 3 }),
        ShotError::Exhausted { attempts: 3 }
    );
    assert_eq!(ShotError::from(Reason::Cancelled), ShotError::Cancelled);
}
