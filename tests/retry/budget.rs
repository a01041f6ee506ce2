use super::{get, respond, Transport};
use http::StatusCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::util::BoxCloneService;
use tower::{Layer, Service, ServiceExt};
use tower_outbound_core::{OutboundError, OutboundRequest};
use tower_outbound_retry::{RetryBudget, RetryLayer};

/// `/hang` never answers; `/flaky` fails its first attempt.
fn transport(flaky_calls: Arc<AtomicUsize>) -> Transport {
    BoxCloneService::new(tower::service_fn(move |req: OutboundRequest<bytes::Bytes>| {
        let hang = req.uri().path() == "/hang";
        let n = if hang {
            0
        } else {
            flaky_calls.fetch_add(1, Ordering::SeqCst)
        };
        async move {
            if hang {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok::<_, OutboundError>(respond(if n == 0 {
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                StatusCode::OK
            }))
        }
    }))
}

#[tokio::test(start_paused = true)]
async fn a_lone_retry_exceeds_a_partial_budget() {
    let budget = Arc::new(RetryBudget::new(0.5).named("ledger"));
    let refused = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&refused);
    let flaky = Arc::new(AtomicUsize::new(0));

    let mut service = RetryLayer::builder()
        .retry_count(3)
        .fixed_backoff(Duration::from_millis(10))
        .budget(Arc::clone(&budget))
        .on_budget_exceeded(move |attempt, ratio| {
            assert_eq!(attempt, 1);
            assert_eq!(ratio, 1.0);
            r.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .layer(transport(Arc::clone(&flaky)));

    let err = service.ready().await.unwrap().call(get("/flaky")).await.unwrap_err();
    match err {
        OutboundError::RetryBudgetExceeded {
            name,
            ratio,
            threshold,
        } => {
            assert_eq!(name, "ledger");
            assert_eq!(ratio, 1.0);
            assert_eq!(threshold, 0.5);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(flaky.load(Ordering::SeqCst), 1);
    assert_eq!(refused.load(Ordering::SeqCst), 1);
    assert_eq!(budget.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn background_load_makes_room_for_retries() {
    let budget = Arc::new(RetryBudget::new(0.5));
    let flaky = Arc::new(AtomicUsize::new(0));
    let service = RetryLayer::builder()
        .retry_count(1)
        .fixed_backoff(Duration::from_millis(10))
        .budget(Arc::clone(&budget))
        .build()
        .layer(transport(Arc::clone(&flaky)));

    let mut hanging = Vec::new();
    for _ in 0..3 {
        let mut svc = service.clone();
        hanging.push(tokio::spawn(async move {
            svc.ready().await.unwrap().call(get("/hang")).await
        }));
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(budget.in_flight(), 3);
    assert_eq!(budget.retries_in_flight(), 0);

    let mut svc = service.clone();
    let response = svc.ready().await.unwrap().call(get("/flaky")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(flaky.load(Ordering::SeqCst), 2);

    for handle in &hanging {
        handle.abort();
    }
    for handle in hanging {
        assert!(handle.await.unwrap_err().is_cancelled());
    }
    assert_eq!(budget.in_flight(), 0);
    assert_eq!(budget.retries_in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn a_zero_budget_never_retries() {
    let budget = Arc::new(RetryBudget::from_percentage(0.0));
    let flaky = Arc::new(AtomicUsize::new(0));
    let mut service = RetryLayer::builder()
        .budget(budget)
        .build()
        .layer(transport(Arc::clone(&flaky)));

    let err = service.ready().await.unwrap().call(get("/flaky")).await.unwrap_err();
    assert!(err.is_retry_budget_exceeded());
    assert!(err.is_terminal());
    assert_eq!(flaky.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn a_full_budget_behaves_like_no_budget() {
    let budget = Arc::new(RetryBudget::from_percentage(100.0));
    let flaky = Arc::new(AtomicUsize::new(0));
    let mut service = RetryLayer::builder()
        .fixed_backoff(Duration::from_millis(10))
        .budget(Arc::clone(&budget))
        .build()
        .layer(transport(Arc::clone(&flaky)));

    let response = service.ready().await.unwrap().call(get("/flaky")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(budget.in_flight(), 0);
}
