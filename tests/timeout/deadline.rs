use super::{cooperative, get};
use bytes::Bytes;
use http::Response;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};
use tower_outbound_core::{OutboundError, OutboundRequest};
use tower_outbound_timeout::AttemptTimeoutLayer;

#[tokio::test(start_paused = true)]
async fn the_deadline_fails_the_attempt_with_a_retryable_timeout() {
    let timeouts = Arc::new(Mutex::new(Vec::new()));
    let t = Arc::clone(&timeouts);
    let layer = AttemptTimeoutLayer::builder()
        .timeout(Duration::from_millis(250))
        .on_timeout(move |timeout| t.lock().push(timeout))
        .build();
    let mut service = layer.layer(tower::service_fn(|req: OutboundRequest| {
        cooperative(req, Duration::from_secs(5))
    }));

    let started = tokio::time::Instant::now();
    let err = service.ready().await.unwrap().call(get("/items")).await.unwrap_err();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(250) && elapsed < Duration::from_millis(260));
    match err {
        OutboundError::Timeout { timeout } => assert_eq!(timeout, Duration::from_millis(250)),
        other => panic!("expected timeout, got {other}"),
    }
    assert!(OutboundError::Timeout {
        timeout: Duration::ZERO
    }
    .is_retryable());
    assert_eq!(*timeouts.lock(), vec![Duration::from_millis(250)]);
}

#[tokio::test(start_paused = true)]
async fn responses_inside_the_deadline_pass_through_untouched() {
    let successes = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&successes);
    let layer = AttemptTimeoutLayer::builder()
        .timeout(Duration::from_secs(1))
        .on_success(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let mut service = layer.layer(tower::service_fn(|req: OutboundRequest| {
        cooperative(req, Duration::from_millis(999))
    }));

    let response = service.ready().await.unwrap().call(get("/items")).await.unwrap();
    assert_eq!(response.body(), &Bytes::from_static(b"done"));
    assert_eq!(successes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_errors_are_reported_as_errors() {
    let errors = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&errors);
    let layer = AttemptTimeoutLayer::builder()
        .on_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        })
        .build();
    let mut service = layer.layer(tower::service_fn(|_req: OutboundRequest| async {
        Err::<Response<Bytes>, _>(OutboundError::transport("connection refused"))
    }));

    let err = service.ready().await.unwrap().call(get("/items")).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn every_attempt_gets_a_full_budget() {
    let layer = AttemptTimeoutLayer::builder()
        .timeout(Duration::from_millis(100))
        .build();
    let service = layer.layer(tower::service_fn(|req: OutboundRequest| {
        cooperative(req, Duration::from_millis(80))
    }));

    for _ in 0..3 {
        let mut svc = service.clone();
        tokio::time::sleep(Duration::from_millis(70)).await;
        svc.ready().await.unwrap().call(get("/items")).await.unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_attempts_have_independent_deadlines() {
    let layer = AttemptTimeoutLayer::builder()
        .timeout(Duration::from_millis(100))
        .build();
    let service = layer.layer(tower::service_fn(|req: OutboundRequest| {
        let delay = if req.uri().path() == "/slow" {
            Duration::from_millis(500)
        } else {
            Duration::from_millis(50)
        };
        cooperative(req, delay)
    }));

    let mut fast = service.clone();
    let mut slow = service;
    let (fast, slow) = tokio::join!(
        fast.ready().await.unwrap().call(get("/fast")),
        slow.ready().await.unwrap().call(get("/slow")),
    );
    assert!(fast.is_ok());
    assert!(slow.unwrap_err().is_timeout());
}
