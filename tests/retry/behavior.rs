use super::{get, respond};
use http::StatusCode;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, Service, ServiceExt};
use tower_outbound_core::{CancellationToken, OutboundError, OutboundRequest};
use tower_outbound_retry::{RetryLayer, RetryReason};

#[tokio::test(start_paused = true)]
async fn retries_server_errors_until_success() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let transport = tower::service_fn(move |req: OutboundRequest<bytes::Bytes>| {
        let attempt = req.signals().retry_attempt();
        s.lock().push(attempt);
        async move {
            Ok::<_, OutboundError>(if attempt < 2 {
                respond(StatusCode::BAD_GATEWAY)
            } else {
                respond(StatusCode::OK)
            })
        }
    });

    let successes = Arc::new(AtomicUsize::new(0));
    let s = Arc::clone(&successes);
    let layer = RetryLayer::builder()
        .retry_count(3)
        .fixed_backoff(Duration::from_millis(50))
        .on_success(move |attempts| {
            s.store(attempts, Ordering::SeqCst);
        })
        .build();
    let mut service = layer.layer(transport);

    let response = service.ready().await.unwrap().call(get("/entries")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(*seen.lock(), vec![0, 1, 2]);
    assert_eq!(successes.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn client_errors_are_returned_at_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let transport = tower::service_fn(move |_req: OutboundRequest<bytes::Bytes>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, OutboundError>(respond(StatusCode::NOT_FOUND)) }
    });

    let mut service = RetryLayer::builder().retry_count(5).build().layer(transport);
    let response = service.ready().await.unwrap().call(get("/missing")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn exhaustion_returns_the_last_response() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let transport = tower::service_fn(move |_req: OutboundRequest<bytes::Bytes>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, OutboundError>(respond(StatusCode::INTERNAL_SERVER_ERROR)) }
    });

    let exhausted = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&exhausted);
    let mut service = RetryLayer::builder()
        .retry_count(2)
        .fixed_backoff(Duration::from_millis(10))
        .on_exhausted(move |attempts| {
            e.store(attempts, Ordering::SeqCst);
        })
        .build()
        .layer(transport);

    let response = service.ready().await.unwrap().call(get("/entries")).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(exhausted.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn zero_retries_means_a_single_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let transport = tower::service_fn(move |_req: OutboundRequest<bytes::Bytes>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, OutboundError>(respond(StatusCode::SERVICE_UNAVAILABLE)) }
    });

    let mut service = RetryLayer::builder().retry_count(0).build().layer(transport);
    let response = service.ready().await.unwrap().call(get("/entries")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_failures_retry_but_other_failures_do_not() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let transport = tower::service_fn(move |_req: OutboundRequest<bytes::Bytes>| {
        let n = c.fetch_add(1, Ordering::SeqCst);
        async move {
            Err::<http::Response<bytes::Bytes>, _>(if n == 0 {
                OutboundError::transport(std::io::Error::from(std::io::ErrorKind::ConnectionReset))
            } else {
                OutboundError::other("malformed response")
            })
        }
    });

    let reasons = Arc::new(Mutex::new(Vec::new()));
    let r = Arc::clone(&reasons);
    let not_retried = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&not_retried);
    let mut service = RetryLayer::builder()
        .retry_count(4)
        .fixed_backoff(Duration::from_millis(10))
        .on_retry(move |_, _, reason| r.lock().push(reason))
        .on_not_retried(move |attempts| {
            n.store(attempts, Ordering::SeqCst);
        })
        .build()
        .layer(transport);

    let err = service.ready().await.unwrap().call(get("/entries")).await.unwrap_err();
    assert!(matches!(err, OutboundError::Other(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*reasons.lock(), vec![RetryReason::Transport]);
    assert_eq!(not_retried.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn jittered_delays_stay_within_seed_and_cap() {
    let transport = tower::service_fn(|_req: OutboundRequest<bytes::Bytes>| async {
        Ok::<_, OutboundError>(respond(StatusCode::BAD_GATEWAY))
    });

    let delays = Arc::new(Mutex::new(Vec::new()));
    let d = Arc::clone(&delays);
    let mut service = RetryLayer::builder()
        .retry_count(6)
        .seed_delay(Duration::from_millis(100))
        .max_delay(Duration::from_secs(1))
        .on_retry(move |_, delay, _| d.lock().push(delay))
        .build()
        .layer(transport);

    let _ = service.ready().await.unwrap().call(get("/entries")).await;

    let delays = delays.lock();
    assert_eq!(delays.len(), 6);
    for delay in delays.iter() {
        assert!(*delay >= Duration::from_millis(100), "{delay:?} below seed");
        assert!(*delay <= Duration::from_secs(1), "{delay:?} above cap");
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_backoff_sleep() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let transport = tower::service_fn(move |_req: OutboundRequest<bytes::Bytes>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, OutboundError>(respond(StatusCode::SERVICE_UNAVAILABLE)) }
    });

    let mut service = RetryLayer::builder()
        .retry_count(3)
        .fixed_backoff(Duration::from_secs(10))
        .build()
        .layer(transport);

    let token = CancellationToken::new();
    let request = OutboundRequest::with_cancellation(get("/entries").into_http(), token.clone());
    let call = tokio::spawn(service.ready().await.unwrap().call(request));

    tokio::time::sleep(Duration::from_secs(1)).await;
    token.cancel();

    let err = call.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn clones_share_configuration_but_not_calls() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let transport = tower::service_fn(move |_req: OutboundRequest<bytes::Bytes>| {
        c.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, OutboundError>(respond(StatusCode::OK)) }
    });

    let service = RetryLayer::builder().name("ledger").build().layer(transport);
    let mut a = service.clone();
    let mut b = service;
    assert_eq!(a.config().name(), "ledger");

    let (ra, rb) = tokio::join!(
        a.ready().await.unwrap().call(get("/a")),
        b.ready().await.unwrap().call(get("/b")),
    );
    assert!(ra.is_ok() && rb.is_ok());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
