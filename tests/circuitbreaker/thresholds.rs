use super::{send, transport, Transport};
use tower_outbound_core::OutboundRequest;
use tower::Layer;
use tower_outbound_circuitbreaker::{CircuitBreakerLayer, CircuitState, Outcome};

#[tokio::test]
async fn below_minimum_throughput_never_opens() {
    let mut service = CircuitBreakerLayer::builder()
        .failure_threshold(0.1)
        .minimum_throughput(10)
        .build()
        .layer(transport());

    for _ in 0..9 {
        send(&mut service, "/fail").await.unwrap();
    }
    assert_eq!(service.state(), CircuitState::Closed);
    assert_eq!(service.metrics().failure_rate, 1.0);

    send(&mut service, "/fail").await.unwrap();
    assert_eq!(service.state(), CircuitState::Open);
}

#[tokio::test]
async fn opens_when_the_rate_reaches_the_threshold() {
    let mut service = CircuitBreakerLayer::builder()
        .failure_threshold(0.5)
        .minimum_throughput(4)
        .build()
        .layer(transport());

    send(&mut service, "/ok").await.unwrap();
    send(&mut service, "/ok").await.unwrap();
    send(&mut service, "/fail").await.unwrap();
    assert_eq!(service.state(), CircuitState::Closed);

    send(&mut service, "/reset").await.unwrap_err();
    assert_eq!(service.state(), CircuitState::Open);

    let err = send(&mut service, "/ok").await.unwrap_err();
    assert!(err.is_circuit_open());
}

#[tokio::test]
async fn stays_closed_below_the_threshold() {
    let mut service = CircuitBreakerLayer::builder()
        .failure_threshold(0.5)
        .minimum_throughput(4)
        .build()
        .layer(transport());

    for path in ["/ok", "/ok", "/ok", "/fail", "/ok", "/fail"] {
        send(&mut service, path).await.unwrap();
    }
    let metrics = service.metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
    assert_eq!(metrics.total_calls, 6);
    assert_eq!(metrics.failure_count, 2);
    assert_eq!(metrics.success_count, 4);
}

#[tokio::test]
async fn successes_alone_never_open_even_at_zero_threshold() {
    let mut service = CircuitBreakerLayer::builder()
        .failure_threshold(0.0)
        .minimum_throughput(1)
        .build()
        .layer(transport());

    for _ in 0..20 {
        send(&mut service, "/ok").await.unwrap();
    }
    assert_eq!(service.state(), CircuitState::Closed);

    send(&mut service, "/fail").await.unwrap();
    assert_eq!(service.state(), CircuitState::Open);
}

#[tokio::test]
async fn client_errors_count_as_successes() {
    let mut service = CircuitBreakerLayer::builder()
        .failure_threshold(0.5)
        .minimum_throughput(2)
        .build()
        .layer(transport());

    for _ in 0..5 {
        send(&mut service, "/missing").await.unwrap();
    }
    assert_eq!(service.metrics().failure_count, 0);
    assert_eq!(service.state(), CircuitState::Closed);
}

#[tokio::test]
async fn custom_classifier_decides_what_fails() {
    let mut service = CircuitBreakerLayer::builder()
        .failure_threshold(0.5)
        .minimum_throughput(2)
        .classify_with(|outcome| matches!(outcome, Outcome::Status(s) if s.as_u16() == 404))
        .build()
        .layer(transport());

    send(&mut service, "/fail").await.unwrap();
    send(&mut service, "/fail").await.unwrap();
    assert_eq!(service.state(), CircuitState::Closed);

    send(&mut service, "/missing").await.unwrap();
    send(&mut service, "/missing").await.unwrap();
    assert_eq!(service.state(), CircuitState::Open);
}

#[tokio::test]
async fn a_tiny_threshold_opens_after_the_minimum_throughput() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let hits = Arc::new(AtomicUsize::new(0));
    let h = Arc::clone(&hits);
    let counted: Transport = tower::util::BoxCloneService::new(tower::ServiceExt::map_request(
        transport(),
        move |req: OutboundRequest| {
            h.fetch_add(1, Ordering::SeqCst);
            req
        },
    ));
    let mut service = CircuitBreakerLayer::builder()
        .failure_threshold(0.000_000_1)
        .minimum_throughput(2)
        .build()
        .layer(counted);

    for _ in 0..10 {
        let _ = send(&mut service, "/fail").await;
    }
    assert_eq!(service.state(), CircuitState::Open);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let err = send(&mut service, "/fail").await.unwrap_err();
    assert!(err.is_circuit_open());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}
