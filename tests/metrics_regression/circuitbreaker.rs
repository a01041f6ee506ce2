use super::helpers::*;
use http::StatusCode;
use serial_test::serial;
use tower::{Layer, Service, ServiceExt};
use tower_outbound_circuitbreaker::CircuitBreakerLayer;
use tower_outbound_core::{OutboundError, OutboundRequest};

#[tokio::test]
#[serial]
async fn circuitbreaker_metrics_exist() {
    init_recorder();

    let transport = tower::service_fn(|_req: OutboundRequest| async {
        Ok::<_, OutboundError>(respond(StatusCode::SERVICE_UNAVAILABLE))
    });
    let mut service = CircuitBreakerLayer::builder()
        .name("metrics_breaker")
        .minimum_throughput(2)
        .build()
        .layer(transport);

    for _ in 0..2 {
        service.ready().await.unwrap().call(get("/")).await.unwrap();
    }
    assert!(service.ready().await.unwrap().call(get("/")).await.is_err());

    assert_counter_exists("circuitbreaker_calls_total");
    assert_metric_has_label("circuitbreaker_calls_total", "circuitbreaker", "metrics_breaker");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "failure");
    assert_metric_has_label("circuitbreaker_calls_total", "outcome", "rejected");
    assert_histogram_exists("circuitbreaker_call_duration_seconds");
    assert_counter_exists("circuitbreaker_transitions_total");
    assert_gauge_exists("circuitbreaker_state");
}
