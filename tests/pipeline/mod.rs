//! Pipeline tests.
//!
//! Test organization:
//! - composition.rs: how retry, breaker and timeout interact in order
//! - measurement.rs: a latency layer stacked outside the pipeline
//! - settings.rs: building a pipeline from deserialized settings


use bytes::Bytes;
use http::{Request, Response, StatusCode};
use tower_outbound::OutboundRequest;

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub(crate) fn get(path: &str) -> OutboundRequest {
    OutboundRequest::new(
        Request::get(format!("http://orders{path}"))
            .body(Bytes::new())
            .unwrap(),
    )
}

pub(crate) fn respond(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}
