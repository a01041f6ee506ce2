//! Retry engine tests.
//!
//! Test organization:
//! - behavior.rs: attempt counting, outcomes and events
//! - retry_after.rs: `Retry-After` handling for 503 and 429
//! - budget.rs: the shared retry budget
//! - signal.rs: retries requested by downstream interceptors

mod behavior;
mod budget;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use tower_outbound_core::OutboundRequest;

pub(crate) fn get(path: &str) -> OutboundRequest<Bytes> {
    let request = Request::get(format!("http://ledger{path}"))
        .body(Bytes::new())
        .unwrap();
    OutboundRequest::new(request)
}

pub(crate) fn respond(status: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

pub(crate) fn respond_with_retry_after(status: StatusCode, value: &str) -> Response<Bytes> {
    let mut response = respond(status);
    response
        .headers_mut()
        .insert(http::header::RETRY_AFTER, value.parse().unwrap());
    response
}

pub(crate) type Transport = tower::util::BoxCloneService<
    OutboundRequest<Bytes>,
    Response<Bytes>,
    tower_outbound_core::OutboundError,
>;
