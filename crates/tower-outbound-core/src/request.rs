//! The request type every interceptor receives.

use crate::signal::SignalContext;
use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri};
use tokio_util::sync::CancellationToken;

/// An outgoing HTTP request together with its call-scoped context.
///
/// Besides the `http::Request` itself it carries the call's
/// [`SignalContext`] and the caller's [`CancellationToken`]. Cloning a
/// request (as the retry engine does per attempt) shares both.
#[derive(Debug, Clone)]
pub struct OutboundRequest<B = Bytes> {
    request: Request<B>,
    signals: SignalContext,
    cancellation: CancellationToken,
}

impl<B> OutboundRequest<B> {
    /// Wraps a request with a fresh signal bag and a token that is never
    /// cancelled unless [`cancellation`](Self::cancellation) is used.
    pub fn new(request: Request<B>) -> Self {
        Self::with_cancellation(request, CancellationToken::new())
    }

    /// Wraps a request whose call may be cancelled through `cancellation`.
    pub fn with_cancellation(request: Request<B>, cancellation: CancellationToken) -> Self {
        Self {
            request,
            signals: SignalContext::new(),
            cancellation,
        }
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request.uri()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.request.headers_mut()
    }

    pub fn body(&self) -> &B {
        self.request.body()
    }

    pub fn signals(&self) -> &SignalContext {
        &self.signals
    }

    /// The cancellation signal in effect for this attempt.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Replaces the cancellation signal seen by interceptors further down.
    ///
    /// Used by the attempt timeout to hand the transport a token that
    /// fires on either its own deadline or the caller's cancellation.
    pub fn set_cancellation(&mut self, cancellation: CancellationToken) {
        self.cancellation = cancellation;
    }

    pub fn http(&self) -> &Request<B> {
        &self.request
    }

    pub fn http_mut(&mut self) -> &mut Request<B> {
        &mut self.request
    }

    pub fn into_http(self) -> Request<B> {
        self.request
    }

    /// Splits into the HTTP request and its call context.
    pub fn into_parts(self) -> (Request<B>, SignalContext, CancellationToken) {
        (self.request, self.signals, self.cancellation)
    }
}

impl<B> From<Request<B>> for OutboundRequest<B> {
    fn from(request: Request<B>) -> Self {
        Self::new(request)
    }
}
