//! Attaches configured headers (credentials, tracing ids) to every outgoing request

use http::HeaderMap;
use tower::{Layer, Service};

/// [`Layer`] that fills in headers the request does not already carry
#[derive(Clone, Debug, Default)]
pub struct DefaultHeadersLayer {
    headers: HeaderMap,
}

impl DefaultHeadersLayer {
    /// Creates a layer that adds `headers` to requests lacking them
    pub fn new(headers: impl Into<HeaderMap>) -> DefaultHeadersLayer {
        DefaultHeadersLayer {
            headers: headers.into(),
        }
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeaders<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeaders {
            headers: self.headers.clone(),
            inner,
        }
    }
}

/// Service produced by [`DefaultHeadersLayer`]
#[derive(Clone, Debug)]
pub struct DefaultHeaders<S> {
    headers: HeaderMap,
    inner: S,
}

impl<B, S> Service<http::Request<B>> for DefaultHeaders<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<B>) -> Self::Future {
        let headers = req.headers_mut();
        for (name, value) in self.headers.iter() {
            if !headers.contains_key(name) {
                headers.insert(name.clone(), value.clone());
            }
        }
        self.inner.call(req)
    }
}
