//! X-Request-Id propagation.

use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request, Response},
};
use tower::{Layer, Service};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied id that is propagated as is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Returns the client's request id when it is usable.
fn incoming_id(headers: &HeaderMap) -> Option<HeaderValue> {
    let value = headers.get(&REQUEST_ID_HEADER)?;
    let text = value.to_str().ok()?;

    (!text.is_empty() && text.len() <= MAX_REQUEST_ID_LEN).then(|| value.clone())
}

fn generate_id() -> HeaderValue {
    // Un UUID siempre es un header valido
    HeaderValue::from_str(&Uuid::new_v4().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("unknown"))
}

#[derive(Clone, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdMiddleware { inner }
    }
}

/// Gives every request an id and echoes it on the response.
#[derive(Clone)]
pub struct RequestIdMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestIdMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let id = incoming_id(request.headers()).unwrap_or_else(generate_id);
        request
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), id.clone());

        let mut inner = self.inner.clone();

        Box::pin(async move {
            let mut response = inner.call(request).await?;
            response.headers_mut().insert(REQUEST_ID_HEADER.clone(), id);
            Ok(response)
        })
    }
}
