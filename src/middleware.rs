//! Per-request scope management for tower/axum stacks.

use crate::inject::{Factory, RequestContext, RequestId};
use axum::http::{HeaderValue, Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

/// Correlation header; echoed back on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tower layer that gives every request its own injection scope
///
/// The inner service runs inside a [`RequestContext`] keyed by a trace identifier
/// generated for this request alone; a caller-supplied `x-request-id` is only
/// echoed back for correlation. The request's scope is disposed once the response
/// is produced, the inner service fails, or the future is dropped.
///
/// # Example
/// ```
/// use autoinject::{Factory, RequestScopeLayer};
/// use axum::{Router, routing::get};
/// use std::sync::Arc;
///
/// let factory = Arc::new(Factory::default());
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .layer(RequestScopeLayer::new(factory));
/// ```
#[derive(Clone)]
pub struct RequestScopeLayer {
    factory: Arc<Factory>,
}

impl RequestScopeLayer {
    pub fn new(factory: Arc<Factory>) -> Self {
        Self { factory }
    }
}

impl<S> Layer<S> for RequestScopeLayer {
    type Service = RequestScopeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestScopeService {
            inner,
            factory: self.factory.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RequestScopeService<S> {
    inner: S,
    factory: Arc<Factory>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestScopeService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // the clone that was polled ready handles this request
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let trace_id = Uuid::new_v4().to_string();
        let correlation_id = correlation_id_of(&req).unwrap_or_else(|| trace_id.clone());
        let guard = ScopeGuard {
            factory: self.factory.clone(),
            request_id: RequestId::for_trace(&trace_id),
        };

        Box::pin(RequestContext::scope(trace_id.clone(), async move {
            let _guard = guard;
            let mut response = inner.call(req).await?;
            if let Ok(value) = HeaderValue::from_str(&correlation_id) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            Ok::<_, S::Error>(response)
        }))
    }
}

fn correlation_id_of<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

struct ScopeGuard {
    factory: Arc<Factory>,
    request_id: RequestId,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        self.factory.dispose_scope(&self.request_id);
    }
}
