use std::fmt;
use std::future::Future;

tokio::task_local! {
    /// Trace identifier of the HTTP request the current task is serving.
    static HTTP_TRACE_ID: String;
}

/// Key of a logical request in the engine's scope table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    /// Id of the HTTP request carrying `trace_id`.
    pub fn for_trace(trace_id: &str) -> Self {
        RequestId(format!("http-{trace_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ambient sources of request identity, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestIdSource {
    /// Trace identifier set by [`RequestContext`] for the current task.
    Http,
    /// The current `tracing` span.
    Activity,
    /// The calling thread; always available.
    Thread,
}

pub const REQUEST_ID_SOURCES: [RequestIdSource; 3] = [
    RequestIdSource::Http,
    RequestIdSource::Activity,
    RequestIdSource::Thread,
];

impl RequestIdSource {
    /// Probe this source; unavailable sources yield `None`.
    pub fn lookup(self) -> Option<RequestId> {
        match self {
            RequestIdSource::Http => HTTP_TRACE_ID
                .try_with(|trace_id| RequestId::for_trace(trace_id))
                .ok(),
            RequestIdSource::Activity => tracing::Span::current()
                .id()
                .map(|id| RequestId(format!("activity-{}", id.into_u64()))),
            RequestIdSource::Thread => {
                Some(RequestId(format!("thread-{:?}", std::thread::current().id())))
            }
        }
    }
}

/// Ambient HTTP request context.
pub struct RequestContext;

impl RequestContext {
    /// Run `future` as part of the request identified by `trace_id`.
    pub async fn scope<F: Future>(trace_id: impl Into<String>, future: F) -> F::Output {
        HTTP_TRACE_ID.scope(trace_id.into(), future).await
    }

    /// Synchronous variant of [`RequestContext::scope`].
    pub fn sync_scope<R>(trace_id: impl Into<String>, f: impl FnOnce() -> R) -> R {
        HTTP_TRACE_ID.sync_scope(trace_id.into(), f)
    }

    pub fn trace_id() -> Option<String> {
        HTTP_TRACE_ID.try_with(Clone::clone).ok()
    }

    /// The request id the engine would use right now.
    pub fn current_request_id() -> RequestId {
        REQUEST_ID_SOURCES
            .iter()
            .find_map(|source| source.lookup())
            .unwrap_or_else(|| RequestId("thread-unknown".to_string()))
    }
}
