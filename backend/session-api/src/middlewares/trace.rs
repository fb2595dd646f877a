use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const TRACE_ID_HEADER: &str = "x-trace-id";

#[derive(Clone, Debug)]
pub struct RequestTraceContext {
    pub trace_id: String,
}

/// Propagates an x-trace-id across the request/response pair and wraps the
/// handler in a span carrying it, so log lines from one request can be
/// correlated across the QuizArena services.
pub async fn trace_context_middleware(mut request: Request, next: Next) -> Response {
    let trace_id = request
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);

    request.extensions_mut().insert(RequestTraceContext {
        trace_id: trace_id.clone(),
    });

    let header_value = HeaderValue::from_str(&trace_id).ok();

    // A freshly generated id travels downstream as a request header too, so
    // calls the handlers make to sibling services can reuse it.
    if let Some(value) = &header_value {
        request
            .headers_mut()
            .entry(HeaderName::from_static(TRACE_ID_HEADER))
            .or_insert(value.clone());
    }

    let span = tracing::info_span!("request", trace_id = %trace_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header_value {
        response
            .headers_mut()
            .entry(HeaderName::from_static(TRACE_ID_HEADER))
            .or_insert(value);
    }

    response
}
