//! Request ID middleware for correlating logs with requests.
//!
//! Every request gets a UUID v4, echoed back in `x-request-id`, and runs
//! inside a span carrying that id so all of its log lines can be grouped.
//! Request counts and latencies are recorded per method and status.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Request ID stored in the request extensions.
#[derive(Clone, Debug)]
pub struct RequestId(pub Uuid);

/// Generates a request ID and wraps the request in a span.
///
/// Install as the outermost layer so the span covers every other middleware.
pub async fn request_id_layer(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        duration_ms = tracing::field::Empty,
    );

    let method = request.method().to_string();
    let start = Instant::now();
    request.extensions_mut().insert(RequestId(request_id));

    async move {
        let mut response = next.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let status = response.status().as_u16().to_string();
        metrics::counter!("http_requests_total", "method" => method.clone(), "status" => status.clone())
            .increment(1);
        metrics::histogram!("http_request_duration_seconds", "method" => method, "status" => status)
            .record(start.elapsed().as_secs_f64());

        tracing::Span::current().record("duration_ms", duration_ms);
        tracing::info!(
            status = response.status().as_u16(),
            duration_ms,
            "request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}
