use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency for every route.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());
    let start = Instant::now();

    let response = next.run(req).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(elapsed);

    response
}

/// Collapses id-shaped path segments so label cardinality stays bounded.
/// Session ids are UUIDs; documents imported from the legacy stack may still
/// carry 24-hex ObjectIds, so both fold into the same placeholder.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|seg| if looks_like_id(seg) { "{id}" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

fn looks_like_id(seg: &str) -> bool {
    match seg.len() {
        0 => false,
        // canonical UUID, 8-4-4-4-12
        36 => seg.chars().all(|c| c.is_ascii_hexdigit() || c == '-'),
        // Mongo ObjectId
        24 => seg.chars().all(|c| c.is_ascii_hexdigit()),
        _ => seg.chars().all(|c| c.is_ascii_digit()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_collapses_ids() {
        assert_eq!(
            normalize_path("/api/session/550e8400-e29b-41d4-a716-446655440000"),
            "/api/session/{id}"
        );
        assert_eq!(
            normalize_path("/api/session/665f0a1b2c3d4e5f60718293"),
            "/api/session/{id}"
        );
        assert_eq!(
            normalize_path("/api/session/42/answers"),
            "/api/session/{id}/answers"
        );
    }

    #[test]
    fn test_normalize_path_keeps_static_routes() {
        assert_eq!(normalize_path("/api/session/my"), "/api/session/my");
        assert_eq!(normalize_path("/api/session/start"), "/api/session/start");
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/metrics"), "/metrics");
    }

    #[test]
    fn test_looks_like_id() {
        assert!(looks_like_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(looks_like_id("665f0a1b2c3d4e5f60718293"));
        assert!(looks_like_id("123"));
        assert!(!looks_like_id("not-a-uuid"));
        assert!(!looks_like_id("665f0a1b2c3d4e5f6071829z"));
        assert!(!looks_like_id(""));
    }
}
