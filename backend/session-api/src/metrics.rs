use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "HTTP requests processed, labelled by method, path and status",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "Latency of HTTP requests in seconds",
        &["method", "path"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    // Session lifecycle
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_sessions_total",
        "Quiz session operations, labelled by lifecycle step",
        &["status"]
    )
    .unwrap();

    pub static ref SESSIONS_OPEN: IntGauge = register_int_gauge!(
        "quiz_sessions_open",
        "Quiz sessions currently open in this process"
    )
    .unwrap();

    pub static ref QUESTIONS_GRADED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "questions_graded_total",
        "Questions graded at finish, labelled correct or incorrect",
        &["result"]
    )
    .unwrap();

    pub static ref BADGES_AWARDED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "badges_awarded_total",
        "Achievement badges awarded, labelled by badge name",
        &["badge"]
    )
    .unwrap();

    // Upstream calls to the user service
    pub static ref ACCOUNT_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "account_calls_total",
        "Calls made to the user service, labelled by operation and outcome",
        &["operation", "status"]
    )
    .unwrap();
}

/// Renders the default registry in Prometheus text format.
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let mut out = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut out)?;
    String::from_utf8(out)
        .map_err(|e| prometheus::Error::Msg(format!("non-utf8 metrics output: {}", e)))
}
