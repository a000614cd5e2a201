use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Cache Metrics (Redis, login lockout counters)
    pub static ref CACHE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_operations_total",
        "Total number of cache operations",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref CACHE_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "cache_operation_duration_seconds",
        "Cache operation duration in seconds",
        &["operation"],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1]
    )
    .unwrap();

    // Business Metrics
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "login_attempts_total",
        "Total number of login attempts",
        &["result"]
    )
    .unwrap();

    pub static ref STREAK_INTERACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "streak_interactions_total",
        "Total number of recorded streak interactions",
        &["outcome"]
    )
    .unwrap();

    pub static ref COURSE_PUBLICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "course_publications_total",
        "Total number of course publish/unpublish actions",
        &["action"]
    )
    .unwrap();

    pub static ref RESPONSES_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "responses_submitted_total",
        "Total number of user responses submitted",
        &["correct"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track cache operation with metrics
pub async fn track_cache_operation<F, T>(operation: &str, future: F) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    CACHE_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    CACHE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

pub fn record_login(result: &str) {
    LOGIN_ATTEMPTS_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_streak_outcome(outcome: &str) {
    STREAK_INTERACTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_publication(action: &str) {
    COURSE_PUBLICATIONS_TOTAL.with_label_values(&[action]).inc();
}

pub fn record_response(correct: bool) {
    let label = if correct { "true" } else { "false" };
    RESPONSES_SUBMITTED_TOTAL.with_label_values(&[label]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
    }

    #[test]
    fn test_render_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();
        record_streak_outcome("extended");
        record_login("success");

        let output = render_metrics().unwrap();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("streak_interactions_total"));
        assert!(output.contains("login_attempts_total"));
    }

    #[tokio::test]
    async fn cache_operation_counts_errors() {
        let result: Result<(), anyhow::Error> =
            track_cache_operation("test_op", async { Err(anyhow::anyhow!("down")) }).await;
        assert!(result.is_err());
        assert!(
            CACHE_OPERATIONS_TOTAL
                .with_label_values(&["test_op", "error"])
                .get()
                >= 1
        );
    }
}
