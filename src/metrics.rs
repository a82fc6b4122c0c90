//! Prometheus metrics
//!
//! All metrics live in the default registry and are exposed by the metrics
//! server as text format on `/metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};

static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "context_engine_requests_total",
        "Total number of API requests",
        &["endpoint", "method"]
    )
    .expect("metric registration")
});

static REQUEST_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "context_engine_request_latency_seconds",
        "API request latency in seconds",
        &["endpoint"]
    )
    .expect("metric registration")
});

static CACHE_HITS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "context_engine_cache_hits_total",
        "Cache hits per tier",
        &["tier"]
    )
    .expect("metric registration")
});

static CACHE_MISSES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "context_engine_cache_misses_total",
        "Cache misses per tier",
        &["tier"]
    )
    .expect("metric registration")
});

static DEPENDENCY_HEALTH: Lazy<GaugeVec> = Lazy::new(|| {
    register_gauge_vec!(
        "context_engine_dependency_health",
        "Dependency health status (1 = healthy, 0 = unhealthy)",
        &["dependency"]
    )
    .expect("metric registration")
});

pub fn record_request(endpoint: &str, method: &str) {
    REQUESTS_TOTAL.with_label_values(&[endpoint, method]).inc();
}

pub fn observe_request_latency(endpoint: &str, seconds: f64) {
    REQUEST_LATENCY
        .with_label_values(&[endpoint])
        .observe(seconds);
}

pub fn record_cache_hit(tier: &str) {
    CACHE_HITS.with_label_values(&[tier]).inc();
}

pub fn record_cache_miss(tier: &str) {
    CACHE_MISSES.with_label_values(&[tier]).inc();
}

pub fn set_dependency_health(dependency: &str, healthy: bool) {
    DEPENDENCY_HEALTH
        .with_label_values(&[dependency])
        .set(if healthy { 1.0 } else { 0.0 });
}

/// Encode the default registry in Prometheus text format
pub fn gather() -> Vec<u8> {
    use prometheus::{Encoder, TextEncoder};
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    // Encoding into a Vec only fails on malformed metric families
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %err, "failed to encode metrics");
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_round_trip_through_registry() {
        record_request("/api/v1/context/retrieve", "POST");
        observe_request_latency("/api/v1/context/retrieve", 0.042);
        record_cache_hit("memory");
        record_cache_miss("shared");
        set_dependency_health("graphrag", true);
        set_dependency_health("case_store", false);

        let text = String::from_utf8(gather()).unwrap();
        assert!(text.contains("context_engine_requests_total"));
        assert!(text.contains("context_engine_request_latency_seconds"));
        assert!(text.contains("context_engine_cache_hits_total"));
        assert!(text.contains("context_engine_cache_misses_total"));
        assert!(text.contains("context_engine_dependency_health"));
        assert!(text.contains("dependency=\"graphrag\""));
    }
}
