//! Prometheus metrics for the Satchel gateway.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! No file names or upload identifiers are used as label values.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// Retrieval rewriting
pub static NAME_LOOKUPS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "satchel_name_lookups_total",
            "Retrieval requests resolved by file name, by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

// Gate
pub static AUTH_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "satchel_auth_failures_total",
        "Mutating requests rejected for missing or wrong credentials",
    )
    .expect("metric creation failed")
});

// Completion stream
pub static HOOKS_RECEIVED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "satchel_hooks_received_total",
            "Upload server hook deliveries, by hook type",
        ),
        &["type"],
    )
    .expect("metric creation failed")
});

pub static COMPLETIONS_RECORDED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "satchel_completions_recorded_total",
        "Completed uploads whose file name was recorded in the registry",
    )
    .expect("metric creation failed")
});

pub static COMPLETIONS_DISCARDED: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "satchel_completions_discarded_total",
            "Completed uploads dropped without a registry update, by reason",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

// Upstream proxy
pub static UPSTREAM_ERRORS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "satchel_upstream_errors_total",
        "Requests that could not be forwarded to the upload server",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(NAME_LOOKUPS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(AUTH_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(HOOKS_RECEIVED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COMPLETIONS_RECORDED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(COMPLETIONS_DISCARDED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPSTREAM_ERRORS.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

/// Count a name lookup by outcome (`found`, `not_found`, `unavailable`).
pub fn record_lookup(outcome: &str) {
    NAME_LOOKUPS.with_label_values(&[outcome]).inc();
}

/// Count a discarded completion by reason.
pub fn record_discarded_completion(reason: &str) {
    COMPLETIONS_DISCARDED.with_label_values(&[reason]).inc();
}
