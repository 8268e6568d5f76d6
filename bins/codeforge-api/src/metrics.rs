// Prometheus metrics for the evaluation pipeline.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref EVALUATIONS_TOTAL: IntCounterVec = {
        let counter = IntCounterVec::new(
            Opts::new(
                "codeforge_evaluations_total",
                "Evaluations by kind (trial/graded) and terminal status",
            ),
            &["kind", "status"],
        )
        .expect("metric definition");
        REGISTRY
            .register(Box::new(counter.clone()))
            .expect("metric registration");
        counter
    };
    pub static ref EVALUATION_SECONDS: HistogramVec = {
        let histogram = HistogramVec::new(
            HistogramOpts::new(
                "codeforge_evaluation_seconds",
                "Wall-clock duration of one evaluation",
            ),
            &["kind"],
        )
        .expect("metric definition");
        REGISTRY
            .register(Box::new(histogram.clone()))
            .expect("metric registration");
        histogram
    };
}

pub fn observe_evaluation(kind: &str, status: &str, elapsed: Duration) {
    EVALUATIONS_TOTAL.with_label_values(&[kind, status]).inc();
    EVALUATION_SECONDS
        .with_label_values(&[kind])
        .observe(elapsed.as_secs_f64());
}

pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
