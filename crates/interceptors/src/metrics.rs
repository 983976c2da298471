use admission_errors::prelude::{labels, ErrorObj, LABEL_NAMES};
use lazy_static::lazy_static;
use prometheus::{
    core::Collector, histogram_opts, opts, HistogramVec, IntCounterVec, Registry,
};
use tracing::error;

lazy_static! {
    static ref REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        opts!("gateway_requests_total", "Requests handled by the admission pipeline"),
        &["method", "status"]
    )
    .unwrap();
    static ref REQUEST_DURATION: HistogramVec = HistogramVec::new(
        histogram_opts!(
            "gateway_request_duration_seconds",
            "Admission pipeline latency",
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
        ),
        &["method"]
    )
    .unwrap();
    static ref REQUEST_ERRORS: IntCounterVec = IntCounterVec::new(
        opts!("gateway_request_errors_total", "Requests answered with status >= 400"),
        &["method", "status"]
    )
    .unwrap();
    static ref ACCESS_DECISIONS: IntCounterVec = IntCounterVec::new(
        opts!("gateway_access_decisions_total", "Access decisions grouped by verdict"),
        &["verdict", "allowed"]
    )
    .unwrap();
    static ref PATH_REWRITES: IntCounterVec = IntCounterVec::new(
        opts!("gateway_path_rewrites_total", "Path rewrite outcomes"),
        &["outcome"]
    )
    .unwrap();
    static ref REJECTIONS: IntCounterVec = IntCounterVec::new(
        opts!("gateway_rejections_total", "Requests ended by a stage error, by error code"),
        &LABEL_NAMES
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register pipeline metric");
        }
    }
}

pub fn register_metrics(registry: &Registry) {
    register(registry, REQUESTS_TOTAL.clone());
    register(registry, REQUEST_DURATION.clone());
    register(registry, REQUEST_ERRORS.clone());
    register(registry, ACCESS_DECISIONS.clone());
    register(registry, PATH_REWRITES.clone());
    register(registry, REJECTIONS.clone());
}

pub fn record_request(method: &str, status: u16, seconds: f64) {
    let label = status.to_string();
    REQUESTS_TOTAL.with_label_values(&[method, &label]).inc();
    REQUEST_DURATION.with_label_values(&[method]).observe(seconds);
    if status >= 400 {
        REQUEST_ERRORS.with_label_values(&[method, &label]).inc();
    }
}

pub fn record_decision(verdict: &str, allowed: bool) {
    ACCESS_DECISIONS
        .with_label_values(&[verdict, if allowed { "true" } else { "false" }])
        .inc();
}

pub fn record_rewrite(outcome: &str) {
    PATH_REWRITES.with_label_values(&[outcome]).inc();
}

pub fn record_rejection(err: &ErrorObj) {
    REJECTIONS.with_label_values(&labels(err)).inc();
}

pub fn rejection_count(err: &ErrorObj) -> u64 {
    REJECTIONS.with_label_values(&labels(err)).get()
}

pub fn decision_count(verdict: &str, allowed: bool) -> u64 {
    ACCESS_DECISIONS
        .with_label_values(&[verdict, if allowed { "true" } else { "false" }])
        .get()
}
