//! Prometheus metrics for the Terra node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]. Transition outcomes and
//! latencies are recorded per operation; anchor delivery counters are
//! mirrored from the ledger synchronizer's [`AnchorStatsSnapshot`] whenever
//! [`NodeMetrics::observe_anchors`] is called. Ledger failures never reach
//! callers, so these gauges are where they show up.

use std::time::Duration;

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_with_registry, Encoder, HistogramOpts, HistogramVec, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};

use terra_ledger::AnchorStatsSnapshot;

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    /// Transition attempts by operation and outcome (`ok` or an error kind).
    pub transitions: IntCounterVec,
    /// Time spent handling a transition request, in milliseconds.
    pub transition_latency_ms: HistogramVec,

    pub anchor_submitted: IntGauge,
    pub anchor_succeeded: IntGauge,
    pub anchor_failed: IntGauge,
    pub anchor_dropped: IntGauge,
    pub anchor_retried: IntGauge,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions = register_int_counter_vec_with_registry!(
            Opts::new("terra_transitions_total", "Transition requests by outcome"),
            &["operation", "outcome"],
            registry
        )
        .expect("failed to register transitions counter");

        // 0.5 ms to ~8 s.
        let transition_latency_ms = register_histogram_vec_with_registry!(
            HistogramOpts::new(
                "terra_transition_latency_ms",
                "Transition handling time in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(0.5, 2.0, 15).expect("valid bucket layout")),
            &["operation"],
            registry
        )
        .expect("failed to register transition latency histogram");

        let anchor_submitted = register_int_gauge_with_registry!(
            Opts::new("terra_anchor_submitted_total", "Anchor records queued"),
            registry
        )
        .expect("failed to register anchor_submitted gauge");

        let anchor_succeeded = register_int_gauge_with_registry!(
            Opts::new("terra_anchor_succeeded_total", "Anchor records accepted by the ledger"),
            registry
        )
        .expect("failed to register anchor_succeeded gauge");

        let anchor_failed = register_int_gauge_with_registry!(
            Opts::new(
                "terra_anchor_failed_total",
                "Anchor records abandoned after exhausting retries"
            ),
            registry
        )
        .expect("failed to register anchor_failed gauge");

        let anchor_dropped = register_int_gauge_with_registry!(
            Opts::new("terra_anchor_dropped_total", "Anchor records dropped on a full queue"),
            registry
        )
        .expect("failed to register anchor_dropped gauge");

        let anchor_retried = register_int_gauge_with_registry!(
            Opts::new("terra_anchor_retried_total", "Anchor delivery retries"),
            registry
        )
        .expect("failed to register anchor_retried gauge");

        Self {
            registry,
            transitions,
            transition_latency_ms,
            anchor_submitted,
            anchor_succeeded,
            anchor_failed,
            anchor_dropped,
            anchor_retried,
        }
    }

    pub fn record_transition(&self, operation: &str, outcome: &str, elapsed: Duration) {
        self.transitions.with_label_values(&[operation, outcome]).inc();
        self.transition_latency_ms
            .with_label_values(&[operation])
            .observe(elapsed.as_secs_f64() * 1_000.0);
    }

    pub fn observe_anchors(&self, stats: &AnchorStatsSnapshot) {
        let clamp = |v: u64| i64::try_from(v).unwrap_or(i64::MAX);
        self.anchor_submitted.set(clamp(stats.submitted));
        self.anchor_succeeded.set(clamp(stats.succeeded));
        self.anchor_failed.set(clamp(stats.failed));
        self.anchor_dropped.set(clamp(stats.dropped));
        self.anchor_retried.set(clamp(stats.retried));
    }

    /// Prometheus text exposition of every metric.
    pub fn encode_text(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
