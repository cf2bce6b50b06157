//! Prometheus metrics for a scan run.

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, Registry, Encoder, TextEncoder,
};
use std::path::Path;

/// Metrics collector for one batch run.
///
/// Counters live on a registry owned by this instance, so several runs (or
/// tests) can coexist in one process.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    transactions_processed: IntCounter,
    anomalies_detected: IntCounter,
    items_skipped: IntCounter,
    blocks_scanned: IntCounter,
    rpc_errors: IntCounter,
    rpc_latency: HistogramVec,
}

impl Metrics {
    /// Create a new metrics instance.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let transactions_processed = IntCounter::new(
            "mev_order_transactions_processed_total",
            "Total number of input transactions classified",
        )?;
        let anomalies_detected = IntCounter::new(
            "mev_order_anomalies_total",
            "Total number of out-of-order transactions detected",
        )?;
        let items_skipped = IntCounter::new(
            "mev_order_items_skipped_total",
            "Transactions or blocks skipped after a recoverable error",
        )?;
        let blocks_scanned = IntCounter::new(
            "mev_order_blocks_scanned_total",
            "Blocks fetched while attributing miners",
        )?;
        let rpc_errors = IntCounter::new(
            "mev_order_rpc_errors_total",
            "Total number of RPC errors",
        )?;
        let rpc_latency = HistogramVec::new(
            HistogramOpts::new("mev_order_rpc_latency_seconds", "RPC call latency in seconds"),
            &["operation"],
        )?;

        registry.register(Box::new(transactions_processed.clone()))?;
        registry.register(Box::new(anomalies_detected.clone()))?;
        registry.register(Box::new(items_skipped.clone()))?;
        registry.register(Box::new(blocks_scanned.clone()))?;
        registry.register(Box::new(rpc_errors.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;

        Ok(Self {
            registry,
            transactions_processed,
            anomalies_detected,
            items_skipped,
            blocks_scanned,
            rpc_errors,
            rpc_latency,
        })
    }

    pub fn inc_transactions_processed(&self) {
        self.transactions_processed.inc();
    }

    pub fn inc_anomalies(&self) {
        self.anomalies_detected.inc();
    }

    pub fn inc_skipped(&self) {
        self.items_skipped.inc();
    }

    pub fn inc_blocks_scanned(&self) {
        self.blocks_scanned.inc();
    }

    pub fn inc_rpc_errors(&self) {
        self.rpc_errors.inc();
    }

    /// Record RPC latency.
    pub fn observe_rpc_latency(&self, operation: &str, duration_secs: f64) {
        self.rpc_latency.with_label_values(&[operation]).observe(duration_secs);
    }

    pub fn transactions_processed(&self) -> u64 {
        self.transactions_processed.get()
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies_detected.get()
    }

    pub fn skipped(&self) -> u64 {
        self.items_skipped.get()
    }

    pub fn blocks_scanned(&self) -> u64 {
        self.blocks_scanned.get()
    }

    /// Get metrics in the Prometheus text format.
    pub fn gather(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Write a snapshot of all metrics to `path`.
    pub fn write_snapshot<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        std::fs::write(path, self.gather()?)?;
        Ok(())
    }
}
