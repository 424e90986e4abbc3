//! Metrics collection using Prometheus
//!
//! Counters and timings for submissions, approvals and undos. The registry is
//! exported as text for whichever outer layer serves it.

use crate::error::ErrorKind;
use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the rating ledger
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Result lifecycle metrics
    result_metrics: ResultMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Result lifecycle metrics
#[derive(Clone)]
pub struct ResultMetrics {
    /// Results submitted, by game
    pub submitted_total: IntCounterVec,

    /// Results approved, by game
    pub approved_total: IntCounterVec,

    /// Approvals that failed, by error kind
    pub approval_failures_total: IntCounterVec,

    /// Approved results reversed by undo
    pub undone_total: IntCounter,

    /// Pending results discarded without approval
    pub discarded_total: IntCounter,

    /// Pending results seen at the last listing or approval
    pub pending_results: IntGauge,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time spent approving a single result
    pub approval_duration: Histogram,

    /// Time spent undoing a result
    pub undo_duration: Histogram,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let result_metrics = ResultMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            result_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get result lifecycle metrics
    pub fn results(&self) -> &ResultMetrics {
        &self.result_metrics
    }

    /// Get performance metrics
    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    pub fn record_submission(&self, game: &str) {
        self.result_metrics
            .submitted_total
            .with_label_values(&[game])
            .inc();
    }

    pub fn record_approval(&self, game: &str, duration: Duration) {
        self.result_metrics
            .approved_total
            .with_label_values(&[game])
            .inc();
        self.performance_metrics
            .approval_duration
            .observe(duration.as_secs_f64());
    }

    pub fn record_approval_failure(&self, kind: ErrorKind) {
        self.result_metrics
            .approval_failures_total
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    pub fn record_undo(&self, duration: Duration) {
        self.result_metrics.undone_total.inc();
        self.performance_metrics
            .undo_duration
            .observe(duration.as_secs_f64());
    }

    pub fn record_discarded(&self, count: usize) {
        self.result_metrics.discarded_total.inc_by(count as u64);
    }

    pub fn set_pending(&self, count: usize) {
        self.result_metrics.pending_results.set(count as i64);
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn export_text(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ResultMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let submitted_total = IntCounterVec::new(
            Opts::new("elo_ledger_results_submitted_total", "Total results submitted"),
            &["game"],
        )?;
        registry.register(Box::new(submitted_total.clone()))?;

        let approved_total = IntCounterVec::new(
            Opts::new("elo_ledger_results_approved_total", "Total results approved"),
            &["game"],
        )?;
        registry.register(Box::new(approved_total.clone()))?;

        let approval_failures_total = IntCounterVec::new(
            Opts::new(
                "elo_ledger_approval_failures_total",
                "Total approvals that failed",
            ),
            &["kind"],
        )?;
        registry.register(Box::new(approval_failures_total.clone()))?;

        let undone_total = IntCounter::new(
            "elo_ledger_results_undone_total",
            "Total approved results reversed",
        )?;
        registry.register(Box::new(undone_total.clone()))?;

        let discarded_total = IntCounter::new(
            "elo_ledger_results_discarded_total",
            "Total pending results discarded",
        )?;
        registry.register(Box::new(discarded_total.clone()))?;

        let pending_results = IntGauge::new(
            "elo_ledger_pending_results",
            "Pending results awaiting approval",
        )?;
        registry.register(Box::new(pending_results.clone()))?;

        Ok(Self {
            submitted_total,
            approved_total,
            approval_failures_total,
            undone_total,
            discarded_total,
            pending_results,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let approval_duration = Histogram::with_opts(HistogramOpts::new(
            "elo_ledger_approval_duration_seconds",
            "Time taken to approve a result",
        ))?;
        registry.register(Box::new(approval_duration.clone()))?;

        let undo_duration = Histogram::with_opts(HistogramOpts::new(
            "elo_ledger_undo_duration_seconds",
            "Time taken to undo a result",
        ))?;
        registry.register(Box::new(undo_duration.clone()))?;

        Ok(Self {
            approval_duration,
            undo_duration,
        })
    }
}
