//! Metrics for the rating ledger
//!
//! This module provides Prometheus counters and timings for the result
//! approval lifecycle.

pub mod collector;

pub use collector::{MetricsCollector, MetricsTimer, PerformanceMetrics, ResultMetrics};
