//! Metrics reported to the load harness.

use http::StatusCode;
use log::warn;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;
use std::time::Duration;

use crate::payload::KmsOperation;

/// Names of the metrics reported for every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Rate of encrypt calls without a `200` status.
    EncryptErrors,
    /// Rate of decrypt calls without a `200` status.
    DecryptErrors,
    /// Rate of iterations that didn't give back the original plaintext.
    ///
    /// Sampled once per iteration: failed or unparsable calls count as hits.
    EncryptDecryptErrors,
    /// Rate of encrypt calls slower than the threshold.
    EncryptTimeouts,
    /// Rate of decrypt calls slower than the threshold.
    DecryptTimeouts,
    /// Rate of response bodies that couldn't be parsed.
    ResponseParseErrors,
    /// Duration of encrypt calls.
    EncryptTime,
    /// Duration of decrypt calls.
    DecryptTime,
}

impl Metric {
    /// Name the harness knows this metric by.
    pub fn name(self) -> &'static str {
        match self {
            Metric::EncryptErrors => "encrypt_errors",
            Metric::DecryptErrors => "decrypt_errors",
            Metric::EncryptDecryptErrors => "encrypt_decrypt_errors",
            Metric::EncryptTimeouts => "encrypt_timeouts",
            Metric::DecryptTimeouts => "decrypt_timeouts",
            Metric::ResponseParseErrors => "response_parse_errors",
            Metric::EncryptTime => "encrypt_time",
            Metric::DecryptTime => "decrypt_time",
        }
    }

    fn errors(op: KmsOperation) -> Self {
        match op {
            KmsOperation::Encrypt => Metric::EncryptErrors,
            KmsOperation::Decrypt => Metric::DecryptErrors,
        }
    }

    fn timeouts(op: KmsOperation) -> Self {
        match op {
            KmsOperation::Encrypt => Metric::EncryptTimeouts,
            KmsOperation::Decrypt => Metric::DecryptTimeouts,
        }
    }

    fn time(op: KmsOperation) -> Self {
        match op {
            KmsOperation::Encrypt => Metric::EncryptTime,
            KmsOperation::Decrypt => Metric::DecryptTime,
        }
    }
}

impl Display for Metric {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Metrics is the sink owned by the harness.
///
/// Implementations must be safe to share between concurrent iterations.
pub trait Metrics: Send + Sync {
    /// Add one sample to a rate; `hit` is true when the check failed.
    fn add_rate(&self, metric: Metric, hit: bool);

    /// Add one sample to a trend.
    fn add_trend(&self, metric: Metric, value: Duration);
}

/// Record the outcome of one call.
///
/// - error iff the status isn't `200`
/// - timeout iff the call took longer than `threshold`
/// - the duration always goes into the time trend
pub fn record_call(
    metrics: &dyn Metrics,
    op: KmsOperation,
    status: StatusCode,
    duration: Duration,
    threshold: Duration,
) {
    let failed = status != StatusCode::OK;
    if failed {
        warn!("{} returned status {status}", op.path_segment());
    }
    metrics.add_rate(Metric::errors(op), failed);
    metrics.add_rate(Metric::timeouts(op), duration > threshold);
    metrics.add_trend(Metric::time(op), duration);
}

/// Record a call that never produced a response.
pub fn record_failed_call(metrics: &dyn Metrics, op: KmsOperation) {
    metrics.add_rate(Metric::errors(op), true);
}

/// Rate keeps the number of hits among all samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rate {
    /// Samples where the check failed.
    pub hits: u64,
    /// All samples.
    pub total: u64,
}

impl Rate {
    /// Fraction of failed samples, `0.0` when empty.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }
}

/// MemoryMetrics keeps every sample in memory.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    rates: Mutex<HashMap<Metric, Rate>>,
    trends: Mutex<HashMap<Metric, Vec<Duration>>>,
}

impl MemoryMetrics {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a rate.
    pub fn rate(&self, metric: Metric) -> Rate {
        self.rates
            .lock()
            .expect("lock poisoned")
            .get(&metric)
            .copied()
            .unwrap_or_default()
    }

    /// Samples recorded for a trend.
    pub fn trend(&self, metric: Metric) -> Vec<Duration> {
        self.trends
            .lock()
            .expect("lock poisoned")
            .get(&metric)
            .cloned()
            .unwrap_or_default()
    }
}

impl Metrics for MemoryMetrics {
    fn add_rate(&self, metric: Metric, hit: bool) {
        let mut rates = self.rates.lock().expect("lock poisoned");
        let rate = rates.entry(metric).or_default();
        rate.total += 1;
        if hit {
            rate.hits += 1;
        }
    }

    fn add_trend(&self, metric: Metric, value: Duration) {
        self.trends
            .lock()
            .expect("lock poisoned")
            .entry(metric)
            .or_default()
            .push(value);
    }
}
