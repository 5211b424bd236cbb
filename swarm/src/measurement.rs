use hdrhistogram::Histogram;
use std::fmt;
use std::time::Duration;

// Microseconds, 1us to one hour at 3 significant figures. Slower requests saturate at the top.
const HISTOGRAM_MAX_MICROS: u64 = 3_600_000_000;
const HISTOGRAM_SIGFIG: u8 = 3;

/// Request totals for one reporting window.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Measurement {
    pub rps: f64,
    pub fail_ratio: f64,
    pub requests: u64,
    pub failures: u64,
}

impl Measurement {
    pub fn new(requests: u64, failures: u64, elapsed: Duration) -> Self {
        let rps = requests as f64 / elapsed.as_secs_f64();
        let fail_ratio = if requests == 0 {
            0.
        } else {
            failures as f64 / requests as f64
        };
        Self {
            rps: if rps.is_finite() { rps } else { 0. },
            fail_ratio,
            requests,
            failures,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RPS={:.2}, FailRatio={:.2}, Requests={}, Failures={}",
            self.rps, self.fail_ratio, self.requests, self.failures,
        )
    }
}

/// Latency quantile estimator for a single request entry.
///
/// Quantiles come from an HDR histogram and are clamped to the exact extremes seen, so a steady
/// latency reports that same value for every quantile.
pub(crate) struct LatencyDigest {
    histogram: Histogram<u64>,
    min: Duration,
    max: Duration,
}

impl LatencyDigest {
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new_with_bounds(1, HISTOGRAM_MAX_MICROS, HISTOGRAM_SIGFIG)
                .expect("Invalid histogram bounds"),
            min: Duration::MAX,
            max: Duration::ZERO,
        }
    }

    pub fn populate(&mut self, dur: &[Duration]) {
        for latency in dur {
            let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
            self.histogram.saturating_record(micros);
            self.min = self.min.min(*latency);
            self.max = self.max.max(*latency);
        }
    }

    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    pub fn latency(&self, quantile: f64) -> Duration {
        if self.count() == 0 {
            return Duration::ZERO;
        }
        if self.min == self.max {
            return self.min;
        }

        let micros = self.histogram.value_at_quantile(quantile.clamp(0., 1.));
        Duration::from_micros(micros).clamp(self.min, self.max)
    }
}
