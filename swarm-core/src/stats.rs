use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Aggregated results for a single `(method, name)` request entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestStatistics {
    pub method: String,
    pub name: String,
    pub num_requests: u64,
    pub num_failures: u64,
    pub avg_latency: Duration,
    pub min_latency: Duration,
    pub max_latency: Duration,
    pub latency_p50: Duration,
    pub latency_p90: Duration,
    pub latency_p99: Duration,
}

impl RequestStatistics {
    pub fn fail_ratio(&self) -> f64 {
        if self.num_requests == 0 {
            0.
        } else {
            self.num_failures as f64 / self.num_requests as f64
        }
    }
}

/// Statistics for a finished swarm run.
///
/// Request entries are sorted by name, then method. Task counts are keyed by task name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStatistics {
    pub users: usize,
    pub elapsed: Duration,
    pub requests: Vec<RequestStatistics>,
    pub tasks: BTreeMap<String, u64>,
}

impl RunStatistics {
    pub fn request(&self, method: &str, name: &str) -> Option<&RequestStatistics> {
        self.requests
            .iter()
            .find(|r| r.method == method && r.name == name)
    }

    pub fn total_requests(&self) -> u64 {
        self.requests.iter().map(|r| r.num_requests).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.requests.iter().map(|r| r.num_failures).sum()
    }

    pub fn fail_ratio(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.
        } else {
            self.total_failures() as f64 / total as f64
        }
    }

    pub fn task_count(&self, name: &str) -> u64 {
        self.tasks.get(name).copied().unwrap_or(0)
    }

    pub fn total_tasks(&self) -> u64 {
        self.tasks.values().sum()
    }
}

impl fmt::Display for RunStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<8} {:<32} {:>8} {:>16} | {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "Type", "Name", "# reqs", "# fails", "Avg", "Min", "Max", "p50", "p90", "p99"
        )?;
        writeln!(f, "{}", "-".repeat(128))?;
        for r in &self.requests {
            writeln!(
                f,
                "{:<8} {:<32} {:>8} {:>16} | {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
                r.method,
                r.name,
                r.num_requests,
                format!("{}({:.2}%)", r.num_failures, r.fail_ratio() * 100.),
                millis(r.avg_latency),
                millis(r.min_latency),
                millis(r.max_latency),
                millis(r.latency_p50),
                millis(r.latency_p90),
                millis(r.latency_p99),
            )?;
        }
        writeln!(f, "{}", "-".repeat(128))?;
        writeln!(
            f,
            "{:<8} {:<32} {:>8} {:>16}",
            "",
            "Aggregated",
            self.total_requests(),
            format!("{}({:.2}%)", self.total_failures(), self.fail_ratio() * 100.),
        )?;
        writeln!(f)?;
        for (task, count) in &self.tasks {
            writeln!(f, "{task:<41} {count:>8}")?;
        }
        write!(
            f,
            "{} users ran for {}",
            self.users,
            humantime::format_duration(Duration::from_millis(self.elapsed.as_millis() as u64))
        )
    }
}

fn millis(dur: Duration) -> String {
    format!("{:.0}ms", dur.as_secs_f64() * 1_000.)
}
