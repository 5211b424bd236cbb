use crate::{DEFAULT_REPORT_INTERVAL, DEFAULT_SPAWN_RATE, DEFAULT_USERS};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::num::{NonZeroU32, NonZeroU64};
use std::time::Duration;

/// Process-wide run configuration for a swarm.
///
/// Usually assembled from command line flags, but it can just as well be
/// deserialized from a file since every field has a default.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Base URL every relative request path is joined onto.
    pub host: Option<String>,
    pub users: usize,
    /// Users started per second until `users` are running.
    pub spawn_rate: NonZeroU32,
    #[serde_as(as = "Option<DurationSeconds>")]
    pub run_time: Option<Duration>,
    /// Per-user cap on task executions.
    pub iterations: Option<NonZeroU64>,
    pub seed: Option<u64>,
    #[serde_as(as = "DurationSeconds")]
    pub report_interval: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            host: None,
            users: DEFAULT_USERS,
            spawn_rate: DEFAULT_SPAWN_RATE,
            run_time: None,
            iterations: None,
            seed: None,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A run must end on its own, either by time or by iteration count.
    pub fn is_bounded(&self) -> bool {
        self.run_time.is_some() || self.iterations.is_some()
    }
}
