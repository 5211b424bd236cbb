//! Pauses between tasks
use crate::error::SwarmError;
use rand::Rng;
use std::time::Duration;

/// How long a simulated user waits after a task before picking the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTime {
    /// Uniformly random duration in the closed interval `[min, max]`.
    Between { min: Duration, max: Duration },
    /// Always the same duration.
    Constant(Duration),
    /// Wait so that tasks start at most once per period. A task that runs longer than the
    /// period is followed by no wait at all.
    ConstantPacing(Duration),
}

impl Default for WaitTime {
    fn default() -> Self {
        Self::Constant(Duration::ZERO)
    }
}

impl WaitTime {
    pub fn between(min: Duration, max: Duration) -> Result<Self, SwarmError> {
        if min > max {
            Err(SwarmError::InvalidWaitTime { min, max })
        } else {
            Ok(Self::Between { min, max })
        }
    }

    pub fn constant(wait: Duration) -> Self {
        Self::Constant(wait)
    }

    pub fn constant_pacing(period: Duration) -> Self {
        Self::ConstantPacing(period)
    }

    /// Draw the next wait. `task_elapsed` is how long the task that just finished took.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, task_elapsed: Duration) -> Duration {
        match *self {
            WaitTime::Between { min, max } => rng.gen_range(min..=max),
            WaitTime::Constant(wait) => wait,
            WaitTime::ConstantPacing(period) => period.saturating_sub(task_elapsed),
        }
    }
}
