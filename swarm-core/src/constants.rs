use std::num::NonZeroU32;
use std::time::Duration;

/// Number of simulated users started when none is configured.
pub const DEFAULT_USERS: usize = 1;

/// Users started per second when no spawn rate is configured.
pub const DEFAULT_SPAWN_RATE: NonZeroU32 = NonZeroU32::MIN;

/// Period of the running totals log line.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(2);

/// Request kind used for transactions recorded through `#[transaction]`.
pub const TRANSACTION_KIND: &str = "TX";
