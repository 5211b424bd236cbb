use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while building or starting a swarm.
#[derive(Debug, Error)]
pub enum SwarmError {
    #[error("User profile has no tasks")]
    NoTasks,

    #[error("Task `{0}` must have a weight of at least 1")]
    InvalidWeight(String),

    #[error("Invalid wait time: min {min:?} is greater than max {max:?}")]
    InvalidWaitTime { min: Duration, max: Duration },

    #[error("No host configured; set one on the profile or the swarm")]
    NoHost,

    #[error("Invalid host: {0}")]
    InvalidHost(#[from] url::ParseError),

    #[error("A swarm needs at least one user")]
    NoUsers,

    #[error("A swarm without a stop signal needs a run time or an iteration limit")]
    NoStopCondition,

    #[error("Unable to build the HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors returned by [`Client`](crate::Client) requests.
///
/// Errors from `get`, `post_json` and `send` have already been counted as failures by the time
/// a task sees them. Only [`Client::request`](crate::Client::request) returns one uncounted.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(StatusCode),
}
