#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod client;
pub mod error;
pub mod runner;
#[doc(hidden)]
pub mod transaction;
pub mod user;
pub mod wait;

mod collector;
mod measurement;

pub use client::Client;
pub use error::{RequestError, SwarmError};
pub use runner::Swarm;
pub use swarm_core::{RequestStatistics, RunConfig, RunStatistics, TRANSACTION_KIND};
pub use swarm_macros::transaction;
pub use user::{Task, TaskFuture, TaskResult, UserProfile};
pub use wait::WaitTime;

pub mod prelude {
    pub use crate::{
        Client, RequestError, RunConfig, RunStatistics, Swarm, SwarmError, Task, TaskResult,
        UserProfile, WaitTime,
    };
    pub use std::num::{NonZeroU32, NonZeroU64};
    pub use swarm_macros::transaction;
}
