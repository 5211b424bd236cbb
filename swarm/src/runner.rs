//! Swarm logic
use crate::client::Client;
use crate::collector::StatsCollector;
use crate::error::SwarmError;
use crate::measurement::Measurement;
use crate::transaction::{TransactionData, TRANSACTION_HOOK};
use crate::user::{TaskSelector, UserProfile};
use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::{
    future::Future,
    num::{NonZeroU32, NonZeroU64},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use swarm_core::{RunConfig, RunStatistics};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, trace, Instrument};

/// A configured load test: one user profile run by many simulated users.
///
/// Awaiting a `Swarm` runs it to completion and yields its statistics.
///
/// # Example
/// ```ignore
/// use swarm::prelude::*;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), SwarmError> {
///     let stats = Swarm::new(my_profile())
///         .host("http://localhost:8080")
///         .users(50)
///         .spawn_rate(NonZeroU32::new(5).unwrap())
///         .run_time(Duration::from_secs(120))
///         .await?;
///
///     println!("{stats}");
///     Ok(())
/// }
/// ```
#[pin_project::pin_project]
pub struct Swarm {
    profile: Arc<UserProfile>,
    config: RunConfig,
    stop: Option<StopFuture>,
    runner_fut: Option<RunnerFuture>,
}

type RunnerFuture = Pin<Box<dyn Future<Output = Result<RunStatistics, SwarmError>> + Send>>;
type StopFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

impl Swarm {
    pub fn new(profile: UserProfile) -> Self {
        Self {
            profile: Arc::new(profile),
            config: RunConfig::new(),
            stop: None,
            runner_fut: None,
        }
    }

    /// Replace the whole run configuration.
    pub fn config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Base URL for requests. Overrides the profile's default host.
    pub fn host(mut self, host: &str) -> Self {
        self.config.host = Some(host.to_string());
        self
    }

    pub fn users(mut self, users: usize) -> Self {
        self.config.users = users;
        self
    }

    /// Users started per second.
    pub fn spawn_rate(mut self, spawn_rate: NonZeroU32) -> Self {
        self.config.spawn_rate = spawn_rate;
        self
    }

    /// Stop the run after this long, cancelling whatever users are doing.
    pub fn run_time(mut self, run_time: Duration) -> Self {
        self.config.run_time = Some(run_time);
        self
    }

    /// Let every user run this many tasks, then stop it.
    pub fn iterations(mut self, iterations: NonZeroU64) -> Self {
        self.config.iterations = Some(iterations);
        self
    }

    /// Make task selection and wait times reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// How often running totals are logged. Zero disables the log line.
    pub fn report_interval(mut self, report_interval: Duration) -> Self {
        self.config.report_interval = report_interval;
        self
    }

    /// End the run as soon as `stop` completes, e.g. on Ctrl-C. Users are cancelled and the
    /// statistics gathered so far are returned as for an elapsed run time.
    ///
    /// A swarm with a stop signal may run without a run time or iteration limit.
    pub fn stop_on<F>(mut self, stop: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop = Some(Box::pin(stop));
        self
    }

    pub fn run_config(&self) -> &RunConfig {
        &self.config
    }
}

impl Future for Swarm {
    type Output = Result<RunStatistics, SwarmError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let runner = this.runner_fut.get_or_insert_with(|| {
            let profile = this.profile.clone();
            let config = this.config.clone();
            let fut: RunnerFuture = Box::pin(run_swarm(profile, config, this.stop.take()));
            fut
        });
        runner.as_mut().poll(cx)
    }
}

#[instrument(name = "swarm", skip_all, fields(profile = profile.name()))]
pub(crate) async fn run_swarm(
    profile: Arc<UserProfile>,
    config: RunConfig,
    stop: Option<StopFuture>,
) -> Result<RunStatistics, SwarmError> {
    let selector = profile.selector()?;
    if config.users == 0 {
        return Err(SwarmError::NoUsers);
    }
    if !config.is_bounded() && stop.is_none() {
        return Err(SwarmError::NoStopCondition);
    }
    let host = config
        .host
        .as_deref()
        .or(profile.default_host())
        .ok_or(SwarmError::NoHost)?;
    let client = Client::new(host)?;

    info!("Running {} with config {:?}", profile.name(), &config);

    let collector = Arc::new(StatsCollector::new());
    let start = Instant::now();

    let reporter = if config.report_interval.is_zero() {
        None
    } else {
        Some(tokio::spawn(
            report_task(collector.clone(), config.report_interval).in_current_span(),
        ))
    };

    let spawn_limiter = RateLimiter::direct_with_clock(
        Quota::per_second(config.spawn_rate).allow_burst(NonZeroU32::MIN),
        &TokioClock,
    );
    let deadline = async {
        match config.run_time {
            Some(run_time) => tokio::time::sleep_until(start + run_time).await,
            None => std::future::pending().await,
        }
    };
    let stopped = async {
        match stop {
            Some(stop) => stop.await,
            None => std::future::pending().await,
        }
    };

    let mut users = JoinSet::new();
    let mut spawned = 0;
    let all_done = async {
        for id in 0..config.users {
            until_ready(&spawn_limiter).await;

            let user = SimulatedUser {
                id,
                profile: profile.clone(),
                selector: selector.clone(),
                client: client.clone(),
                rng: user_rng(config.seed, id),
                iterations: config.iterations,
                collector: collector.clone(),
            };
            let data = TransactionData {
                collector: collector.clone(),
            };
            users.spawn(TRANSACTION_HOOK.scope(data, user.run()).in_current_span());
            spawned += 1;
            debug!("Spawned user {id}");
        }
        info!("All {} users spawned", config.users);

        while let Some(res) = users.join_next().await {
            if let Err(err) = res {
                if err.is_panic() {
                    error!("User task panicked: {err}");
                }
            }
        }
    };

    // NOTE: Users may be stuck in a wait or a request when the deadline hits; they are
    // aborted rather than drained.
    tokio::select! {
        _ = deadline => info!("Run time elapsed"),
        _ = stopped => info!("Stop requested"),
        _ = all_done => info!("All users finished their iterations"),
    }
    users.shutdown().await;

    if let Some(reporter) = reporter {
        reporter.abort();
    }

    let stats = RunStatistics {
        users: spawned,
        elapsed: start.elapsed(),
        requests: collector.snapshot(),
        tasks: collector.task_counts(),
    };

    info!("Swarm complete");
    Ok(stats)
}

/// Governor clock on tokio's time source, so spawn pacing follows a paused runtime clock.
#[derive(Clone, Copy, Debug, Default)]
struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        Instant::now().into_std()
    }
}

type SpawnLimiter =
    RateLimiter<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<std::time::Instant>>;

async fn until_ready(limiter: &SpawnLimiter) {
    while let Err(not_until) = limiter.check() {
        tokio::time::sleep_until(Instant::from_std(not_until.earliest_possible())).await;
    }
}

fn user_rng(seed: Option<u64>, id: usize) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed.wrapping_add(id as u64)),
        None => SmallRng::from_entropy(),
    }
}

/// One independent sequential actor cycling through {select, execute, record, wait}.
struct SimulatedUser {
    id: usize,
    profile: Arc<UserProfile>,
    selector: TaskSelector,
    client: Client,
    rng: SmallRng,
    iterations: Option<NonZeroU64>,
    collector: Arc<StatsCollector>,
}

impl SimulatedUser {
    async fn run(mut self) {
        let wait_time = self.profile.get_wait_time();
        let mut completed = 0u64;

        loop {
            let task = &self.profile.tasks()[self.selector.pick(&mut self.rng)];
            trace!("User {} running {}", self.id, task.name());

            let task_start = Instant::now();
            if let Err(err) = task.run(self.client.clone()).await {
                debug!("User {} task {} failed: {err}", self.id, task.name());
            }
            self.collector.record_task(task.name());

            completed += 1;
            if let Some(limit) = self.iterations {
                if completed >= limit.get() {
                    trace!("User {} completed {completed} iterations", self.id);
                    break;
                }
            }

            let wait = wait_time.sample(&mut self.rng, task_start.elapsed());
            tokio::time::sleep(wait).await;
        }
    }
}

async fn report_task(collector: Arc<StatsCollector>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = interval.tick().await;
    let (mut last_requests, mut last_failures) = (0, 0);

    loop {
        let tick = interval.tick().await;
        let (requests, failures) = collector.totals();
        collector.flush();

        let measurement = Measurement::new(
            requests - last_requests,
            failures - last_failures,
            tick.duration_since(last_tick),
        );
        info!("Last {}: {measurement}", humantime::format_duration(period));

        last_tick = tick;
        last_requests = requests;
        last_failures = failures;
    }
}
