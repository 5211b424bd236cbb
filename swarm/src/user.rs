//! User behavior profiles and their weighted tasks
use crate::client::Client;
use crate::error::{RequestError, SwarmError};
use crate::wait::WaitTime;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;

/// Outcome of a single task. Request failures are already recorded by the [`Client`], so
/// tasks are free to propagate them with `?` or ignore them.
pub type TaskResult = Result<(), RequestError>;

pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult> + Send>>;

type TaskFn = Arc<dyn Fn(Client) -> TaskFuture + Send + Sync>;

/// A named action with a relative weight.
///
/// # Example
/// ```ignore
/// use swarm::prelude::*;
///
/// let task = Task::new("get_posts", |client: Client| async move {
///     client.get("/posts").await?;
///     Ok(())
/// })
/// .set_weight(2)?;
/// ```
#[derive(Clone)]
pub struct Task {
    name: String,
    weight: NonZeroU32,
    func: TaskFn,
}

impl Task {
    pub fn new<T, F>(name: &str, func: T) -> Self
    where
        T: Fn(Client) -> F + Send + Sync + 'static,
        F: Future<Output = TaskResult> + Send + 'static,
    {
        Self {
            name: name.to_string(),
            weight: NonZeroU32::MIN,
            func: Arc::new(move |client: Client| -> TaskFuture { Box::pin(func(client)) }),
        }
    }

    /// Relative selection frequency. Must be at least 1.
    pub fn set_weight(mut self, weight: u32) -> Result<Self, SwarmError> {
        self.weight =
            NonZeroU32::new(weight).ok_or_else(|| SwarmError::InvalidWeight(self.name.clone()))?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight(&self) -> NonZeroU32 {
        self.weight
    }

    pub(crate) fn run(&self, client: Client) -> TaskFuture {
        (self.func)(client)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

/// Describes what one simulated user does: which tasks it may run, how often relative to each
/// other, and how long it pauses between them.
///
/// # Example
/// ```ignore
/// use swarm::prelude::*;
/// use std::time::Duration;
///
/// let profile = UserProfile::new("WebsiteUser")
///     .host("http://localhost:8080")
///     .wait_time(WaitTime::between(Duration::from_secs(5), Duration::from_secs(15))?)
///     .task(Task::new("index", |client: Client| async move {
///         client.get("/").await?;
///         Ok(())
///     }));
/// ```
#[derive(Clone, Debug)]
pub struct UserProfile {
    name: String,
    wait_time: WaitTime,
    tasks: Vec<Task>,
    host: Option<String>,
}

impl UserProfile {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            wait_time: WaitTime::default(),
            tasks: vec![],
            host: None,
        }
    }

    pub fn wait_time(mut self, wait_time: WaitTime) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Host used when the swarm itself is not given one.
    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn default_host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn get_wait_time(&self) -> WaitTime {
        self.wait_time
    }

    /// Build the weighted selector over this profile's tasks.
    pub fn selector(&self) -> Result<TaskSelector, SwarmError> {
        if self.tasks.is_empty() {
            return Err(SwarmError::NoTasks);
        }

        let weights = self.tasks.iter().map(|t| t.weight.get());
        let dist = WeightedIndex::new(weights).map_err(|_| SwarmError::NoTasks)?;
        Ok(TaskSelector { dist })
    }
}

/// Picks task indices with probability `weight / sum(weights)`.
#[derive(Clone, Debug)]
pub struct TaskSelector {
    dist: WeightedIndex<u32>,
}

impl TaskSelector {
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.dist.sample(rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn noop(name: &str) -> Task {
        Task::new(name, |_client: Client| async { Ok(()) })
    }

    #[test]
    fn selection_follows_weights() {
        let profile = UserProfile::new("weighted")
            .task(noop("heavy").set_weight(2).unwrap())
            .task(noop("light_a"))
            .task(noop("light_b"));

        let selector = profile.selector().unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let mut counts = [0usize; 3];
        for _ in 0..40_000 {
            counts[selector.pick(&mut rng)] += 1;
        }

        let heavy = counts[0] as f64;
        assert!((heavy / counts[1] as f64 - 2.).abs() < 0.1, "{counts:?}");
        assert!((heavy / counts[2] as f64 - 2.).abs() < 0.1, "{counts:?}");
    }

    #[test]
    fn single_task_is_always_picked() {
        let profile = UserProfile::new("single").task(noop("only").set_weight(5).unwrap());
        let selector = profile.selector().unwrap();
        let mut rng = SmallRng::seed_from_u64(3);
        assert!((0..100).all(|_| selector.pick(&mut rng) == 0));
    }

    #[test]
    fn zero_weight_is_rejected() {
        let res = noop("never").set_weight(0);
        assert!(matches!(res, Err(SwarmError::InvalidWeight(name)) if name == "never"));
    }

    #[test]
    fn empty_profile_is_rejected() {
        let res = UserProfile::new("empty").selector();
        assert!(matches!(res, Err(SwarmError::NoTasks)));
    }

    #[test]
    fn default_weight_is_one() {
        assert_eq!(noop("default").weight().get(), 1);
    }

    #[test]
    fn builder() {
        let profile = UserProfile::new("built")
            .host("http://localhost:3000")
            .wait_time(WaitTime::constant(std::time::Duration::from_millis(10)))
            .task(noop("a"));

        assert_eq!(profile.name(), "built");
        assert_eq!(profile.default_host(), Some("http://localhost:3000"));
        assert_eq!(profile.tasks().len(), 1);
        assert_eq!(
            profile.get_wait_time(),
            WaitTime::Constant(std::time::Duration::from_millis(10))
        );
    }
}
