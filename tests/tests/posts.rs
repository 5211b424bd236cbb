use mock_service::MockState;
use posts_load::{api_user, PostPayload, MAX_WAIT, MIN_WAIT};
use std::time::Duration;
use swarm::prelude::*;
use swarm_tests::{init, mock};

fn no_wait_user() -> UserProfile {
    api_user().unwrap().wait_time(WaitTime::constant(Duration::ZERO))
}

#[tokio::test]
async fn single_user_issues_requested_actions() {
    init();
    let (host, state) = mock(MockState::new()).await.unwrap();

    let stats = Swarm::new(no_wait_user())
        .host(&host)
        .iterations(NonZeroU64::new(400).unwrap())
        .seed(5)
        .report_interval(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(stats.users, 1);
    assert_eq!(stats.total_tasks(), 400);
    assert_eq!(stats.total_requests(), 400);
    assert_eq!(stats.total_failures(), 0);

    let (list, single, create) = state.hits();
    assert_eq!(list + single + create, 400);
    assert_eq!(list, stats.task_count("get_posts"));
    assert_eq!(single, stats.task_count("get_single_post"));
    assert_eq!(create, stats.task_count("create_post"));

    // 2:1:1
    let share = |n: u64| n as f64 / 400.;
    assert!((0.42..=0.58).contains(&share(list)), "{list}");
    assert!((0.18..=0.32).contains(&share(single)), "{single}");
    assert!((0.18..=0.32).contains(&share(create)), "{create}");

    let names: Vec<_> = stats
        .requests
        .iter()
        .map(|r| (r.method.as_str(), r.name.as_str()))
        .collect();
    assert_eq!(
        names,
        vec![("GET", "/posts"), ("POST", "/posts"), ("GET", "/posts/1")]
    );
}

#[tokio::test]
async fn single_post_is_always_id_one() {
    init();
    let (host, state) = mock(MockState::new()).await.unwrap();

    Swarm::new(no_wait_user())
        .host(&host)
        .users(3)
        .spawn_rate(NonZeroU32::new(100).unwrap())
        .iterations(NonZeroU64::new(40).unwrap())
        .report_interval(Duration::ZERO)
        .await
        .unwrap();

    let ids = state.requested_ids();
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| *id == 1));
}

#[tokio::test]
async fn create_post_sends_fixed_payload() {
    init();
    let (host, state) = mock(MockState::new()).await.unwrap();

    Swarm::new(no_wait_user())
        .host(&host)
        .iterations(NonZeroU64::new(40).unwrap())
        .report_interval(Duration::ZERO)
        .await
        .unwrap();

    let expected = serde_json::json!({
        "title": "Load testing with Locust",
        "body": "This is a test post",
        "userId": 1,
    });
    assert_eq!(expected, serde_json::to_value(PostPayload::default()).unwrap());

    let created = state.created();
    assert!(!created.is_empty());
    assert!(created.iter().all(|body| *body == expected));
}

#[tokio::test]
async fn server_errors_do_not_stop_users() {
    init();
    let (host, state) = mock(MockState::new()).await.unwrap();
    state.set_fail_posts(true);

    let stats = Swarm::new(no_wait_user())
        .host(&host)
        .iterations(NonZeroU64::new(60).unwrap())
        .seed(11)
        .report_interval(Duration::ZERO)
        .await
        .unwrap();

    assert_eq!(stats.total_tasks(), 60);

    let list = stats.request("GET", "/posts").unwrap();
    assert!(list.num_requests > 0);
    assert_eq!(list.num_failures, list.num_requests);
    assert_eq!(list.num_requests, state.hits().0);

    assert_eq!(stats.total_failures(), list.num_failures);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn waits_between_actions() {
    init();
    let (host, _state) = mock(MockState::new()).await.unwrap();

    let stats = Swarm::new(api_user().unwrap())
        .host(&host)
        .iterations(NonZeroU64::new(3).unwrap())
        .report_interval(Duration::ZERO)
        .await
        .unwrap();

    // Two waits between three actions, none after the last.
    assert_eq!(stats.total_tasks(), 3);
    assert!(stats.elapsed >= MIN_WAIT * 2, "{:?}", stats.elapsed);
    assert!(stats.elapsed < MAX_WAIT * 2 + Duration::from_secs(2), "{:?}", stats.elapsed);
}

#[tokio::test]
async fn latency_is_measured() {
    init();
    let (host, _state) = mock(MockState::with_latency(
        Duration::from_millis(20),
        Duration::from_millis(2),
    ))
    .await
    .unwrap();

    let stats = Swarm::new(no_wait_user())
        .host(&host)
        .users(2)
        .spawn_rate(NonZeroU32::new(100).unwrap())
        .iterations(NonZeroU64::new(25).unwrap())
        .report_interval(Duration::ZERO)
        .await
        .unwrap();

    for entry in &stats.requests {
        assert!(entry.min_latency >= Duration::from_millis(10), "{entry:?}");
        assert!(entry.latency_p50 >= Duration::from_millis(15), "{entry:?}");
        assert!(entry.avg_latency < Duration::from_millis(200), "{entry:?}");
    }
}

#[tokio::test]
async fn run_time_bounds_the_run() {
    init();
    let (host, _state) = mock(MockState::new()).await.unwrap();

    let stats = Swarm::new(api_user().unwrap())
        .host(&host)
        .users(4)
        .spawn_rate(NonZeroU32::new(20).unwrap())
        .run_time(Duration::from_millis(500))
        .report_interval(Duration::from_millis(100))
        .await
        .unwrap();

    // Every user gets its first action in before its first 1s wait.
    assert_eq!(stats.users, 4);
    assert_eq!(stats.total_tasks(), 4);
    assert!(stats.elapsed < Duration::from_secs(1));
}
