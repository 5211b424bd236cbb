use mock_service::MockState;
use std::time::Duration;
use swarm::prelude::*;
use swarm::TRANSACTION_KIND;
use swarm_tests::mock;

#[transaction]
async fn read_post_and_list(client: &Client) -> Result<(), RequestError> {
    client.get("/posts/1").await?;
    client.get("/posts").await?;
    Ok(())
}

#[transaction("missing post")]
async fn read_missing_post(client: &Client) -> Result<(), RequestError> {
    client.get("/posts/1000").await?;
    Ok(())
}

#[tokio::test]
async fn transactions_are_recorded() {
    let (host, _state) = mock(MockState::new()).await.unwrap();

    let profile = UserProfile::new("TransactionUser")
        .task(Task::new("read", |client: Client| async move {
            read_post_and_list(&client).await
        }))
        .task(Task::new("missing", |client: Client| async move {
            read_missing_post(&client).await
        }));

    let stats = Swarm::new(profile)
        .host(&host)
        .iterations(NonZeroU64::new(20).unwrap())
        .seed(3)
        .report_interval(Duration::ZERO)
        .await
        .unwrap();

    let reads = stats.task_count("read");
    let misses = stats.task_count("missing");
    assert_eq!(reads + misses, 20);

    let read_tx = stats
        .request(TRANSACTION_KIND, "read_post_and_list")
        .unwrap();
    assert_eq!(read_tx.num_requests, reads);
    assert_eq!(read_tx.num_failures, 0);
    assert_eq!(stats.request("GET", "/posts").unwrap().num_requests, reads);

    let miss_tx = stats.request(TRANSACTION_KIND, "missing post").unwrap();
    assert_eq!(miss_tx.num_requests, misses);
    assert_eq!(miss_tx.num_failures, misses);
    assert_eq!(
        stats.request("GET", "/posts/1000").unwrap().num_failures,
        misses
    );
}

#[tracing_test::traced_test]
#[tokio::test]
async fn transactions_run_outside_a_swarm() {
    let (host, state) = mock(MockState::new()).await.unwrap();
    let client = Client::new(&host).unwrap();

    read_post_and_list(&client).await.unwrap();

    assert_eq!(state.hits(), (1, 1, 0));
    assert!(logs_contain("No hook available."));
}
