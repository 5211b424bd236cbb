//! Simulated user of a JSONPlaceholder-style posts API.
//!
//! Each user fetches the post list, fetches post 1 or creates a post, picking the list twice as
//! often as either of the others, and pauses 1 to 3 seconds between actions. Failed requests
//! are left to the swarm's statistics.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use swarm::prelude::*;

pub const DEFAULT_HOST: &str = "https://jsonplaceholder.typicode.com";

pub const POSTS_PATH: &str = "/posts";
pub const SINGLE_POST_PATH: &str = "/posts/1";

pub const MIN_WAIT: Duration = Duration::from_secs(1);
pub const MAX_WAIT: Duration = Duration::from_secs(3);

/// Body sent by [`create_post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    pub title: String,
    pub body: String,
    pub user_id: i64,
}

impl Default for PostPayload {
    fn default() -> Self {
        Self {
            title: "Load testing with Locust".to_string(),
            body: "This is a test post".to_string(),
            user_id: 1,
        }
    }
}

pub fn api_user() -> Result<UserProfile, SwarmError> {
    Ok(UserProfile::new("ApiUser")
        .host(DEFAULT_HOST)
        .wait_time(WaitTime::between(MIN_WAIT, MAX_WAIT)?)
        .task(Task::new("get_posts", get_posts).set_weight(2)?)
        .task(Task::new("get_single_post", get_single_post))
        .task(Task::new("create_post", create_post)))
}

/// Fetch all posts
pub async fn get_posts(client: Client) -> TaskResult {
    client.get(POSTS_PATH).await?;
    Ok(())
}

/// Fetch a single post
pub async fn get_single_post(client: Client) -> TaskResult {
    client.get(SINGLE_POST_PATH).await?;
    Ok(())
}

/// Create a new post
pub async fn create_post(client: Client) -> TaskResult {
    client
        .post_json(POSTS_PATH, &PostPayload::default())
        .await?;
    Ok(())
}
