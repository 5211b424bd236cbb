use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Id the service assigns to every created post.
pub const CREATED_POST_ID: u64 = 101;

const POST_COUNT: u64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub user_id: u64,
    pub id: u64,
    pub title: String,
    pub body: String,
}

impl Post {
    fn fixture(id: u64) -> Self {
        Self {
            user_id: (id - 1) / 10 + 1,
            id,
            title: format!("post {id}"),
            body: format!("body of post {id}"),
        }
    }
}

/// Shared handle onto what the mock has seen, and switches for how it behaves.
#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    list_hits: AtomicU64,
    get_hits: AtomicU64,
    create_hits: AtomicU64,
    fail_posts: AtomicBool,
    requested_ids: Mutex<Vec<u64>>,
    created: Mutex<Vec<Value>>,
    latency: Option<Normal<f64>>,
}

impl MockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by a normally distributed latency, clamped at zero.
    pub fn with_latency(mean: Duration, std: Duration) -> Self {
        let latency = Normal::new(mean.as_secs_f64(), std.as_secs_f64()).ok();
        Self {
            inner: Arc::new(Inner {
                latency,
                ..Inner::default()
            }),
        }
    }

    /// Make `GET /posts` answer with a 500.
    pub fn set_fail_posts(&self, fail: bool) {
        self.inner.fail_posts.store(fail, Ordering::Relaxed);
    }

    /// Hits on `GET /posts`, `GET /posts/:id` and `POST /posts`.
    pub fn hits(&self) -> (u64, u64, u64) {
        (
            self.inner.list_hits.load(Ordering::Relaxed),
            self.inner.get_hits.load(Ordering::Relaxed),
            self.inner.create_hits.load(Ordering::Relaxed),
        )
    }

    pub fn requested_ids(&self) -> Vec<u64> {
        self.inner
            .requested_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every body received by `POST /posts`, in arrival order.
    pub fn created(&self) -> Vec<Value> {
        self.inner
            .created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn delay(&self) {
        if let Some(latency) = &self.inner.latency {
            let secs = latency.sample(&mut rand::thread_rng()).max(0.);
            tokio::time::sleep(Duration::from_secs_f64(secs)).await;
        }
    }
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", get(get_post))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(MockState::new())).await
}

/// Serve a fresh mock on an ephemeral local port.
pub async fn spawn() -> std::io::Result<(SocketAddr, MockState)> {
    spawn_with(MockState::new()).await
}

pub async fn spawn_with(state: MockState) -> std::io::Result<(SocketAddr, MockState)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = router(state.clone());

    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!("Mock service stopped: {err}");
        }
    });

    Ok((addr, state))
}

#[debug_handler]
async fn list_posts(State(state): State<MockState>) -> Result<Json<Vec<Post>>, StatusCode> {
    state.inner.list_hits.fetch_add(1, Ordering::Relaxed);
    state.delay().await;

    if state.inner.fail_posts.load(Ordering::Relaxed) {
        debug!("MOCK SERVER ___ FAIL /posts");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json((1..=10).map(Post::fixture).collect()))
}

#[debug_handler]
async fn get_post(
    State(state): State<MockState>,
    Path(id): Path<u64>,
) -> Result<Json<Post>, StatusCode> {
    state.inner.get_hits.fetch_add(1, Ordering::Relaxed);
    state
        .inner
        .requested_ids
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(id);
    state.delay().await;

    if (1..=POST_COUNT).contains(&id) {
        Ok(Json(Post::fixture(id)))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

#[debug_handler]
async fn create_post(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.inner.create_hits.fetch_add(1, Ordering::Relaxed);
    state
        .inner
        .created
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(body.clone());
    state.delay().await;

    let mut created = body;
    if let Value::Object(fields) = &mut created {
        fields.insert("id".to_string(), Value::from(CREATED_POST_ID));
    }
    (StatusCode::CREATED, Json(created))
}
