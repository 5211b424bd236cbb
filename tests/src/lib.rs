//! Shared helpers for the end-to-end tests.
use mock_service::MockState;
use std::sync::OnceLock;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub fn init() {
    static ONCE_LOCK: OnceLock<()> = OnceLock::new();

    ONCE_LOCK.get_or_init(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            default_panic(info);
            error!("Panic occurred: {info:?}");
        }));

        let _ = FmtSubscriber::builder()
            .with_env_filter(EnvFilter::new(
                "swarm=debug,posts_load=debug,mock_service=info",
            ))
            .with_test_writer()
            .try_init();
    });
}

/// A fresh mock posts service; returns its base URL.
pub async fn mock(state: MockState) -> anyhow::Result<(String, MockState)> {
    let (addr, state) = mock_service::spawn_with(state).await?;
    Ok((format!("http://{addr}"), state))
}
