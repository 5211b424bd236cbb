use crate::collector::StatsCollector;
use std::time::Instant;
use std::{future::Future, sync::Arc};

/// Transaction hook used by [`Client`](crate::Client) and the `#[transaction]` macro.
///
/// Times `func` and records its outcome under `(kind, name)` in the statistics of the swarm
/// the current task belongs to. `Ok` counts as a success, `Err` as a failure.
pub async fn transaction_hook<T, R, E>(kind: &str, name: &str, func: T) -> T::Output
where
    T: Future<Output = Result<R, E>>,
{
    if let Ok(hook) = TRANSACTION_HOOK.try_with(|v| v.clone()) {
        let start = Instant::now();
        let res = func.await;
        let elapsed = start.elapsed();

        hook.collector.record(kind, name, elapsed, res.is_ok());

        #[cfg(feature = "metrics")]
        {
            let labels = [("kind", kind.to_string()), ("name", name.to_string())];
            metrics::histogram!("swarm.request.latency", &labels).record(elapsed.as_secs_f64());
            if res.is_ok() {
                metrics::counter!("swarm.request.success", &labels).increment(1);
            } else {
                metrics::counter!("swarm.request.error", &labels).increment(1);
            }
        }

        res
    } else {
        tracing::warn!("No hook available.");
        func.await
    }
}

#[derive(Clone)]
pub(crate) struct TransactionData {
    pub collector: Arc<StatsCollector>,
}

tokio::task_local! {
    pub(crate) static TRANSACTION_HOOK: TransactionData;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn records_inside_scope() {
        let collector = Arc::new(StatsCollector::new());
        let data = TransactionData {
            collector: collector.clone(),
        };

        TRANSACTION_HOOK
            .scope(data, async {
                let _ = transaction_hook::<_, (), ()>("TX", "ok", async { Ok(()) }).await;
                let _ = transaction_hook::<_, (), ()>("TX", "ok", async {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    Err(())
                })
                .await;
            })
            .await;

        let (requests, failures) = collector.totals();
        assert_eq!(requests, 2);
        assert_eq!(failures, 1);

        let stats = collector.snapshot();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].method, "TX");
        assert!(stats[0].max_latency >= Duration::from_millis(5));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn passes_through_without_scope() {
        let res = transaction_hook::<_, u32, ()>("TX", "outside", async { Ok(7) }).await;
        assert_eq!(res, Ok(7));
        assert!(logs_contain("No hook available."));
    }
}
