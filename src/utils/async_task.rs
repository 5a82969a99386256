use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::error;
use tracing::info_span;
use tracing::warn;
use tracing::Instrument;

use crate::Result;

/// Spawns a long-lived worker inside a span named after it.
///
/// The returned handle is the worker's completion signal; owners keep it and
/// await it before forgetting the worker.
pub fn spawn_worker<F>(
    name: &str,
    fut: F,
) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(fut.instrument(info_span!("worker", name = %name)))
}

/// Helper function to spawn tasks and track their JoinHandles
pub fn spawn_task<F, Fut>(
    name: &str,
    task_fn: F,
    handles: Option<&mut Vec<JoinHandle<()>>>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let name = name.to_string();
    let handle = tokio::spawn(async move {
        if let Err(e) = task_fn().await {
            error!("spawned task: {name} stopped or encountered an error: {:?}", e);
        }
    });

    if let Some(h) = handles {
        h.push(handle);
    }
}

/// Awaits every handle, giving up on the stragglers after `timeout`.
///
/// Returns the number of workers that did not finish in time.
pub async fn join_all_with_timeout(
    handles: Vec<JoinHandle<()>>,
    timeout: Duration,
) -> usize {
    let total = handles.len();
    let mut finished = 0;
    let joined = tokio::time::timeout(timeout, async {
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("worker terminated abnormally: {:?}", e);
            }
            finished += 1;
        }
    })
    .await;

    if joined.is_err() {
        warn!("{} of {} workers still running after {:?}", total - finished, total, timeout);
    }
    total - finished
}
