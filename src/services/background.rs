use futures::future::BoxFuture;
use tracing::{debug, error};

pub type DetachedTask = BoxFuture<'static, anyhow::Result<()>>;

/// Runs work whose result nobody waits for.
///
/// Implementations must never propagate a task's failure back to the code that
/// spawned it; failures end up in the log and nowhere else.
pub trait TaskSpawner: Send + Sync {
    fn spawn_detached(&self, name: &'static str, task: DetachedTask);
}

/// Spawns detached tasks onto the current tokio runtime
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTaskSpawner;

impl TaskSpawner for TokioTaskSpawner {
    fn spawn_detached(&self, name: &'static str, task: DetachedTask) {
        tokio::spawn(async move {
            match task.await {
                Ok(()) => debug!(task = name, "background task finished"),
                Err(e) => error!(task = name, error = %e, "background task failed"),
            }
        });
    }
}
