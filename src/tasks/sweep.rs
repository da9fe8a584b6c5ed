//! Periodic Sweep Task
//!
//! Background task that periodically removes expired entries from a cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Something that can drop its expired or evictable entries on demand.
#[async_trait]
pub trait Sweep: Send + Sync + 'static {
    /// Runs one pass and returns the number of entries removed.
    async fn sweep(&self) -> usize;
}

/// Spawns a background task that calls `target.sweep()` every `interval`.
///
/// The first pass runs one full interval after spawning. The returned
/// handle is used to abort the task on shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_sweep_task(target, Duration::from_secs(300));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_sweep_task(target: Arc<dyn Sweep>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting cache sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = target.sweep().await;
            if removed > 0 {
                info!("Cache sweep: removed {} entries", removed);
            } else {
                debug!("Cache sweep: nothing to remove");
            }
        }
    })
}
