//! Change Listener Task
//!
//! Background task that applies queued change events to the cache.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::ResourceCache;
use crate::exchange::{invalidate, ChangeEvent};

/// Spawns a task that drains `events` and invalidates `cache` for each one.
///
/// `excluded_id` is the composite key of the local node; its entries survive
/// every invalidation. The task ends once every sender has been dropped.
///
/// # Example
/// ```ignore
/// let (tx, rx) = tokio::sync::mpsc::channel(256);
/// let handle = spawn_change_listener(cache.clone(), rx, Some("userdev/an12345".into()));
/// drop(tx);
/// handle.await?;
/// ```
pub fn spawn_change_listener(
    cache: Arc<ResourceCache>,
    mut events: mpsc::Receiver<ChangeEvent>,
    excluded_id: Option<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(excluded = ?excluded_id, "Starting change listener");

        let mut applied = 0u64;
        while let Some(event) = events.recv().await {
            let removed = invalidate(&cache, &event, excluded_id.as_deref());
            applied += 1;
            if removed == 0 {
                debug!(org = %event.org_id, id = %event.id, "change event removed nothing");
            }
        }

        info!(applied, "Change queue closed, listener stopped");
    })
}
