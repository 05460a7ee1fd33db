//! Exclusive resource lock manager with deadlock-free sorted acquisition.
//!
//! Internal mutability behind `Arc<Mutex<_>>`, with a holder plus a FIFO
//! waiter queue tracked per named resource.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

struct ResourceState {
    holder: Option<String>,
    waiters: VecDeque<(String, Arc<Notify>)>,
}

impl ResourceState {
    const fn new() -> Self {
        Self {
            holder: None,
            waiters: VecDeque::new(),
        }
    }
}

/// Tracks per-resource holders and FIFO waiter queues. Cheaply cloneable;
/// internal state lives behind an `Arc<Mutex<_>>` so every node task shares
/// the same lock table within a run.
#[derive(Clone)]
pub struct LockManager {
    state: Arc<Mutex<HashMap<String, ResourceState>>>,
    hint_dir: Option<PathBuf>,
}

impl LockManager {
    #[must_use]
    pub fn new(hint_dir: Option<PathBuf>) -> Self {
        Self {
            state: Arc::new(Mutex::new(HashMap::new())),
            hint_dir,
        }
    }

    /// Acquires every resource in `resources`, sorted lexicographically so
    /// two nodes requesting an overlapping resource set can never form a
    /// hold-and-wait cycle. Returns a guard that releases all of them (in
    /// any order) on drop... except `async` drop isn't available, so
    /// callers must call [`LockGuard::release`] explicitly.
    pub async fn acquire(&self, node_id: &str, resources: &[String]) -> LockGuard {
        let mut sorted: Vec<String> = resources.to_vec();
        sorted.sort();

        for resource in &sorted {
            loop {
                let notify = {
                    let mut table = self.state.lock().await;
                    let entry = table.entry(resource.clone()).or_insert_with(ResourceState::new);
                    if entry.holder.is_none() {
                        entry.holder = Some(node_id.to_string());
                        None
                    } else {
                        let notify = Arc::new(Notify::new());
                        entry.waiters.push_back((node_id.to_string(), notify.clone()));
                        Some(notify)
                    }
                };
                match notify {
                    None => {
                        self.write_hint(resource, node_id).await;
                        break;
                    }
                    Some(notify) => notify.notified().await,
                }
            }
        }

        LockGuard {
            manager: self.clone(),
            node_id: node_id.to_string(),
            resources: sorted,
        }
    }

    async fn release_one(&self, resource: &str) {
        let next_holder = {
            let mut table = self.state.lock().await;
            let Some(entry) = table.get_mut(resource) else {
                return;
            };
            entry.holder = None;
            if let Some((next_id, notify)) = entry.waiters.pop_front() {
                entry.holder = Some(next_id.clone());
                notify.notify_one();
                Some(next_id)
            } else {
                None
            }
        };
        match next_holder {
            Some(next_id) => self.write_hint(resource, &next_id).await,
            None => self.remove_hint(resource).await,
        }
    }

    async fn write_hint(&self, resource: &str, holder: &str) {
        let Some(dir) = &self.hint_dir else { return };
        if tokio::fs::create_dir_all(dir).await.is_err() {
            return;
        }
        let _ = tokio::fs::write(hint_path(dir, resource), holder).await;
    }

    async fn remove_hint(&self, resource: &str) {
        let Some(dir) = &self.hint_dir else { return };
        let _ = tokio::fs::remove_file(hint_path(dir, resource)).await;
    }
}

fn hint_path(dir: &Path, resource: &str) -> PathBuf {
    let safe = resource.replace(['/', ':'], "_");
    dir.join(format!("{safe}.lock"))
}

/// An active hold on one or more resources. Must be released explicitly
/// (no async Drop in stable Rust); the scheduler releases on every
/// executor exit path, mirroring spec's "release on graph teardown"
/// invariant.
pub struct LockGuard {
    manager: LockManager,
    node_id: String,
    resources: Vec<String>,
}

impl LockGuard {
    pub async fn release(self) {
        for resource in &self.resources {
            self.manager.release_one(resource).await;
        }
    }

    #[must_use]
    pub fn holder(&self) -> &str {
        &self.node_id
    }
}
