//! The `server` node: probes the staging server's health endpoint, and
//! spawns it if not already up.
//!
//! Spawns via `Command`, polls the health endpoint with
//! `tokio::time::timeout` around the shutdown wait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::error::EngineError;
use crate::domain::ports::{ExecutionContext, NodeExecutor};
use crate::services::process;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const PORT_RELEASE_WAIT: Duration = Duration::from_millis(250);

/// Tracks whether this run started the staging server, so graph teardown
/// only tears down servers it owns.
#[derive(Default)]
pub struct ServerExecutor {
    started_pid: Arc<Mutex<Option<u32>>>,
}

impl ServerExecutor {
    async fn probe_health(staging_url: &str) -> bool {
        let url = format!("{staging_url}/health");
        match reqwest::Client::new().get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// If this run started the server, kills its process group and waits
    /// for the port to release, per spec §4.3/§5's teardown guarantee.
    pub async fn teardown(&self) {
        let mut guard = self.started_pid.lock().await;
        if let Some(pid) = guard.take() {
            process::kill_tree(pid);
            tokio::time::sleep(PORT_RELEASE_WAIT).await;
        }
    }
}

#[async_trait]
impl NodeExecutor for ServerExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        let staging_url = ctx
            .merged_env
            .get("STAGING_URL")
            .cloned()
            .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());

        if Self::probe_health(&staging_url).await {
            return Ok(());
        }

        let child = process::spawn_detached("node", &["scripts/mock_server.mjs".to_string()], ctx.merged_env)
            .map_err(|err| EngineError::CommandError {
                node_id: ctx.node.id.clone(),
                message: err.to_string(),
            })?;
        if let Some(pid) = child.id() {
            *self.started_pid.lock().await = Some(pid);
        }

        let timeout_ms = ctx.node.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        while tokio::time::Instant::now() < deadline {
            if Self::probe_health(&staging_url).await {
                return Ok(());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Err(EngineError::Timeout {
            node_id: ctx.node.id.clone(),
            timeout_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn teardown_with_no_owned_server_is_a_noop() {
        let exec = ServerExecutor::default();
        exec.teardown().await;
    }
}
