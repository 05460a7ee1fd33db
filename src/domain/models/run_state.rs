//! Durable run state: the on-disk resume point for a single graph run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::node_state::{NodeState, NodeStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub graph_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub nodes: HashMap<String, NodeState>,
}

impl RunState {
    #[must_use]
    pub fn new(run_id: String, graph_id: String, node_ids: impl Iterator<Item = String>) -> Self {
        Self {
            run_id,
            graph_id,
            started_at: chrono::Utc::now(),
            finished_at: None,
            nodes: node_ids.map(|id| (id, NodeState::queued())).collect(),
        }
    }

    #[must_use]
    pub fn completed(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, s)| s.status == NodeStatus::Succeeded)
            .map(|(id, _)| id.clone())
            .collect()
    }

    #[must_use]
    pub fn failed(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, s)| s.status == NodeStatus::Failed)
            .map(|(id, _)| id.clone())
            .collect()
    }

    #[must_use]
    pub fn all_terminal(&self) -> bool {
        self.nodes.values().all(|s| s.status.is_terminal())
    }

    /// Resume reclassification: a node observed `Running` at the time the
    /// previous process died is reclassified `Failed` so it is never
    /// silently retried.
    pub fn reclassify_crashed(&mut self) {
        let now = chrono::Utc::now();
        for state in self.nodes.values_mut() {
            if state.status == NodeStatus::Running {
                state.mark_crashed(now);
            }
        }
    }
}

/// Generates a 12-character opaque run id from lowercase hex, sourced from
/// a `uuid::Uuid::new_v4()` so ids remain unique without a counter or clock
/// dependency.
#[must_use]
pub fn new_run_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    uuid.simple().to_string()[..12].to_string()
}
