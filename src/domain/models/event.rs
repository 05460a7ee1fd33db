//! Observability event stream types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum Event {
    GraphStart {
        run_id: String,
        graph_id: String,
    },
    NodeStarted {
        run_id: String,
        node_id: String,
    },
    NodeSucceeded {
        run_id: String,
        node_id: String,
    },
    NodeFailed {
        run_id: String,
        node_id: String,
        error: String,
    },
    NodeRetry {
        run_id: String,
        node_id: String,
        attempt: u32,
        error: String,
    },
    GraphSucceeded {
        run_id: String,
    },
    GraphFailed {
        run_id: String,
        failed_nodes: Vec<String>,
    },
    GraphError {
        run_id: String,
        message: String,
    },
    RouterPreview {
        run_id: String,
        auv_id: String,
        node_type: String,
        decision: Value,
    },
    BackupCreated {
        run_id: String,
        path: String,
    },
}

/// A fully serialized hooks-log record: timestamp plus the event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts: chrono::DateTime<chrono::Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventRecord {
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            ts: chrono::Utc::now(),
            event,
        }
    }
}
