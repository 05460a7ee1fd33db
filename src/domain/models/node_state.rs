//! Mutable, persisted per-node execution state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl NodeStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeState {
    pub status: NodeStatus,
    #[serde(default)]
    pub attempts: u32,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error: Option<String>,
}

impl NodeState {
    #[must_use]
    pub fn queued() -> Self {
        Self {
            status: NodeStatus::Queued,
            attempts: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Marks the start of an execution attempt. `attempts` counts
    /// executions, not retries, so the very first dispatch brings it to 1 —
    /// a node that exhausts `retries.max` retries has `attempts == max + 1`.
    pub fn start(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.status = NodeStatus::Running;
        self.attempts += 1;
        self.started_at = Some(now);
        self.error = None;
    }

    pub fn succeed(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.status = NodeStatus::Succeeded;
        self.finished_at = Some(now);
        self.error = None;
    }

    pub fn fail(&mut self, now: chrono::DateTime<chrono::Utc>, error: impl Into<String>) {
        self.status = NodeStatus::Failed;
        self.finished_at = Some(now);
        self.error = Some(error.into());
    }

    /// Requeues after a transient failure. `attempts` is bumped on the next
    /// [`NodeState::start`], not here, so it always reflects executions run
    /// rather than retries scheduled.
    pub fn requeue(&mut self, error: impl Into<String>) {
        self.status = NodeStatus::Queued;
        self.error = Some(error.into());
    }

    /// Applied on resume: any node observed `running` crashed mid-run and
    /// is never silently retried.
    pub fn mark_crashed(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.status = NodeStatus::Failed;
        self.finished_at = Some(now);
        self.error = Some("crashed during previous run".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_queued_to_succeeded() {
        let mut s = NodeState::queued();
        let t1 = chrono::Utc::now();
        s.start(t1);
        assert_eq!(s.status, NodeStatus::Running);
        s.succeed(t1);
        assert_eq!(s.status, NodeStatus::Succeeded);
        assert!(s.status.is_terminal());
    }

    #[test]
    fn start_increments_attempts_not_requeue() {
        let mut s = NodeState::queued();
        s.start(chrono::Utc::now());
        assert_eq!(s.attempts, 1);
        s.requeue("ECONNREFUSED");
        assert_eq!(s.attempts, 1);
        assert_eq!(s.status, NodeStatus::Queued);
        s.start(chrono::Utc::now());
        assert_eq!(s.attempts, 2);
    }

    #[test]
    fn crash_recovery_marks_failed_with_fixed_message() {
        let mut s = NodeState::queued();
        s.start(chrono::Utc::now());
        s.mark_crashed(chrono::Utc::now());
        assert_eq!(s.status, NodeStatus::Failed);
        assert_eq!(s.error.as_deref(), Some("crashed during previous run"));
    }
}
