//! Durable per-run state persistence.
//!
//! Write to a temp file then rename, so a crash mid-write never corrupts
//! the resume point.

use std::path::PathBuf;

use crate::domain::error::EngineError;
use crate::domain::models::RunState;

pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root.join("graph").join(run_id)
    }

    fn state_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join("state.json")
    }

    pub async fn save(&self, state: &RunState) -> Result<(), EngineError> {
        let dir = self.run_dir(&state.run_id);
        tokio::fs::create_dir_all(&dir).await?;
        let final_path = self.state_path(&state.run_id);
        let tmp_path = dir.join("state.json.tmp");
        let json = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &final_path).await?;
        Ok(())
    }

    pub async fn load(&self, run_id: &str) -> Result<RunState, EngineError> {
        let path = self.state_path(run_id);
        if !path.exists() {
            return Err(EngineError::FileNotFound(path));
        }
        let contents = tokio::fs::read_to_string(&path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    #[must_use]
    pub fn exists(&self, run_id: &str) -> bool {
        self.state_path(run_id).exists()
    }
}

/// Loads a run's durable state and reclassifies any node that was left
/// `running` when the previous process died, per spec §4.5's resume
/// algorithm.
pub async fn resume(store: &StateStore, run_id: &str) -> Result<RunState, EngineError> {
    let mut state = store.load(run_id).await?;
    state.reclassify_crashed();
    store.save(&state).await?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NodeStatus;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let state = RunState::new(
            "run000000001".into(),
            "proj".into(),
            vec!["a".to_string()].into_iter(),
        );
        store.save(&state).await.unwrap();
        let loaded = store.load("run000000001").await.unwrap();
        assert_eq!(loaded.run_id, state.run_id);
        assert_eq!(loaded.nodes["a"].status, NodeStatus::Queued);
    }

    #[tokio::test]
    async fn resume_fails_running_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let mut state = RunState::new(
            "run000000002".into(),
            "proj".into(),
            vec!["a".to_string(), "b".to_string()].into_iter(),
        );
        state.nodes.get_mut("a").unwrap().start(chrono::Utc::now());
        state.nodes.get_mut("b").unwrap().start(chrono::Utc::now());
        state.nodes.get_mut("b").unwrap().succeed(chrono::Utc::now());
        store.save(&state).await.unwrap();

        let resumed = resume(&store, "run000000002").await.unwrap();
        assert_eq!(resumed.nodes["a"].status, NodeStatus::Failed);
        assert_eq!(
            resumed.nodes["a"].error.as_deref(),
            Some("crashed during previous run")
        );
        assert_eq!(resumed.nodes["b"].status, NodeStatus::Succeeded);
    }

    #[tokio::test]
    async fn load_missing_run_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let err = store.load("nope").await.unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
    }
}
