//! Loads and validates a graph specification from a YAML file.

use std::path::Path;

use crate::domain::error::EngineError;
use crate::domain::models::{GraphSpec, LoadedGraph};

/// Reads `path`, parses it as a `GraphSpec`, and validates schema/structure,
/// returning a [`LoadedGraph`] ready for the scheduler.
pub async fn load(path: &Path) -> Result<LoadedGraph, EngineError> {
    if !path.exists() {
        return Err(EngineError::FileNotFound(path.to_path_buf()));
    }
    let contents = tokio::fs::read_to_string(path).await?;
    let spec: GraphSpec = serde_yaml::from_str(&contents)?;
    LoadedGraph::build(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_file_not_found() {
        let err = load(Path::new("/nonexistent/graph.yaml")).await.unwrap_err();
        assert!(matches!(err, EngineError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn loads_a_valid_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.yaml");
        tokio::fs::write(
            &path,
            r#"
version: "1.0"
project_id: demo
concurrency: 2
nodes:
  - id: server
    type: server
  - id: ui
    type: playwright
    requires: [server]
    params:
      specs: ["tests/ui.spec.ts"]
edges: []
"#,
        )
        .await
        .unwrap();
        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded.nodes_by_id.len(), 2);
        assert!(loaded.adjacency["server"].contains("ui"));
    }

    #[tokio::test]
    async fn rejects_malformed_yaml_as_yaml_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.yaml");
        tokio::fs::write(&path, "not: [valid yaml").await.unwrap();
        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, EngineError::Yaml(_)));
    }
}
