//! The `agent_task` node: writes a placeholder result card. Full agent
//! dispatch is future expansion per spec §4.3.

use async_trait::async_trait;
use serde_json::json;

use crate::domain::error::EngineError;
use crate::domain::ports::{ExecutionContext, NodeExecutor};

pub struct AgentTaskExecutor {
    pub artifact_root: std::path::PathBuf,
}

#[async_trait]
impl NodeExecutor for AgentTaskExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        let dir = self.artifact_root.join("agents").join(&ctx.node.id);
        tokio::fs::create_dir_all(&dir).await?;
        let card = json!({
            "node_id": ctx.node.id,
            "run_id": ctx.run_id,
            "status": "placeholder",
        });
        tokio::fs::write(dir.join("result.json"), serde_json::to_string_pretty(&card)?).await?;
        Ok(())
    }
}
