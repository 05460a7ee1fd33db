//! The `cvf` node: validates that an AUV's required artifacts exist via
//! the capability-verification subprocess.

use async_trait::async_trait;

use crate::domain::error::EngineError;
use crate::domain::ports::{ExecutionContext, NodeExecutor};
use crate::services::process;

const DEFAULT_TIMEOUT_MS: u64 = 60_000;

pub struct CvfExecutor;

#[async_trait]
impl NodeExecutor for CvfExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        let Some(auv) = &ctx.node.params.auv else {
            return Err(EngineError::InvalidParams {
                node_id: ctx.node.id.clone(),
                message: "params.auv is required".to_string(),
            });
        };

        let args = vec!["orchestration/cvf-check.mjs".to_string(), auv.clone()];
        let timeout_ms = ctx.node.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        let output = process::run_with_timeout(
            &ctx.node.id,
            "node",
            &args,
            ctx.merged_env,
            std::time::Duration::from_millis(timeout_ms),
        )
        .await?;

        if output.exit_code == Some(0) {
            Ok(())
        } else {
            Err(EngineError::CommandFailed {
                node_id: ctx.node.id.clone(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
    }
}
