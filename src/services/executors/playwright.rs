//! The `playwright` node: runs the browser test suite as a subprocess.

use async_trait::async_trait;

use crate::domain::error::EngineError;
use crate::domain::ports::{ExecutionContext, NodeExecutor};
use crate::services::process;

const DEFAULT_TIMEOUT_MS: u64 = 180_000;

pub struct PlaywrightExecutor;

#[async_trait]
impl NodeExecutor for PlaywrightExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        if ctx.node.params.specs.is_empty() {
            return Err(EngineError::InvalidParams {
                node_id: ctx.node.id.clone(),
                message: "params.specs must be non-empty".to_string(),
            });
        }

        let config_path = ctx
            .merged_env
            .get("PLAYWRIGHT_CONFIG")
            .cloned()
            .unwrap_or_else(|| "playwright.config.ts".to_string());

        let mut args = vec!["playwright".to_string(), "test".to_string(), "-c".to_string(), config_path];
        args.extend(ctx.node.params.specs.iter().cloned());

        let timeout_ms = ctx.node.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        let output = process::run_with_timeout(
            &ctx.node.id,
            "npx",
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
