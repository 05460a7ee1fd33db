//! The `lighthouse` node: runs the performance audit script as a subprocess.

use async_trait::async_trait;

use crate::domain::error::EngineError;
use crate::domain::ports::{ExecutionContext, NodeExecutor};
use crate::services::process;

const DEFAULT_TIMEOUT_MS: u64 = 90_000;

pub struct LighthouseExecutor;

#[async_trait]
impl NodeExecutor for LighthouseExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        let Some(url_template) = &ctx.node.params.url else {
            return Err(EngineError::InvalidParams {
                node_id: ctx.node.id.clone(),
                message: "params.url is required".to_string(),
            });
        };
        let Some(out) = &ctx.node.params.out else {
            return Err(EngineError::InvalidParams {
                node_id: ctx.node.id.clone(),
                message: "params.out is required".to_string(),
            });
        };

        let staging_url = ctx
            .merged_env
            .get("STAGING_URL")
            .cloned()
            .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());
        let url = url_template.replace("${STAGING_URL}", &staging_url);

        if let Some(parent) = std::path::Path::new(out).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = vec![
            "scripts/perf_lighthouse.mjs".to_string(),
            url,
            out.clone(),
        ];
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
