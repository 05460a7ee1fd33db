//! The `package` node: invokes the package builder as a library call, per
//! the Non-goals (no subprocess, no packaging format implemented here).

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::EngineError;
use crate::domain::ports::{ExecutionContext, NodeExecutor, PackageBuilder};

pub struct PackageExecutor {
    pub builder: Arc<dyn PackageBuilder>,
}

#[async_trait]
impl NodeExecutor for PackageExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        let auv_id = ctx.node.auv_id().unwrap_or_else(|| ctx.node.id.clone());
        self.builder
            .build(&auv_id, ctx.run_id)
            .await
            .map(|_| ())
            .map_err(EngineError::PackageFailed)
    }
}

/// A builder that never fails, useful for wiring the CLI before a real
/// packaging implementation lands.
pub struct NoopPackageBuilder;

#[async_trait]
impl PackageBuilder for NoopPackageBuilder {
    async fn build(&self, auv_id: &str, run_id: &str) -> Result<serde_json::Value, String> {
        Ok(serde_json::json!({ "auv_id": auv_id, "run_id": run_id, "artifacts": [] }))
    }
}
