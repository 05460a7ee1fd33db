//! The `report` node: invokes the report builder as a library call. Report
//! rendering itself is a Non-goal; this executor only owns the error
//! mapping and the `REPORT_FAILED` exit code contract.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::EngineError;
use crate::domain::ports::{ExecutionContext, NodeExecutor, ReportBuilder};

pub struct ReportExecutor {
    pub builder: Arc<dyn ReportBuilder>,
}

#[async_trait]
impl NodeExecutor for ReportExecutor {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        let auv_id = ctx.node.auv_id().unwrap_or_else(|| ctx.node.id.clone());
        self.builder
            .build(&auv_id, ctx.run_id)
            .await
            .map(|_| ())
            .map_err(EngineError::ReportFailed)
    }
}

pub struct NoopReportBuilder;

#[async_trait]
impl ReportBuilder for NoopReportBuilder {
    async fn build(&self, auv_id: &str, run_id: &str) -> Result<serde_json::Value, String> {
        Ok(serde_json::json!({ "auv_id": auv_id, "run_id": run_id, "sections": [] }))
    }
}
