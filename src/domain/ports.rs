//! Trait boundaries between the engine core and its external collaborators
//! (subprocess tools, package/report builders), each a one-method
//! `#[async_trait]` so the core can be exercised against fakes in tests.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::error::EngineError;
use crate::domain::models::NodeSpec;

/// Context passed to every node executor: the node itself, its merged
/// environment, and the owning run id.
pub struct ExecutionContext<'a> {
    pub node: &'a NodeSpec,
    pub merged_env: &'a HashMap<String, String>,
    pub run_id: &'a str,
}

/// One implementation per `NodeType`. Implementations own their own
/// subprocess/IO concerns; the scheduler only sees success or a typed
/// error.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    async fn execute(&self, ctx: ExecutionContext<'_>) -> Result<(), EngineError>;
}

/// Library-call contract for packaging: invoked synchronously (from the
/// executor's point of view), not as a subprocess, per the Non-goals.
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    async fn build(&self, auv_id: &str, run_id: &str) -> Result<serde_json::Value, String>;
}

/// Library-call contract for report rendering.
#[async_trait]
pub trait ReportBuilder: Send + Sync {
    async fn build(&self, auv_id: &str, run_id: &str) -> Result<serde_json::Value, String>;
}
