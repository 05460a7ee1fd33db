//! One [`NodeExecutor`](crate::domain::ports::NodeExecutor) implementation
//! per node kind, dispatched by [`dispatch`].

pub mod agent_task;
pub mod cvf;
pub mod lighthouse;
pub mod package;
pub mod playwright;
pub mod report;
pub mod server;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::error::EngineError;
use crate::domain::models::NodeType;
use crate::domain::ports::{ExecutionContext, NodeExecutor, PackageBuilder, ReportBuilder};
use crate::services::capability_router::{CapabilityRouter, PlanRequest};
use crate::services::observability::Observability;

/// Shared config consulted by the router-preview hook (spec §4.3).
#[derive(Clone)]
pub struct RouterPreviewConfig {
    pub enabled: bool,
    pub artifact_root: std::path::PathBuf,
}

/// Bundles the executors plus the collaborators they need (router, registry
/// shared for preview, observability) so [`dispatch`] can stay a thin
/// switch over `NodeType`.
pub struct ExecutorRegistry {
    pub server: server::ServerExecutor,
    pub playwright: playwright::PlaywrightExecutor,
    pub lighthouse: lighthouse::LighthouseExecutor,
    pub cvf: cvf::CvfExecutor,
    pub agent_task: agent_task::AgentTaskExecutor,
    pub package: package::PackageExecutor,
    pub report: report::ReportExecutor,
}

impl ExecutorRegistry {
    #[must_use]
    pub fn new(
        artifact_root: std::path::PathBuf,
        package_builder: Arc<dyn PackageBuilder>,
        report_builder: Arc<dyn ReportBuilder>,
    ) -> Self {
        Self {
            server: server::ServerExecutor::default(),
            playwright: playwright::PlaywrightExecutor,
            lighthouse: lighthouse::LighthouseExecutor,
            cvf: cvf::CvfExecutor,
            agent_task: agent_task::AgentTaskExecutor {
                artifact_root: artifact_root.clone(),
            },
            package: package::PackageExecutor {
                builder: package_builder,
            },
            report: report::ReportExecutor {
                builder: report_builder,
            },
        }
    }

    pub async fn dispatch(&self, node_type: &NodeType, ctx: ExecutionContext<'_>) -> Result<(), EngineError> {
        match node_type {
            NodeType::Server => self.server.execute(ctx).await,
            NodeType::Playwright => self.playwright.execute(ctx).await,
            NodeType::Lighthouse => self.lighthouse.execute(ctx).await,
            NodeType::Cvf => self.cvf.execute(ctx).await,
            NodeType::AgentTask => self.agent_task.execute(ctx).await,
            NodeType::Package => self.package.execute(ctx).await,
            NodeType::Report => self.report.execute(ctx).await,
        }
    }
}

/// Default capabilities requested for the router-preview hook when the AUV
/// spec doesn't declare its own, per spec §4.3.
fn default_capabilities_for(node_type: &NodeType) -> Vec<String> {
    match node_type {
        NodeType::Playwright => vec!["browser.automation".to_string()],
        NodeType::Lighthouse => vec!["perf.web".to_string()],
        NodeType::Cvf => vec!["capability.verification".to_string()],
        _ => vec![],
    }
}

/// Runs the router in preview mode for `{playwright, lighthouse, cvf}`
/// nodes when `ROUTER_DRY` is enabled, writing the decision to
/// `runs/<AUV_ID>/router_preview_<type>.json` and appending a spend entry
/// per planned tool.
pub async fn maybe_preview_route(
    config: &RouterPreviewConfig,
    router: &CapabilityRouter<'_>,
    observability: &Observability,
    session_id: &str,
    run_id: &str,
    node_type: &NodeType,
    auv_id: &str,
    agent_id: &str,
) -> std::io::Result<()> {
    if !config.enabled {
        return Ok(());
    }
    if !matches!(node_type, NodeType::Playwright | NodeType::Lighthouse | NodeType::Cvf) {
        return Ok(());
    }

    let request = PlanRequest {
        agent_id,
        requested_capabilities: &default_capabilities_for(node_type),
        budget_usd: None,
        secondary_consent: false,
        env: &std::env::vars().collect::<HashMap<_, _>>(),
    };
    let decision = router.plan(&request);

    let dir = config.artifact_root.join(auv_id);
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(format!("router_preview_{}.json", node_type.as_str()));
    let json = serde_json::to_string_pretty(&decision).unwrap_or_else(|_| "{}".to_string());
    tokio::fs::write(&path, json).await?;

    observability
        .emit(crate::domain::models::Event::RouterPreview {
            run_id: run_id.to_string(),
            auv_id: auv_id.to_string(),
            node_type: node_type.as_str().to_string(),
            decision: serde_json::to_value(&decision).unwrap_or(serde_json::Value::Null),
        })
        .await;

    for tool in &decision.tool_plan {
        observability
            .record_spend(&crate::domain::models::SpendEntry {
                session_id: session_id.to_string(),
                tool_id: tool.tool_id.clone(),
                estimated_cost_usd: tool.estimated_cost_usd,
                timestamp: chrono::Utc::now(),
            })
            .await;
    }

    Ok(())
}
