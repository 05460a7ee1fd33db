use std::collections::HashMap;
use std::path::Path;

use crate::domain::models::{PolicyDocument, ToolRegistryEntry};
use crate::services::capability_router::{CapabilityRouter, PlanRequest};

/// Runs the capability router standalone against a registry/policy pair
/// loaded from YAML files, printing the routing decision as JSON.
pub async fn handle(
    agent: &str,
    capabilities: &[String],
    budget: Option<f64>,
    consent: bool,
    registry_path: &Path,
    policy_path: &Path,
) -> i32 {
    let registry = match load_registry(registry_path).await {
        Ok(r) => r,
        Err(err) => {
            eprintln!("error loading registry: {err}");
            return 202;
        }
    };
    let policies = match load_policy(policy_path).await {
        Ok(p) => p,
        Err(err) => {
            eprintln!("error loading policy: {err}");
            return 202;
        }
    };

    let env: HashMap<String, String> = std::env::vars().collect();
    let router = CapabilityRouter::new(&registry, &policies);
    let decision = router.plan(&PlanRequest {
        agent_id: agent,
        requested_capabilities: capabilities,
        budget_usd: budget,
        secondary_consent: consent,
        env: &env,
    });

    println!("{}", serde_json::to_string_pretty(&decision).unwrap_or_default());
    i32::from(!decision.ok)
}

async fn load_registry(path: &Path) -> Result<HashMap<String, ToolRegistryEntry>, String> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| e.to_string())?;
    let entries: Vec<ToolRegistryEntry> = serde_yaml::from_str(&contents).map_err(|e| e.to_string())?;
    Ok(entries.into_iter().map(|e| (e.tool_id.clone(), e)).collect())
}

async fn load_policy(path: &Path) -> Result<PolicyDocument, String> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| e.to_string())?;
    serde_yaml::from_str(&contents).map_err(|e| e.to_string())
}
