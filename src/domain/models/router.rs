//! Capability router data model: tool registry, policy document, and the
//! routing decision produced per planning call.
//!
//! A config struct (tool registry, policy document) paired with a pure
//! selection-result struct (routing decision, planned/rejected tools).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRegistryEntry {
    pub tool_id: String,
    pub tier: Tier,
    pub capabilities: Vec<String>,
    pub cost_per_call_usd: f64,
    #[serde(default)]
    pub requires_api_key: bool,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub side_effects: Vec<String>,
}

impl ToolRegistryEntry {
    /// Default env var name for this tool's API key, e.g. `lighthouse` ->
    /// `LIGHTHOUSE_API_KEY`, unless `api_key_env` overrides it.
    #[must_use]
    pub fn api_key_env_name(&self) -> String {
        self.api_key_env
            .clone()
            .unwrap_or_else(|| format!("{}_API_KEY", self.tool_id.to_uppercase()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum OnMissingPrimary {
    ProposeSecondary { fallback_budget_usd: f64 },
    Reject,
}

impl OnMissingPrimary {
    #[must_use]
    pub const fn propose_secondary(fallback_budget_usd: f64) -> Self {
        Self::ProposeSecondary { fallback_budget_usd }
    }

    #[must_use]
    pub const fn fallback_budget_usd(self) -> Option<f64> {
        match self {
            Self::ProposeSecondary { fallback_budget_usd } => Some(fallback_budget_usd),
            Self::Reject => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// capability -> candidate tool ids in preference order
    #[serde(default)]
    pub capability_candidates: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub per_tool_budget_usd: HashMap<String, f64>,
    /// keyed by `"primary"` / `"secondary"` rather than `Tier` directly so
    /// this round-trips through JSON/YAML map keys without a custom
    /// string<->enum bridge.
    #[serde(default)]
    pub tier_default_budget_usd: HashMap<String, f64>,
    #[serde(default)]
    pub on_missing_primary: HashMap<String, OnMissingPrimary>,
    #[serde(default)]
    pub agent_allowlists: HashMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedTool {
    pub tool_id: String,
    pub capabilities: Vec<String>,
    pub estimated_cost_usd: f64,
    pub side_effects: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedTool {
    pub tool_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Totals {
    pub total_cost_usd: f64,
    pub min_feasible_budget_usd: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub ok: bool,
    pub tool_plan: Vec<PlannedTool>,
    pub rejected: Vec<RejectedTool>,
    pub warnings: Vec<String>,
    pub totals: Totals,
}

/// A single spend ledger entry, appended per routing decision per tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendEntry {
    pub session_id: String,
    pub tool_id: String,
    pub estimated_cost_usd: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl Tier {
    #[must_use]
    pub const fn as_key(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}
