//! Capability router: a pure planner mapping requested capabilities to
//! concrete tools under allowlist, credential, consent, and budget gates.
//!
//! A config struct plus one pure `plan`-style method with no I/O: given a
//! requested set of capabilities, picks a concrete tool per capability
//! under allowlist, credential, consent, and budget gates.

use std::collections::{HashMap, HashSet};

use crate::domain::models::{
    OnMissingPrimary, PlannedTool, PolicyDocument, RejectedTool, RoutingDecision, Tier, Totals,
    ToolRegistryEntry,
};

pub struct PlanRequest<'a> {
    pub agent_id: &'a str,
    pub requested_capabilities: &'a [String],
    pub budget_usd: Option<f64>,
    pub secondary_consent: bool,
    pub env: &'a HashMap<String, String>,
}

/// Pure planner over an immutable registry and policy document. No I/O
/// happens inside [`CapabilityRouter::plan`]; callers pass `env` as a map
/// so the router stays deterministic and cheap to test.
pub struct CapabilityRouter<'a> {
    registry: &'a HashMap<String, ToolRegistryEntry>,
    policies: &'a PolicyDocument,
}

impl<'a> CapabilityRouter<'a> {
    #[must_use]
    pub const fn new(registry: &'a HashMap<String, ToolRegistryEntry>, policies: &'a PolicyDocument) -> Self {
        Self { registry, policies }
    }

    #[must_use]
    pub fn plan(&self, request: &PlanRequest<'_>) -> RoutingDecision {
        let capabilities = dedupe_preserving_order(request.requested_capabilities);

        let mut tool_plan: Vec<PlannedTool> = Vec::new();
        let mut rejected: Vec<RejectedTool> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut satisfied_by: HashMap<String, usize> = HashMap::new();

        for capability in &capabilities {
            if let Some(idx) = satisfied_by.get(capability.as_str()) {
                if !tool_plan[*idx].capabilities.contains(capability) {
                    tool_plan[*idx].capabilities.push(capability.clone());
                }
                continue;
            }

            let selection = self.select_for_capability(request, capability, &mut rejected, &mut warnings);
            if let Some((tool_id, cost, side_effects)) = selection {
                if let Some(existing_idx) = tool_plan.iter().position(|p| p.tool_id == tool_id) {
                    if !tool_plan[existing_idx].capabilities.contains(capability) {
                        tool_plan[existing_idx].capabilities.push(capability.clone());
                    }
                    satisfied_by.insert(capability.clone(), existing_idx);
                } else {
                    tool_plan.push(PlannedTool {
                        tool_id,
                        capabilities: vec![capability.clone()],
                        estimated_cost_usd: cost,
                        side_effects,
                    });
                    satisfied_by.insert(capability.clone(), tool_plan.len() - 1);
                }
            }
        }

        let total_cost_usd: f64 = tool_plan.iter().map(|p| p.estimated_cost_usd).sum();
        let mut ok = true;
        let mut min_feasible_budget_usd = None;
        if let Some(budget) = request.budget_usd {
            if total_cost_usd > budget {
                ok = false;
                warnings.push(format!(
                    "Total cost {total_cost_usd} exceeds budget {budget}"
                ));
                min_feasible_budget_usd = Some(total_cost_usd);
            }
        }

        RoutingDecision {
            ok,
            tool_plan,
            rejected,
            warnings,
            totals: Totals {
                total_cost_usd,
                min_feasible_budget_usd,
            },
        }
    }

    fn select_for_capability(
        &self,
        request: &PlanRequest<'_>,
        capability: &str,
        rejected: &mut Vec<RejectedTool>,
        warnings: &mut Vec<String>,
    ) -> Option<(String, f64, Vec<String>)> {
        let candidates = self
            .policies
            .capability_candidates
            .get(capability)
            .cloned()
            .unwrap_or_default();

        let mut ordered: Vec<&ToolRegistryEntry> = candidates
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect();
        ordered.sort_by_key(|entry| match entry.tier {
            Tier::Primary => 0,
            Tier::Secondary => 1,
        });

        for entry in &ordered {
            match self.gate(request, capability, entry) {
                Ok(cost) => {
                    return Some((entry.tool_id.clone(), cost, entry.side_effects.clone()));
                }
                Err(reason) => rejected.push(RejectedTool {
                    tool_id: entry.tool_id.clone(),
                    reason,
                }),
            }
        }

        if let Some(on_missing) = self.policies.on_missing_primary.get(capability) {
            if let OnMissingPrimary::ProposeSecondary { fallback_budget_usd } = *on_missing {
                if let Some(secondary) = ordered.iter().find(|e| e.tier == Tier::Secondary) {
                    warnings.push("proposing secondary with budget".to_string());
                    return Some((
                        secondary.tool_id.clone(),
                        fallback_budget_usd,
                        secondary.side_effects.clone(),
                    ));
                }
            }
        }

        None
    }

    /// Applies gates in order, returning the estimated cost on success or a
    /// rejection reason on the first failing gate.
    fn gate(
        &self,
        request: &PlanRequest<'_>,
        capability: &str,
        entry: &ToolRegistryEntry,
    ) -> Result<f64, String> {
        if let Some(allowlist) = self.policies.agent_allowlists.get(request.agent_id) {
            if !allowlist.contains(&entry.tool_id) {
                return Err("not in agent allowlist".to_string());
            }
        }

        if entry.requires_api_key {
            let var = entry.api_key_env_name();
            if !request.env.contains_key(&var) {
                return Err(format!("missing API key ({var})"));
            }
        }

        if entry.tier == Tier::Secondary && !request.secondary_consent {
            let authorized_without_consent = matches!(
                self.policies.on_missing_primary.get(capability),
                Some(OnMissingPrimary::ProposeSecondary { .. })
            );
            if !authorized_without_consent {
                return Err("secondary requires consent".to_string());
            }
        }

        let budget = self
            .policies
            .per_tool_budget_usd
            .get(&entry.tool_id)
            .copied()
            .or_else(|| self.policies.tier_default_budget_usd.get(entry.tier.as_key()).copied())
            .or(request.budget_usd);
        if let Some(budget) = budget {
            if entry.cost_per_call_usd > budget {
                return Err("exceeds per-tool budget".to_string());
            }
        }

        Ok(entry.cost_per_call_usd)
    }
}

fn dedupe_preserving_order(items: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        if seen.insert(item.clone()) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> HashMap<String, ToolRegistryEntry> {
        let mut m = HashMap::new();
        m.insert(
            "lighthouse".to_string(),
            ToolRegistryEntry {
                tool_id: "lighthouse".into(),
                tier: Tier::Primary,
                capabilities: vec!["perf.web".into()],
                cost_per_call_usd: 0.0,
                requires_api_key: false,
                api_key_env: None,
                side_effects: vec!["exec".into()],
            },
        );
        m.insert(
            "sbom".to_string(),
            ToolRegistryEntry {
                tool_id: "sbom".into(),
                tier: Tier::Primary,
                capabilities: vec!["packaging.sbom".into()],
                cost_per_call_usd: 0.02,
                requires_api_key: false,
                api_key_env: None,
                side_effects: vec![],
            },
        );
        m.insert(
            "playwright".to_string(),
            ToolRegistryEntry {
                tool_id: "playwright".into(),
                tier: Tier::Primary,
                capabilities: vec!["browser.automation".into(), "screenshot".into()],
                cost_per_call_usd: 0.0,
                requires_api_key: false,
                api_key_env: None,
                side_effects: vec!["exec".into()],
            },
        );
        m.insert(
            "vercel".to_string(),
            ToolRegistryEntry {
                tool_id: "vercel".into(),
                tier: Tier::Secondary,
                capabilities: vec!["deploy.preview".into()],
                cost_per_call_usd: 0.05,
                requires_api_key: true,
                api_key_env: None,
                side_effects: vec!["network".into()],
            },
        );
        m
    }

    fn policies() -> PolicyDocument {
        let mut p = PolicyDocument::default();
        p.capability_candidates
            .insert("perf.web".into(), vec!["lighthouse".into()]);
        p.capability_candidates
            .insert("packaging.sbom".into(), vec!["sbom".into()]);
        p.capability_candidates
            .insert("browser.automation".into(), vec!["playwright".into()]);
        p.capability_candidates
            .insert("screenshot".into(), vec!["playwright".into()]);
        p.capability_candidates
            .insert("deploy.preview".into(), vec!["vercel".into()]);
        p
    }

    #[test]
    fn empty_capability_set() {
        let registry = registry();
        let policies = policies();
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &[],
            budget_usd: Some(0.25),
            secondary_consent: false,
            env: &HashMap::new(),
        });
        assert!(decision.ok);
        assert!(decision.tool_plan.is_empty());
    }

    #[test]
    fn primary_only_selection() {
        let registry = registry();
        let policies = policies();
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &["perf.web".to_string()],
            budget_usd: None,
            secondary_consent: false,
            env: &HashMap::new(),
        });
        assert!(decision.ok);
        assert_eq!(decision.tool_plan.len(), 1);
        assert_eq!(decision.tool_plan[0].tool_id, "lighthouse");
        assert_eq!(decision.tool_plan[0].estimated_cost_usd, 0.0);
    }

    #[test]
    fn budget_overrun() {
        let registry = registry();
        let policies = policies();
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &["packaging.sbom".to_string()],
            budget_usd: Some(0.01),
            secondary_consent: false,
            env: &HashMap::new(),
        });
        assert!(!decision.ok);
        assert!(decision.warnings.iter().any(|w| w.contains("exceeds budget")));
        assert_eq!(decision.totals.min_feasible_budget_usd, Some(0.02));
    }

    #[test]
    fn allowlist_filter() {
        let registry = registry();
        let mut policies = policies();
        policies
            .agent_allowlists
            .insert("A4.user_robot".into(), vec!["playwright".into(), "http".into()]);
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "A4.user_robot",
            requested_capabilities: &["browser.automation".to_string(), "deploy.preview".to_string()],
            budget_usd: None,
            secondary_consent: true,
            env: &HashMap::from([("VERCEL_API_KEY".to_string(), "x".to_string())]),
        });
        assert!(decision.tool_plan.iter().any(|p| p.tool_id == "playwright"));
        assert!(decision
            .rejected
            .iter()
            .any(|r| r.tool_id == "vercel" && r.reason == "not in agent allowlist"));
    }

    #[test]
    fn dedup_merges_into_one_entry() {
        let registry = registry();
        let policies = policies();
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &[
                "browser.automation".to_string(),
                "browser.automation".to_string(),
                "screenshot".to_string(),
                "screenshot".to_string(),
            ],
            budget_usd: None,
            secondary_consent: false,
            env: &HashMap::new(),
        });
        assert_eq!(decision.tool_plan.len(), 1);
        assert!(decision.tool_plan[0].capabilities.contains(&"browser.automation".to_string()));
        assert!(decision.tool_plan[0].capabilities.contains(&"screenshot".to_string()));
    }

    #[test]
    fn missing_api_key_rejects_secondary() {
        let registry = registry();
        let policies = policies();
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &["deploy.preview".to_string()],
            budget_usd: None,
            secondary_consent: true,
            env: &HashMap::new(),
        });
        assert!(decision.tool_plan.is_empty());
        assert!(decision
            .rejected
            .iter()
            .any(|r| r.reason.starts_with("missing API key")));
    }

    #[test]
    fn secondary_requires_consent_without_fallback_policy() {
        let registry = registry();
        let policies = policies();
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &["deploy.preview".to_string()],
            budget_usd: None,
            secondary_consent: false,
            env: &HashMap::from([("VERCEL_API_KEY".to_string(), "x".to_string())]),
        });
        assert!(decision
            .rejected
            .iter()
            .any(|r| r.reason == "secondary requires consent"));
    }

    #[test]
    fn on_missing_primary_authorizes_consent_bypass_in_gate() {
        let registry = registry();
        let mut policies = policies();
        policies.on_missing_primary.insert(
            "deploy.preview".into(),
            OnMissingPrimary::propose_secondary(0.05),
        );
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &["deploy.preview".to_string()],
            budget_usd: None,
            secondary_consent: false,
            env: &HashMap::from([("VERCEL_API_KEY".to_string(), "x".to_string())]),
        });
        assert_eq!(decision.tool_plan.len(), 1);
        assert_eq!(decision.tool_plan[0].tool_id, "vercel");
    }

    #[test]
    fn fallback_proposes_secondary_when_every_gate_candidate_rejected() {
        let registry = registry();
        let mut policies = policies();
        // `vercel` requires an API key that isn't present in env, so the
        // normal gate loop rejects it; on_missing_primary still offers a
        // fallback tool via the step-4 rescue path, independent of why the
        // candidate failed its gates.
        policies
            .on_missing_primary
            .insert("deploy.preview".into(), OnMissingPrimary::propose_secondary(0.05));
        let router = CapabilityRouter::new(&registry, &policies);
        let decision = router.plan(&PlanRequest {
            agent_id: "x",
            requested_capabilities: &["deploy.preview".to_string()],
            budget_usd: None,
            secondary_consent: false,
            env: &HashMap::new(),
        });
        assert_eq!(decision.tool_plan.len(), 1);
        assert_eq!(decision.tool_plan[0].tool_id, "vercel");
        assert!(decision.warnings.contains(&"proposing secondary with budget".to_string()));
        assert!(decision
            .rejected
            .iter()
            .any(|r| r.tool_id == "vercel" && r.reason.starts_with("missing API key")));
    }

    #[test]
    fn router_determinism() {
        let registry = registry();
        let policies = policies();
        let router = CapabilityRouter::new(&registry, &policies);
        let req = PlanRequest {
            agent_id: "x",
            requested_capabilities: &["perf.web".to_string()],
            budget_usd: Some(1.0),
            secondary_consent: false,
            env: &HashMap::new(),
        };
        let d1 = router.plan(&req);
        let d2 = router.plan(&req);
        assert_eq!(d1.totals.total_cost_usd, d2.totals.total_cost_usd);
        assert_eq!(d1.tool_plan.len(), d2.tool_plan.len());
    }
}
