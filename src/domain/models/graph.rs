//! Graph specification types: the immutable, load-time representation of a
//! run's nodes and edges.
//!
//! A typed, params-per-kind node model rather than a flat task list.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::domain::error::{EngineError, SchemaViolation};

/// Default values applied to every node unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub retries: RetryDefaults,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            retries: RetryDefaults::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

const fn default_timeout_ms() -> u64 {
    15_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryDefaults {
    #[serde(default = "default_retries_max")]
    pub max: u32,
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for RetryDefaults {
    fn default() -> Self {
        Self {
            max: default_retries_max(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

const fn default_retries_max() -> u32 {
    1
}

const fn default_backoff_ms() -> u64 {
    1_000
}

/// The seven supported node kinds. `params` is validated at load time,
/// not at dispatch, so a malformed node never starts executing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Server,
    Playwright,
    Lighthouse,
    Cvf,
    AgentTask,
    Package,
    Report,
}

impl NodeType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "server",
            Self::Playwright => "playwright",
            Self::Lighthouse => "lighthouse",
            Self::Cvf => "cvf",
            Self::AgentTask => "agent_task",
            Self::Package => "package",
            Self::Report => "report",
        }
    }
}

/// Type-specific node parameters. Untagged so the graph YAML can write
/// plain keys (`specs`, `url`, `out`, `auv`) without a wrapper tag; the
/// loader picks the right variant based on the node's declared `type`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeParams {
    #[serde(default)]
    pub specs: Vec<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub out: Option<String>,
    #[serde(default)]
    pub auv: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single node as declared in the graph file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub params: NodeParams,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub retries: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl NodeSpec {
    #[must_use]
    pub fn effective_timeout_ms(&self, defaults: &Defaults) -> u64 {
        self.timeout_ms.unwrap_or_else(|| match self.node_type {
            NodeType::Playwright => 180_000,
            NodeType::Lighthouse => 90_000,
            NodeType::Cvf => 60_000,
            _ => defaults.timeout_ms,
        })
    }

    #[must_use]
    pub fn effective_retries_max(&self, defaults: &Defaults) -> u32 {
        self.retries.unwrap_or(defaults.retries.max)
    }

    /// The AUV id this node belongs to: `params.auv` if set, else a
    /// prefix match of the node id against `^AUV-\d{4}`.
    #[must_use]
    pub fn auv_id(&self) -> Option<String> {
        if let Some(auv) = &self.params.auv {
            return Some(auv.clone());
        }
        let id = &self.id;
        if id.len() >= 9 && id.starts_with("AUV-") && id[4..8].bytes().all(|b| b.is_ascii_digit())
        {
            Some(id[0..8].to_string())
        } else {
            None
        }
    }
}

/// A top-level graph specification, as parsed from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSpec {
    pub version: String,
    pub project_id: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
}

const fn default_concurrency() -> u32 {
    3
}

/// The validated, load-time-frozen form of a graph: nodes by id plus
/// adjacency/indegree derived from `requires` (reversed) union `edges`.
#[derive(Debug, Clone)]
pub struct LoadedGraph {
    pub spec: GraphSpec,
    pub nodes_by_id: HashMap<String, NodeSpec>,
    /// successor ids, i.e. nodes that depend on the keyed node
    pub adjacency: HashMap<String, HashSet<String>>,
    pub indegree: HashMap<String, u32>,
}

impl LoadedGraph {
    /// Validates schema constraints and graph structure, returning every
    /// violation found rather than the first.
    pub fn build(spec: GraphSpec) -> Result<Self, EngineError> {
        let mut violations = Vec::new();

        if spec.version != "1.0" {
            violations.push(SchemaViolation::new(
                "/version",
                format!("expected \"1.0\", got {:?}", spec.version),
            ));
        }
        if spec.project_id.trim().is_empty() {
            violations.push(SchemaViolation::new("/project_id", "must not be empty"));
        }
        if !(1..=10).contains(&spec.concurrency) {
            violations.push(SchemaViolation::new(
                "/concurrency",
                format!("must be between 1 and 10, got {}", spec.concurrency),
            ));
        }

        let mut nodes_by_id = HashMap::new();
        for (i, node) in spec.nodes.iter().enumerate() {
            if node.id.trim().is_empty() {
                violations.push(SchemaViolation::new(
                    format!("/nodes/{i}/id"),
                    "must not be empty",
                ));
                continue;
            }
            if nodes_by_id.contains_key(&node.id) {
                violations.push(SchemaViolation::new(
                    format!("/nodes/{i}/id"),
                    format!("duplicate node id: {}", node.id),
                ));
                continue;
            }
            nodes_by_id.insert(node.id.clone(), node.clone());
        }

        for (i, node) in spec.nodes.iter().enumerate() {
            for req in &node.requires {
                if !nodes_by_id.contains_key(req) {
                    violations.push(SchemaViolation::new(
                        format!("/nodes/{i}/requires"),
                        format!("unknown node id: {req}"),
                    ));
                }
            }
        }
        for (i, (from, to)) in spec.edges.iter().enumerate() {
            if !nodes_by_id.contains_key(from) {
                violations.push(SchemaViolation::new(
                    format!("/edges/{i}/0"),
                    format!("unknown node id: {from}"),
                ));
            }
            if !nodes_by_id.contains_key(to) {
                violations.push(SchemaViolation::new(
                    format!("/edges/{i}/1"),
                    format!("unknown node id: {to}"),
                ));
            }
        }

        if !violations.is_empty() {
            return Err(EngineError::InvalidSchema(violations));
        }

        // Unknown ids already validated above; a second pass here would be
        // redundant, but edges are checked again defensively because they
        // are the one place referential integrity and cycle detection
        // interact (spec distinguishes INVALID_EDGE from INVALID_SCHEMA).
        for (from, to) in &spec.edges {
            if !nodes_by_id.contains_key(from) || !nodes_by_id.contains_key(to) {
                return Err(EngineError::InvalidEdge(format!("{from}->{to}")));
            }
        }

        let mut adjacency: HashMap<String, HashSet<String>> =
            nodes_by_id.keys().map(|id| (id.clone(), HashSet::new())).collect();
        let mut indegree: HashMap<String, u32> =
            nodes_by_id.keys().map(|id| (id.clone(), 0)).collect();

        for node in nodes_by_id.values() {
            for req in &node.requires {
                adjacency.get_mut(req).unwrap().insert(node.id.clone());
                *indegree.get_mut(&node.id).unwrap() += 1;
            }
        }
        for (from, to) in &spec.edges {
            if adjacency.get_mut(from).unwrap().insert(to.clone()) {
                *indegree.get_mut(to).unwrap() += 1;
            }
        }

        let graph = Self {
            spec,
            nodes_by_id,
            adjacency,
            indegree,
        };
        graph.detect_cycle()?;
        Ok(graph)
    }

    /// Three-color DFS cycle detection over `adjacency` (successor edges).
    fn detect_cycle(&self) -> Result<(), EngineError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let mut color: HashMap<&str, Color> =
            self.nodes_by_id.keys().map(|id| (id.as_str(), Color::White)).collect();
        let mut path: Vec<String> = Vec::new();

        fn visit<'a>(
            id: &'a str,
            adjacency: &'a HashMap<String, HashSet<String>>,
            color: &mut HashMap<&'a str, Color>,
            path: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            color.insert(id, Color::Gray);
            path.push(id.to_string());
            if let Some(succs) = adjacency.get(id) {
                let mut sorted: Vec<&String> = succs.iter().collect();
                sorted.sort();
                for succ in sorted {
                    match color.get(succ.as_str()) {
                        Some(Color::Gray) => {
                            let mut cycle = path.clone();
                            cycle.push(succ.clone());
                            return Some(cycle);
                        }
                        Some(Color::White) | None => {
                            if let Some(cycle) = visit(succ, adjacency, color, path) {
                                return Some(cycle);
                            }
                        }
                        Some(Color::Black) => {}
                    }
                }
            }
            path.pop();
            color.insert(id, Color::Black);
            None
        }

        let mut ids: Vec<&String> = self.nodes_by_id.keys().collect();
        ids.sort();
        for id in ids {
            if color[id.as_str()] == Color::White {
                if let Some(cycle) = visit(id, &self.adjacency, &mut color, &mut path) {
                    return Err(EngineError::CycleDetected(cycle));
                }
            }
        }
        Ok(())
    }
}
