pub mod event;
pub mod graph;
pub mod node_state;
pub mod router;
pub mod run_state;

pub use event::{Event, EventRecord};
pub use graph::{Defaults, GraphSpec, LoadedGraph, NodeParams, NodeSpec, NodeType, RetryDefaults};
pub use node_state::{NodeState, NodeStatus};
pub use router::{
    OnMissingPrimary, PlannedTool, PolicyDocument, RejectedTool, RoutingDecision, SpendEntry,
    Tier, ToolRegistryEntry, Totals,
};
pub use run_state::{new_run_id, RunState};
