//! Swarm1 — agent-orchestration engine.
//!
//! Two cores drive everything else in this crate:
//! - [`services::scheduler`]: a parallel DAG execution engine that schedules
//!   heterogeneous work nodes under concurrency limits, exclusive resource
//!   locks, retries with backoff, durable state, and mid-run resume.
//! - [`services::capability_router`]: a policy-driven planner that selects
//!   concrete tools for requested abstract capabilities under budget,
//!   allowlist, and consent constraints.

pub mod auth;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::error::{AuthError, EngineError, RouterError};
