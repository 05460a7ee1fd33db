//! Error taxonomy for the engine, router, and auth gate.
//!
//! Each subsystem gets its own enum rather than one mega-error so that the
//! CLI can map errors to exit codes (spec §6) without downcasting.

use std::path::PathBuf;

use thiserror::Error;

/// A single schema validation failure: a JSON-pointer-ish path plus a
/// human-readable message. The loader accumulates every violation it finds
/// rather than stopping at the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by graph loading, scheduling, and node execution.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("invalid schema: {0:?}")]
    InvalidSchema(Vec<SchemaViolation>),

    #[error("edge references unknown node id: {0}")]
    InvalidEdge(String),

    #[error("dependency cycle detected: {0:?}")]
    CycleDetected(Vec<String>),

    #[error("unknown node type: {0}")]
    UnknownType(String),

    #[error("invalid params for node {node_id}: {message}")]
    InvalidParams { node_id: String, message: String },

    #[error("node {node_id} timed out after {timeout_ms}ms")]
    Timeout { node_id: String, timeout_ms: u64 },

    #[error("command failed for node {node_id} (exit {exit_code:?}): {stderr}")]
    CommandFailed {
        node_id: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("command error for node {node_id}: {message}")]
    CommandError { node_id: String, message: String },

    #[error("deadlock: no node is running or dispatchable but work remains")]
    Deadlock,

    #[error("package build failed: {0}")]
    PackageFailed(String),

    #[error("report build failed: {0}")]
    ReportFailed(String),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation timed out: {0}")]
    Elapsed(#[from] tokio::time::error::Elapsed),
}

impl EngineError {
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Classifies a rendered error message per the transient/permanent
    /// regex set: timeouts, connection resets/refusals, 5xx, and browser
    /// crash signatures retry; everything else is permanent.
    #[must_use]
    pub fn message_is_transient(message: &str) -> bool {
        let lower = message.to_ascii_lowercase();
        lower.contains("timeout")
            || lower.contains("etimedout")
            || lower.contains("econnrefused")
            || lower.contains("econnreset")
            || lower.contains("browser") && lower.contains("crash")
            || lower.contains("target closed")
            || has_5xx_status(&lower)
    }

    /// Exit code contribution for this error, independent of overall graph
    /// status (package/report failures short-circuit with their own code).
    #[must_use]
    pub const fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CycleDetected(_) => Some(203),
            Self::PackageFailed(_) => Some(401),
            Self::ReportFailed(_) => Some(402),
            _ => None,
        }
    }
}

fn has_5xx_status(lower: &str) -> bool {
    // Looks for a bare "5xx" token, e.g. "http 503" or "status: 500".
    let bytes = lower.as_bytes();
    bytes
        .windows(3)
        .any(|w| w[0] == b'5' && w[1].is_ascii_digit() && w[2].is_ascii_digit())
}

/// Errors raised by the capability router.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("unknown capability: {0}")]
    UnknownCapability(String),

    #[error("policy document error: {0}")]
    InvalidPolicy(String),
}

/// Errors raised by the auth/RBAC gate.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    Expired,

    #[error("insufficient permission: {0} requires {1}")]
    InsufficientPermission(String, String),

    #[error("tenant mismatch: token tenant {token_tenant} does not authorize {requested}")]
    TenantMismatch {
        token_tenant: String,
        requested: String,
    },

    #[error("jwks fetch failed: {0}")]
    JwksFetch(String),
}

impl AuthError {
    /// 405 for missing/invalid token, 403 for permission/tenant failures.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InsufficientPermission(..) | Self::TenantMismatch { .. } => 403,
            _ => 405,
        }
    }
}
