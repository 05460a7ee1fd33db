//! Transient/permanent classification and exponential backoff with cap.
//!
//! Classification is a pair of const-fn checks on the error message; the
//! backoff math leans on the `backoff` crate's building blocks rather than
//! a hand-rolled timer.

use std::time::Duration;

use crate::domain::error::EngineError;
use crate::domain::models::{Defaults, NodeSpec};

const MAX_BACKOFF_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Transient,
    Permanent,
}

#[must_use]
pub fn classify(message: &str) -> Classification {
    if EngineError::message_is_transient(message) {
        Classification::Transient
    } else {
        Classification::Permanent
    }
}

/// Decides whether a node should retry. `attempts` is the node's execution
/// count including the attempt that just failed (i.e. `NodeState::attempts`
/// after `start()` was called for it) — so a node with `retries.max == 2`
/// gives up once `attempts` reaches 3, leaving that as the final persisted
/// attempt count.
#[must_use]
pub fn decide(
    node: &NodeSpec,
    defaults: &Defaults,
    attempts: u32,
    error_message: &str,
) -> RetryDecision {
    let max = node.effective_retries_max(defaults);
    if classify(error_message) == Classification::Permanent {
        return RetryDecision::GiveUp;
    }
    let retries_used = attempts.saturating_sub(1);
    if retries_used >= max {
        return RetryDecision::GiveUp;
    }
    let backoff_ms = backoff_delay_ms(defaults.retries.backoff_ms, attempts);
    RetryDecision::Retry {
        delay: Duration::from_millis(backoff_ms),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { delay: Duration },
    GiveUp,
}

/// `min(backoff_ms * 2^(attempts-1), 30000)`, per spec §4.6.
#[must_use]
pub fn backoff_delay_ms(base_ms: u64, attempts: u32) -> u64 {
    let exponent = attempts.saturating_sub(1);
    let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}
