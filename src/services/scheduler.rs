//! The scheduler core: demand-driven dispatch over a loaded graph.
//!
//! `Arc::new(Semaphore::new(concurrency))` gates dispatch, each node runs
//! in its own `tokio::spawn`, and completion reaping uses an `mpsc`
//! channel each task posts its id to on finish — a `Promise.race`
//! emulation. The ready set is recomputed after every single completion
//! rather than waiting on a strict wave barrier, so a fast node can start
//! the instant its last dependency succeeds.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};

use crate::domain::error::EngineError;
use crate::domain::models::{Event, LoadedGraph, NodeStatus, RunState};
use crate::domain::ports::ExecutionContext;
use crate::services::executors::ExecutorRegistry;
use crate::services::lock_manager::LockManager;
use crate::services::observability::Observability;
use crate::services::retry_policy::{self, RetryDecision};
use crate::services::state_store::StateStore;

const NOTHING_DISPATCHABLE_POLL: Duration = Duration::from_millis(100);

pub struct SchedulerConfig {
    pub run_id: String,
    pub artifact_root: std::path::PathBuf,
    pub base_env: HashMap<String, String>,
}

/// Drives `graph` to completion (or resumes an in-flight `state`),
/// returning the final success flag and list of failed node ids.
pub async fn run(
    graph: &LoadedGraph,
    mut state: RunState,
    config: SchedulerConfig,
    executors: Arc<ExecutorRegistry>,
    locks: LockManager,
    state_store: &StateStore,
    observability: &Observability,
) -> Result<(bool, Vec<String>), EngineError> {
    let total = graph.nodes_by_id.len();
    let mut running: HashSet<String> = HashSet::new();
    let mut backoff_until: HashMap<String, tokio::time::Instant> = HashMap::new();

    let mut completed: HashSet<String> = state.completed().into_iter().collect();
    let mut failed: HashSet<String> = state.failed().into_iter().collect();

    let semaphore = Arc::new(Semaphore::new(graph.spec.concurrency as usize));
    let (tx, mut rx) = mpsc::channel::<NodeOutcome>(total.max(1));

    loop {
        if completed.len() + failed.len() == total {
            break;
        }

        let now = tokio::time::Instant::now();
        let ready: Vec<String> = graph
            .nodes_by_id
            .values()
            .filter(|node| {
                !running.contains(&node.id)
                    && !completed.contains(&node.id)
                    && !failed.contains(&node.id)
                    && node.requires.iter().all(|r| completed.contains(r))
                    && backoff_until.get(&node.id).is_none_or(|until| now >= *until)
            })
            .map(|node| node.id.clone())
            .collect();

        let free_slots = (graph.spec.concurrency as usize).saturating_sub(running.len());
        let dispatchable: Vec<String> = ready.into_iter().take(free_slots).collect();

        if dispatchable.is_empty() && running.is_empty() {
            if let Some(earliest) = backoff_until.values().min().copied() {
                // Nothing in flight and nothing dispatchable yet, but a node
                // is waiting out its backoff — sleep only that long, rather
                // than declaring the graph stuck.
                tokio::time::sleep_until(earliest).await;
                continue;
            }
            if !failed.is_empty() {
                break;
            }
            return Err(EngineError::Deadlock);
        }

        for node_id in dispatchable {
            running.insert(node_id.clone());
            backoff_until.remove(&node_id);
            let node = graph.nodes_by_id[&node_id].clone();
            let defaults = graph.spec.defaults.clone();
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
            let tx = tx.clone();
            let executors = executors.clone();
            let locks = locks.clone();
            let observability = observability.clone();
            let mut merged_env = config.base_env.clone();
            merged_env.extend(node.env.clone());
            if let Some(auv) = node.auv_id() {
                merged_env.insert("AUV_ID".to_string(), auv);
            }

            state.nodes.get_mut(&node_id).unwrap().start(chrono::Utc::now());
            state_store.save(&state).await?;
            let attempts = state.nodes[&node_id].attempts;
            let run_id = config.run_id.clone();

            observability
                .emit(Event::NodeStarted {
                    run_id: run_id.clone(),
                    node_id: node_id.clone(),
                })
                .await;

            tokio::spawn(async move {
                let _permit = permit;
                let guard = locks.acquire(&node_id, &node.resources).await;
                let timeout = Duration::from_millis(node.effective_timeout_ms(&defaults));
                let ctx = ExecutionContext {
                    node: &node,
                    merged_env: &merged_env,
                    run_id: &run_id,
                };
                let result = tokio::time::timeout(timeout, executors.dispatch(&node.node_type, ctx)).await;
                guard.release().await;

                let outcome = match result {
                    Ok(Ok(())) => NodeOutcome::Succeeded { node_id: node_id.clone() },
                    Ok(Err(err)) => NodeOutcome::Failed {
                        node_id: node_id.clone(),
                        attempts,
                        message: err.to_string(),
                    },
                    Err(_) => NodeOutcome::Failed {
                        node_id: node_id.clone(),
                        attempts,
                        message: "timeout".to_string(),
                    },
                };
                let _ = tx.send(outcome).await;
            });
        }

        // `running` is guaranteed non-empty here: either this iteration just
        // dispatched new nodes into it, or the earlier empty-dispatchable
        // check already returned/broke when it was also empty.
        let outcome = match tokio::time::timeout(NOTHING_DISPATCHABLE_POLL, rx.recv()).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => break,
            Err(_) => continue,
        };

        match outcome {
            NodeOutcome::Succeeded { node_id } => {
                running.remove(&node_id);
                completed.insert(node_id.clone());
                state.nodes.get_mut(&node_id).unwrap().succeed(chrono::Utc::now());
                state_store.save(&state).await?;
                observability
                    .emit(Event::NodeSucceeded {
                        run_id: config.run_id.clone(),
                        node_id,
                    })
                    .await;
            }
            NodeOutcome::Failed {
                node_id,
                attempts,
                message,
            } => {
                running.remove(&node_id);
                let node = &graph.nodes_by_id[&node_id];
                let decision = retry_policy::decide(node, &graph.spec.defaults, attempts, &message);
                match decision {
                    RetryDecision::Retry { delay } => {
                        state.nodes.get_mut(&node_id).unwrap().requeue(message.clone());
                        state_store.save(&state).await?;
                        observability
                            .emit(Event::NodeRetry {
                                run_id: config.run_id.clone(),
                                node_id: node_id.clone(),
                                attempt: attempts,
                                error: message,
                            })
                            .await;
                        // Don't block the reaping loop for the backoff
                        // duration — record the deadline and let sibling
                        // completions keep draining in the meantime.
                        backoff_until.insert(node_id, tokio::time::Instant::now() + delay);
                    }
                    RetryDecision::GiveUp => {
                        failed.insert(node_id.clone());
                        state.nodes.get_mut(&node_id).unwrap().fail(chrono::Utc::now(), message.clone());
                        state_store.save(&state).await?;
                        observability
                            .emit(Event::NodeFailed {
                                run_id: config.run_id.clone(),
                                node_id,
                                error: message,
                            })
                            .await;
                    }
                }
            }
        }
    }

    state.finished_at = Some(chrono::Utc::now());
    state_store.save(&state).await?;

    let failed_nodes: Vec<String> = failed.into_iter().collect();
    let success = failed_nodes.is_empty();
    if success {
        observability
            .emit(Event::GraphSucceeded {
                run_id: config.run_id.clone(),
            })
            .await;
    } else {
        observability
            .emit(Event::GraphFailed {
                run_id: config.run_id.clone(),
                failed_nodes: failed_nodes.clone(),
            })
            .await;
    }

    Ok((success, failed_nodes))
}

/// Runs the server executor's teardown after the graph reaches a terminal
/// state, regardless of outcome, per spec §4.3/§5.
pub async fn teardown_server(executors: &ExecutorRegistry) {
    executors.server.teardown().await;
}

enum NodeOutcome {
    Succeeded { node_id: String },
    Failed {
        node_id: String,
        attempts: u32,
        message: String,
    },
}
