use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::domain::models::{new_run_id, Event, RunState};
use crate::infrastructure::config::Config;
use crate::services::executors::package::NoopPackageBuilder;
use crate::services::executors::report::NoopReportBuilder;
use crate::services::executors::ExecutorRegistry;
use crate::services::lock_manager::LockManager;
use crate::services::observability::Observability;
use crate::services::state_store::StateStore;
use crate::services::{graph_loader, scheduler};

/// Loads, validates, and executes `graph_path` end to end, returning the
/// process exit code per spec §6.
pub async fn handle(
    graph_path: &Path,
    project_id: Option<String>,
    run_id: Option<String>,
    config: &Config,
    json: bool,
) -> i32 {
    let graph = match graph_loader::load(graph_path).await {
        Ok(g) => g,
        Err(err) => {
            let code = err.exit_code().unwrap_or(202);
            report_error(&err.to_string(), json);
            return code;
        }
    };

    let run_id = run_id.unwrap_or_else(new_run_id);
    let graph_id = project_id.unwrap_or_else(|| graph.spec.project_id.clone());
    let artifact_root = Path::new(&config.scheduler.artifact_root).to_path_buf();
    let state_store = StateStore::new(&artifact_root);
    let observability = Observability::new(&artifact_root);
    let locks = LockManager::new(Some(artifact_root.join("locks")));

    let state = RunState::new(run_id.clone(), graph_id, graph.nodes_by_id.keys().cloned());
    observability
        .emit(Event::GraphStart {
            run_id: run_id.clone(),
            graph_id: graph.spec.project_id.clone(),
        })
        .await;

    let executors = Arc::new(ExecutorRegistry::new(
        artifact_root.clone(),
        Arc::new(NoopPackageBuilder),
        Arc::new(NoopReportBuilder),
    ));

    let result = scheduler::run(
        &graph,
        state,
        scheduler::SchedulerConfig {
            run_id: run_id.clone(),
            artifact_root: artifact_root.clone(),
            base_env: std::env::vars().collect::<HashMap<_, _>>(),
        },
        executors.clone(),
        locks,
        &state_store,
        &observability,
    )
    .await;

    scheduler::teardown_server(&executors).await;

    match result {
        Ok((true, _)) => {
            report_success(&run_id, json);
            0
        }
        Ok((false, failed_nodes)) => {
            report_failure(&run_id, &failed_nodes, json);
            204
        }
        Err(err) => {
            observability
                .emit(Event::GraphError {
                    run_id: run_id.clone(),
                    message: err.to_string(),
                })
                .await;
            let code = err.exit_code().unwrap_or(202);
            report_error(&err.to_string(), json);
            code
        }
    }
}

fn report_success(run_id: &str, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "ok": true, "run_id": run_id }));
    } else {
        println!("run {run_id} succeeded");
    }
}

fn report_failure(run_id: &str, failed_nodes: &[String], json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({ "ok": false, "run_id": run_id, "failed_nodes": failed_nodes })
        );
    } else {
        eprintln!("run {run_id} failed: {}", failed_nodes.join(", "));
    }
}

fn report_error(message: &str, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "ok": false, "error": message }));
    } else {
        eprintln!("error: {message}");
    }
}
