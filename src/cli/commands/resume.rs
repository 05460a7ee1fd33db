use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::domain::models::Event;
use crate::infrastructure::config::Config;
use crate::services::executors::package::NoopPackageBuilder;
use crate::services::executors::report::NoopReportBuilder;
use crate::services::executors::ExecutorRegistry;
use crate::services::lock_manager::LockManager;
use crate::services::observability::Observability;
use crate::services::state_store::{self, StateStore};
use crate::services::{graph_loader, scheduler};

/// Reloads durable state for `run_id` (reclassifying any node left
/// `running` as crashed) and continues the run, per spec §4.5.
pub async fn handle(graph_path: &Path, run_id: &str, config: &Config, json: bool) -> i32 {
    let graph = match graph_loader::load(graph_path).await {
        Ok(g) => g,
        Err(err) => {
            let code = err.exit_code().unwrap_or(202);
            eprintln!("error: {err}");
            return code;
        }
    };

    let artifact_root = Path::new(&config.scheduler.artifact_root).to_path_buf();
    let state_store = StateStore::new(&artifact_root);
    let observability = Observability::new(&artifact_root);
    let locks = LockManager::new(Some(artifact_root.join("locks")));

    let state = match state_store::resume(&state_store, run_id).await {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: {err}");
            return err.exit_code().unwrap_or(202);
        }
    };

    let executors = Arc::new(ExecutorRegistry::new(
        artifact_root.clone(),
        Arc::new(NoopPackageBuilder),
        Arc::new(NoopReportBuilder),
    ));

    let result = scheduler::run(
        &graph,
        state,
        scheduler::SchedulerConfig {
            run_id: run_id.to_string(),
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
            if json {
                println!("{}", serde_json::json!({ "ok": true, "run_id": run_id }));
            }
            0
        }
        Ok((false, failed_nodes)) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "ok": false, "run_id": run_id, "failed_nodes": failed_nodes })
                );
            }
            204
        }
        Err(err) => {
            observability
                .emit(Event::GraphError {
                    run_id: run_id.to_string(),
                    message: err.to_string(),
                })
                .await;
            err.exit_code().unwrap_or(202)
        }
    }
}
