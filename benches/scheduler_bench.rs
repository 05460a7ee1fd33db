use std::collections::HashMap;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use swarm1::domain::models::{Defaults, GraphSpec, NodeParams, NodeSpec, NodeType, RunState};
use swarm1::services::executors::package::NoopPackageBuilder;
use swarm1::services::executors::report::NoopReportBuilder;
use swarm1::services::executors::ExecutorRegistry;
use swarm1::services::lock_manager::LockManager;
use swarm1::services::observability::Observability;
use swarm1::services::scheduler::{self, SchedulerConfig};
use swarm1::services::state_store::StateStore;

fn chain_graph(length: usize) -> GraphSpec {
    let mut nodes = Vec::with_capacity(length);
    for i in 0..length {
        nodes.push(NodeSpec {
            id: format!("n{i}"),
            node_type: NodeType::AgentTask,
            requires: if i == 0 { vec![] } else { vec![format!("n{}", i - 1)] },
            resources: vec![],
            params: NodeParams::default(),
            env: HashMap::new(),
            retries: None,
            timeout_ms: Some(5_000),
        });
    }
    GraphSpec {
        version: "1.0".to_string(),
        project_id: "bench".to_string(),
        concurrency: 4,
        defaults: Defaults::default(),
        nodes,
        edges: vec![],
    }
}

fn bench_scheduler(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let spec = chain_graph(30);
    let graph = swarm1::domain::models::LoadedGraph::build(spec).unwrap();

    c.bench_function("scheduler_run_30_node_chain", |b| {
        b.to_async(&rt).iter(|| async {
            let dir = tempfile::tempdir().unwrap();
            let run_id = swarm1::domain::models::new_run_id();
            let state = RunState::new(run_id.clone(), "bench".to_string(), graph.nodes_by_id.keys().cloned());
            let executors = Arc::new(ExecutorRegistry::new(
                dir.path().join("runs"),
                Arc::new(NoopPackageBuilder),
                Arc::new(NoopReportBuilder),
            ));
            let locks = LockManager::new(None);
            let store = StateStore::new(dir.path().join("runs"));
            let observability = Observability::new(dir.path().join("runs"));

            scheduler::run(
                &graph,
                state,
                SchedulerConfig {
                    run_id,
                    artifact_root: dir.path().join("runs"),
                    base_env: HashMap::new(),
                },
                executors,
                locks,
                &store,
                &observability,
            )
            .await
            .unwrap()
        });
    });
}

criterion_group!(benches, bench_scheduler);
criterion_main!(benches);
