use std::path::Path;

use crate::services::observability::Observability;

/// Prints aggregated per-tool spend totals, optionally filtered to a single
/// session's ledger.
pub async fn handle(session: Option<String>, artifact_root: &Path) -> i32 {
    let observability = Observability::new(artifact_root);
    let totals = if let Some(session_id) = session {
        match load_session_totals(artifact_root, &session_id).await {
            Ok(t) => t,
            Err(err) => {
                eprintln!("error: {err}");
                return 202;
            }
        }
    } else {
        match observability.aggregate_spend().await {
            Ok(t) => t,
            Err(err) => {
                eprintln!("error: {err}");
                return 202;
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&totals).unwrap_or_default());
    0
}

async fn load_session_totals(
    artifact_root: &Path,
    session_id: &str,
) -> std::io::Result<std::collections::HashMap<String, f64>> {
    let path = artifact_root
        .join("observability")
        .join("ledgers")
        .join(format!("{session_id}.jsonl"));
    let mut totals = std::collections::HashMap::new();
    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(totals),
        Err(err) => return Err(err),
    };
    for line in contents.lines() {
        if let Ok(entry) = serde_json::from_str::<crate::domain::models::SpendEntry>(line) {
            *totals.entry(entry.tool_id).or_insert(0.0) += entry.estimated_cost_usd;
        }
    }
    Ok(totals)
}
