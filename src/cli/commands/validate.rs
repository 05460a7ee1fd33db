use std::path::Path;

use crate::services::graph_loader;

/// Loads and validates `graph_path`, printing the result; returns the exit
/// code to use (0 success, 203 cycle, 202 other load error).
pub async fn handle(graph_path: &Path, json: bool) -> i32 {
    match graph_loader::load(graph_path).await {
        Ok(loaded) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "ok": true, "node_count": loaded.nodes_by_id.len() })
                );
            } else {
                println!("graph valid: {} nodes", loaded.nodes_by_id.len());
            }
            0
        }
        Err(err) => {
            let code = err.exit_code().unwrap_or(202);
            if json {
                println!("{}", serde_json::json!({ "ok": false, "error": err.to_string() }));
            } else {
                eprintln!("graph invalid: {err}");
            }
            code
        }
    }
}
