//! Append-only event log and spend ledger.
//!
//! A single file guarded by a mutex, JSON-per-line writes, best-effort
//! (log and continue on I/O error rather than propagate).

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::models::{Event, EventRecord, SpendEntry};

/// Writes `Event`s to `runs/observability/hooks.jsonl` and spend entries to
/// `runs/observability/ledgers/<session>.jsonl`. Cheaply cloneable; shares
/// one open file handle per instance behind a mutex.
#[derive(Clone)]
pub struct Observability {
    root: PathBuf,
    hooks_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl Observability {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            hooks_path: root.join("observability").join("hooks.jsonl"),
            root,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Best-effort append; logs and swallows I/O errors so observability
    /// never takes down a run.
    pub async fn emit(&self, event: Event) {
        let record = EventRecord::new(event);
        let line = match serde_json::to_string(&record) {
            Ok(l) => l,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize event");
                return;
            }
        };
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.hooks_path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %err, "failed to create observability dir");
                return;
            }
        }
        if let Err(err) = append_line(&self.hooks_path, &line).await {
            tracing::warn!(error = %err, "failed to append event to hooks log");
        }
    }

    fn ledger_path(&self, session_id: &str) -> PathBuf {
        self.root.join("observability").join("ledgers").join(format!("{session_id}.jsonl"))
    }

    pub async fn record_spend(&self, entry: &SpendEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(l) => l,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize spend entry");
                return;
            }
        };
        let path = self.ledger_path(&entry.session_id);
        let _guard = self.write_lock.lock().await;
        if let Some(parent) = path.parent() {
            if let Err(err) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(error = %err, "failed to create ledger dir");
                return;
            }
        }
        if let Err(err) = append_line(&path, &line).await {
            tracing::warn!(error = %err, "failed to append spend entry");
        }
    }

    /// Scans every ledger file under `observability/ledgers/` and sums
    /// `estimated_cost_usd` by `tool_id`.
    pub async fn aggregate_spend(&self) -> std::io::Result<std::collections::HashMap<String, f64>> {
        let dir = self.root.join("observability").join("ledgers");
        let mut totals = std::collections::HashMap::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(totals),
            Err(err) => return Err(err),
        };
        while let Some(entry) = entries.next_entry().await? {
            let contents = tokio::fs::read_to_string(entry.path()).await?;
            for line in contents.lines() {
                if let Ok(spend) = serde_json::from_str::<SpendEntry>(line) {
                    *totals.entry(spend.tool_id).or_insert(0.0) += spend.estimated_cost_usd;
                }
            }
        }
        Ok(totals)
    }

    /// Writes the aggregated ledger to `reports/observability/spend.json`.
    pub async fn write_spend_report(
        &self,
        report_root: &std::path::Path,
    ) -> std::io::Result<()> {
        let totals = self.aggregate_spend().await?;
        let dir = report_root.join("observability");
        tokio::fs::create_dir_all(&dir).await?;
        let json = serde_json::to_string_pretty(&totals).unwrap_or_else(|_| "{}".to_string());
        tokio::fs::write(dir.join("spend.json"), json).await
    }
}

async fn append_line(path: &std::path::Path, line: &str) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}
