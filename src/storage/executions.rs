//! Execution history and the JSONL execution journal

use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use crate::types::ExecutionRecord;

/// Append-only. Records are never edited once written.
#[derive(Debug, Default)]
pub struct ExecutionLog {
    records: Vec<ExecutionRecord>,
}

impl ExecutionLog {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<ExecutionRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn successes(&self) -> usize {
        self.records.iter().filter(|r| r.is_success()).count()
    }
}

/// Appends `record` to `executions_<date>.jsonl` under `dir` on the blocking pool.
/// A failed write is only logged.
pub async fn journal_execution(dir: PathBuf, record: ExecutionRecord) {
    let opportunity_id = record.opportunity_id.clone();
    let written = tokio::task::spawn_blocking(move || write_journal(&dir, &record))
        .await
        .unwrap_or_else(|e| Err(anyhow::anyhow!("journal task ended abnormally: {e}")));
    if let Err(e) = written {
        warn!(opportunity_id = %opportunity_id, "⚠️ Failed to journal execution: {:#}", e);
    }
}

fn write_journal(dir: &Path, record: &ExecutionRecord) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let filename = dir.join(format!("executions_{}.jsonl", record.timestamp.format("%Y-%m-%d")));

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&filename)?;

    writeln!(file, "{}", serde_json::to_string(record)?)?;

    info!(
        opportunity_id = %record.opportunity_id,
        provider = %record.provider_id,
        outcome = ?record.outcome,
        actual_profit = %record.actual_profit,
        "Saved execution record"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_recent_is_newest_first() {
        let mut log = ExecutionLog::in_memory();
        let now = Utc::now();
        log.append(ExecutionRecord::success("a", "p", dec!(1), 1, None, now));
        log.append(ExecutionRecord::failure("b", "p", "revert", 1, None, now));
        log.append(ExecutionRecord::success("c", "p", dec!(2), 1, None, now));

        let recent: Vec<_> = log.recent(2).into_iter().map(|r| r.opportunity_id).collect();
        assert_eq!(recent, vec!["c", "b"]);
        assert_eq!(log.len(), 3);
        assert_eq!(log.successes(), 2);
    }

    #[tokio::test]
    async fn test_journal_appends_jsonl() {
        let dir = std::env::temp_dir().join(format!("arb-journal-{}", uuid::Uuid::new_v4()));
        let now = Utc::now();
        journal_execution(
            dir.clone(),
            ExecutionRecord::success("a", "p", dec!(1.5), 210_000, Some("0xabc".into()), now),
        )
        .await;
        journal_execution(dir.clone(), ExecutionRecord::failure("b", "p", "timeout", 0, None, now)).await;

        let path = dir.join(format!("executions_{}.jsonl", now.format("%Y-%m-%d")));
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: ExecutionRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.tx_id.as_deref(), Some("0xabc"));

        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_journal_failure_is_not_fatal() {
        let blocker = std::env::temp_dir().join(format!("arb-journal-file-{}", uuid::Uuid::new_v4()));
        fs::write(&blocker, b"not a directory").unwrap();
        // a plain file where the directory should be
        journal_execution(blocker.clone(), ExecutionRecord::failure("c", "p", "revert", 0, None, Utc::now())).await;
        assert!(blocker.is_file());
        fs::remove_file(blocker).ok();
    }
}
