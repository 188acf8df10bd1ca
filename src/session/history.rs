use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::VizCueResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: i64,
    pub role: String,
    pub content: Option<String>,
    /// Structured outcome (parsed reference, click result, error) if any.
    pub outcome: Option<serde_json::Value>,
}

impl HistoryEntry {
    pub fn new(role: &str, content: Option<String>, outcome: Option<serde_json::Value>) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            role: role.to_string(),
            content,
            outcome,
        }
    }
}

/// Conversation log. Entries stay in memory for prompt context and are
/// appended to `session_<id>.jsonl` as they arrive.
pub struct SessionHistory {
    pub session_id: String,
    entries: Vec<HistoryEntry>,
    file_path: PathBuf,
}

impl SessionHistory {
    pub fn new(dir: Option<&Path>) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let dir = dir.map(Path::to_path_buf).unwrap_or_else(data_dir_or_cwd);
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            entries: Vec::new(),
            file_path,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Push and append to disk. A failed write is logged, not fatal.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
        if let Err(e) = self.flush() {
            tracing::warn!(error = %e, path = %self.file_path.display(), "history write failed");
        }
    }

    /// Append the latest entry to the JSONL file.
    pub fn flush(&self) -> VizCueResult<()> {
        if let Some(last) = self.entries.last() {
            if let Some(parent) = self.file_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let line = serde_json::to_string(last)?;
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.file_path)?;
            writeln!(file, "{}", line)?;
            tracing::debug!(path = %self.file_path.display(), "history entry flushed");
        }
        Ok(())
    }

    /// Last `n` user/assistant turns as `role: content` lines, oldest first.
    pub fn recent(&self, n: usize) -> Vec<String> {
        let mut lines: Vec<String> = self
            .entries
            .iter()
            .rev()
            .filter(|e| e.role == "user" || e.role == "assistant")
            .filter_map(|e| e.content.as_ref().map(|c| format!("{}: {}", e.role, c)))
            .take(n)
            .collect();
        lines.reverse();
        lines
    }

    /// Forget the in-memory conversation. The file on disk is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Platform data dir (`~/.local/share/vizcue/sessions` and the like),
/// falling back to the current working directory.
fn data_dir_or_cwd() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("vizcue").join("sessions");
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
