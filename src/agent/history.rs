//! Invocation history
//!
//! Every executed dispatch produces one immutable record. Records are
//! retained for the process lifetime; there is no eviction.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Outcome of one dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InvocationOutcome {
    Success { result: Value },
    Failure { error: String },
}

/// Immutable log entry for one completed or failed dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// Record id
    pub id: Uuid,
    /// Name of the dispatched tool
    pub tool: String,
    /// Arguments as supplied by the caller
    pub arguments: Value,
    /// Result or error
    #[serde(flatten)]
    pub outcome: InvocationOutcome,
    /// When the dispatch completed
    pub timestamp: DateTime<Utc>,
    /// Wall-clock duration of the handler
    pub duration_ms: u64,
}

impl InvocationRecord {
    /// Record a successful dispatch
    pub fn success(tool: impl Into<String>, arguments: Value, result: Value, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool: tool.into(),
            arguments,
            outcome: InvocationOutcome::Success { result },
            timestamp: Utc::now(),
            duration_ms,
        }
    }

    /// Record a failed dispatch
    pub fn failure(tool: impl Into<String>, arguments: Value, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool: tool.into(),
            arguments,
            outcome: InvocationOutcome::Failure { error: error.into() },
            timestamp: Utc::now(),
            duration_ms,
        }
    }

    /// Whether this dispatch succeeded
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Success { .. })
    }
}

/// Append-only, mutex-guarded invocation log
#[derive(Debug, Default)]
pub struct InvocationHistory {
    records: Mutex<Vec<InvocationRecord>>,
}

impl InvocationHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record
    pub fn append(&self, record: InvocationRecord) {
        self.records.lock().expect("history lock poisoned").push(record);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.lock().expect("history lock poisoned").len()
    }

    /// Whether the history is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent `limit` records, oldest first
    pub fn recent(&self, limit: usize) -> Vec<InvocationRecord> {
        let records = self.records.lock().expect("history lock poisoned");
        let start = records.len().saturating_sub(limit);
        records[start..].to_vec()
    }

    /// A copy of all records
    pub fn snapshot(&self) -> Vec<InvocationRecord> {
        self.records.lock().expect("history lock poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_and_recent() {
        let history = InvocationHistory::new();
        assert!(history.is_empty());

        for i in 0..5 {
            history.append(InvocationRecord::success(
                "echo",
                json!({"text": i}),
                json!(i),
                1,
            ));
        }

        assert_eq!(history.len(), 5);

        let recent = history.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].arguments, json!({"text": 3}));
        assert_eq!(recent[1].arguments, json!({"text": 4}));

        // Asking for more than exists returns everything
        assert_eq!(history.recent(100).len(), 5);
    }

    #[test]
    fn test_record_serialization() {
        let record = InvocationRecord::failure("search", json!({}), "backend down", 12);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error"], "backend down");
        assert_eq!(json["tool"], "search");

        let success = InvocationRecord::success("echo", json!({"text": "hi"}), json!("hi"), 3);
        let json = serde_json::to_value(&success).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["result"], "hi");
    }
}
