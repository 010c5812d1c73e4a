//! Agent run reports
//!
//! One report is produced per agent run: the ordered thought steps, the
//! final result if any, and timing. Reports accumulate on the agent for
//! the process lifetime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle state of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Thinking,
    Acting,
    Error,
}

/// Kind of one thought step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Thinking,
    Action,
    Error,
}

/// One step in an agent's reasoning trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThoughtStep {
    pub timestamp: DateTime<Utc>,
    pub kind: StepKind,
    pub content: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_used: Vec<String>,
}

impl ThoughtStep {
    pub fn new(kind: StepKind, content: impl Into<String>, confidence: f32) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            content: content.into(),
            confidence,
            tools_used: Vec::new(),
        }
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools_used.push(tool.into());
        self
    }
}

/// Report for one complete agent run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    pub agent: String,
    pub task_id: String,
    pub status: AgentStatus,
    pub steps: Vec<ThoughtStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<Value>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentReport {
    /// Start a report for a new run
    pub fn begin(agent: impl Into<String>, task_id: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            task_id: task_id.into(),
            status: AgentStatus::Idle,
            steps: Vec::new(),
            final_result: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Append a step
    pub fn push(&mut self, step: ThoughtStep) {
        self.steps.push(step);
    }

    /// Mark the run finished
    pub fn finish(&mut self, status: AgentStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_lifecycle() {
        let mut report = AgentReport::begin("ceo", "task-1");
        assert!(report.completed_at.is_none());

        report.push(ThoughtStep::new(StepKind::Thinking, "weighing options", 0.8));
        report.push(
            ThoughtStep::new(StepKind::Action, "dispatched", 1.0).with_tool("budget_management"),
        );
        report.final_result = Some(json!({"balance": 100}));
        report.finish(AgentStatus::Idle);

        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[1].tools_used, vec!["budget_management"]);
        assert!(report.completed_at.is_some());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(AgentStatus::Thinking).unwrap(),
            json!("thinking")
        );
        assert_eq!(serde_json::to_value(StepKind::Error).unwrap(), json!("error"));
    }
}
