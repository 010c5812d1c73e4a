//! Task engine
//!
//! Queues tasks addressed to named agents and drains the queue with a
//! bounded number of concurrent runs. A failed task is marked failed and
//! the queue keeps going.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::agent::Agent;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// One queued unit of work for an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: i32,
    pub agent_name: String,
    pub params: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task addressed to one agent
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        agent_name: impl Into<String>,
        params: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            priority: 1,
            agent_name: agent_name.into(),
            params,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Set the priority (higher runs earlier)
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Queue of tasks with bounded concurrent execution
pub struct TaskEngine {
    tasks: Mutex<HashMap<String, Task>>,
    queue: Mutex<Vec<String>>,
    semaphore: Arc<Semaphore>,
}

impl TaskEngine {
    /// Create an engine allowing `max_concurrent` simultaneous runs
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            queue: Mutex::new(Vec::new()),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Queue a task, returning its id
    pub fn add_task(&self, task: Task) -> String {
        let id = task.id.clone();
        self.queue.lock().expect("queue lock poisoned").push(id.clone());
        self.tasks
            .lock()
            .expect("tasks lock poisoned")
            .insert(id.clone(), task);
        id
    }

    /// Look up a task by id
    pub fn get_task(&self, task_id: &str) -> Option<Task> {
        self.tasks
            .lock()
            .expect("tasks lock poisoned")
            .get(task_id)
            .cloned()
    }

    /// All tasks, optionally filtered by status
    pub fn list_tasks(&self, status: Option<TaskStatus>) -> Vec<Task> {
        let tasks = self.tasks.lock().expect("tasks lock poisoned");
        let mut listed: Vec<Task> = tasks
            .values()
            .filter(|t| status.map_or(true, |s| t.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        listed
    }

    /// Run one task against its agent, updating its stored state
    pub async fn execute_task(&self, task_id: &str, agent: &Agent) -> Option<Value> {
        let _permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore closed");

        let (name, params) = {
            let mut tasks = self.tasks.lock().expect("tasks lock poisoned");
            let task = tasks.get_mut(task_id)?;
            task.status = TaskStatus::Running;
            task.started_at = Some(Utc::now());
            (task.name.clone(), task.params.clone())
        };

        tracing::info!(task_id = %task_id, agent = %agent.name(), "Executing task");

        let context = if params.is_null() { None } else { Some(params) };
        let run_result = agent.run(&name, context).await;

        let mut tasks = self.tasks.lock().expect("tasks lock poisoned");
        let task = tasks.get_mut(task_id)?;
        task.completed_at = Some(Utc::now());

        match run_result {
            Ok(report) => {
                let result = serde_json::to_value(&report).ok();
                task.status = TaskStatus::Completed;
                task.result = result.clone();
                result
            }
            Err(e) => {
                tracing::warn!(task_id = %task_id, error = %e, "Task failed");
                task.status = TaskStatus::Failed;
                task.error = Some(e.to_string());
                None
            }
        }
    }

    /// Drain the queue against the given agent set.
    ///
    /// Higher-priority tasks run first; tasks addressed to unknown agents
    /// are marked failed.
    pub async fn run_all(&self, agents: &HashMap<String, Arc<Agent>>) {
        let mut queued: Vec<String> = {
            let mut queue = self.queue.lock().expect("queue lock poisoned");
            std::mem::take(&mut *queue)
        };

        queued.sort_by_key(|id| {
            self.get_task(id)
                .map(|t| std::cmp::Reverse(t.priority))
                .unwrap_or(std::cmp::Reverse(0))
        });

        for task_id in queued {
            let agent_name = match self.get_task(&task_id) {
                Some(task) => task.agent_name,
                None => continue,
            };

            match agents.get(&agent_name) {
                Some(agent) => {
                    self.execute_task(&task_id, agent).await;
                }
                None => {
                    let mut tasks = self.tasks.lock().expect("tasks lock poisoned");
                    if let Some(task) = tasks.get_mut(&task_id) {
                        task.status = TaskStatus::Failed;
                        task.error = Some(format!("agent '{}' not found", agent_name));
                        task.completed_at = Some(Utc::now());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn idle_agent(name: &str) -> Arc<Agent> {
        // No provider: runs complete immediately with the fixed notice
        Arc::new(Agent::new(name, "test role", "test description"))
    }

    #[tokio::test]
    async fn test_execute_task_completes() {
        let engine = TaskEngine::new(2);
        let agent = idle_agent("worker");

        let id = engine.add_task(Task::new("do a thing", "test", "worker", Value::Null));
        assert_eq!(engine.get_task(&id).unwrap().status, TaskStatus::Pending);

        let result = engine.execute_task(&id, &agent).await;
        assert!(result.is_some());

        let task = engine.get_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.started_at.is_some());
        assert!(task.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_run_all_handles_unknown_agent() {
        let engine = TaskEngine::new(2);
        let mut agents = HashMap::new();
        agents.insert("worker".to_string(), idle_agent("worker"));

        let good = engine.add_task(Task::new("a", "test", "worker", Value::Null));
        let bad = engine.add_task(Task::new("b", "test", "ghost", Value::Null));

        engine.run_all(&agents).await;

        assert_eq!(engine.get_task(&good).unwrap().status, TaskStatus::Completed);
        let failed = engine.get_task(&bad).unwrap();
        assert_eq!(failed.status, TaskStatus::Failed);
        assert!(failed.error.as_ref().unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_list_tasks_filters_by_status() {
        let engine = TaskEngine::new(1);
        engine.add_task(Task::new("a", "t", "w", Value::Null));
        engine.add_task(Task::new("b", "t", "w", Value::Null));

        assert_eq!(engine.list_tasks(None).len(), 2);
        assert_eq!(engine.list_tasks(Some(TaskStatus::Pending)).len(), 2);
        assert_eq!(engine.list_tasks(Some(TaskStatus::Completed)).len(), 0);
    }

    #[tokio::test]
    async fn test_priority_order() {
        let engine = TaskEngine::new(1);
        let low = engine.add_task(Task::new("low", "t", "w", json!(null)).with_priority(1));
        let high = engine.add_task(Task::new("high", "t", "w", json!(null)).with_priority(5));

        let mut agents = HashMap::new();
        agents.insert("w".to_string(), idle_agent("w"));
        engine.run_all(&agents).await;

        let low_task = engine.get_task(&low).unwrap();
        let high_task = engine.get_task(&high).unwrap();
        assert!(high_task.completed_at.unwrap() <= low_task.completed_at.unwrap());
    }
}
