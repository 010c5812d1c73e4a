//! Agent runner
//!
//! An agent bundles a name, a role, an immutable tool registry, and an
//! append-only invocation history. The run loop alternates between asking
//! the LLM provider what to do (think) and dispatching the chosen tool
//! (act), for at most `max_iterations` rounds.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::history::{InvocationHistory, InvocationRecord};
use super::report::{AgentReport, AgentStatus, StepKind, ThoughtStep};
use crate::error::{AgentError, Result};
use crate::llm::{CompletionRequest, Provider};
use crate::tools::{Tool, ToolMetadata, ToolRegistry};

/// Default cap on think/act rounds per run
const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Reply given when no provider is configured
const NO_PROVIDER_MESSAGE: &str =
    "No language model provider is configured; set OPENAI_API_KEY or ANTHROPIC_API_KEY.";

/// A tool invocation extracted from a model reply
#[derive(Debug, Deserialize)]
struct ActionRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

/// Status snapshot for the system status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatusInfo {
    pub name: String,
    pub role: String,
    pub status: AgentStatus,
    pub tools_count: usize,
    pub history_count: usize,
    pub reports_count: usize,
    pub using_llm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// An agent: a named bundle of tools plus an invocation history
pub struct Agent {
    name: String,
    role: String,
    description: String,
    system_prompt: String,
    registry: ToolRegistry,
    history: InvocationHistory,
    reports: Mutex<Vec<AgentReport>>,
    status: Mutex<AgentStatus>,
    provider: Option<Arc<dyn Provider>>,
    max_iterations: usize,
    temperature: f32,
    continue_on_error: bool,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("description", &self.description)
            .field("max_iterations", &self.max_iterations)
            .field("temperature", &self.temperature)
            .field("continue_on_error", &self.continue_on_error)
            .field("using_llm", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Create a new agent with an empty tool registry
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let role = role.into();
        let description = description.into();
        let system_prompt = default_system_prompt(&name, &role, &description);

        tracing::info!(agent = %name, "Creating agent");

        Self {
            name,
            role,
            description,
            system_prompt,
            registry: ToolRegistry::new(),
            history: InvocationHistory::new(),
            reports: Mutex::new(Vec::new()),
            status: Mutex::new(AgentStatus::Idle),
            provider: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            temperature: 0.7,
            continue_on_error: true,
        }
    }

    /// Attach an LLM provider
    pub fn with_provider(mut self, provider: Option<Arc<dyn Provider>>) -> Self {
        self.provider = provider;
        self
    }

    /// Replace the default system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Set the sampling temperature for think calls
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the cap on think/act rounds per run
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Register a tool. Tools are registered during construction and the
    /// registry is immutable once the agent is shared.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        self.registry.register(tool)
    }

    /// Agent name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Agent role
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Agent description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current lifecycle status
    pub fn status(&self) -> AgentStatus {
        *self.status.lock().expect("status lock poisoned")
    }

    /// Whether an LLM provider is attached
    pub fn using_llm(&self) -> bool {
        self.provider.is_some()
    }

    /// Public metadata of all registered tools
    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.registry.list()
    }

    /// The invocation history
    pub fn history(&self) -> &InvocationHistory {
        &self.history
    }

    /// The most recent `limit` run reports, oldest first
    pub fn recent_reports(&self, limit: usize) -> Vec<AgentReport> {
        let reports = self.reports.lock().expect("reports lock poisoned");
        let start = reports.len().saturating_sub(limit);
        reports[start..].to_vec()
    }

    /// Status snapshot for discovery endpoints
    pub fn status_info(&self) -> AgentStatusInfo {
        AgentStatusInfo {
            name: self.name.clone(),
            role: self.role.clone(),
            status: self.status(),
            tools_count: self.registry.len(),
            history_count: self.history.len(),
            reports_count: self.reports.lock().expect("reports lock poisoned").len(),
            using_llm: self.provider.is_some(),
            model: self.provider.as_ref().map(|p| p.model().to_string()),
        }
    }

    /// Dispatch one tool invocation and record it.
    ///
    /// Lookup and validation failures are reported without a history
    /// record, since no handler ran. Handler failures and successes each
    /// append exactly one record.
    pub async fn dispatch(&self, tool: &str, args: &Value) -> Result<Value> {
        let started = Instant::now();
        let result = self.registry.dispatch(tool, args).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(value) => {
                self.history.append(InvocationRecord::success(
                    tool,
                    args.clone(),
                    value.clone(),
                    duration_ms,
                ));
            }
            Err(AgentError::ToolExecution { source, .. }) => {
                self.history.append(InvocationRecord::failure(
                    tool,
                    args.clone(),
                    source.to_string(),
                    duration_ms,
                ));
            }
            // ToolNotFound / InvalidArguments: the handler never ran
            Err(_) => {}
        }

        result
    }

    /// Ask the provider for a plan of action.
    ///
    /// Without a provider the agent still answers, with a fixed notice, so
    /// runs degrade instead of erroring.
    pub async fn think(&self, task: &str, context: Option<&Value>) -> Result<String> {
        let provider = match &self.provider {
            Some(p) => p,
            None => return Ok(NO_PROVIDER_MESSAGE.to_string()),
        };

        let context_text = match context {
            Some(value) => serde_json::to_string_pretty(value)?,
            None => "none".to_string(),
        };
        let tools_text = serde_json::to_string_pretty(&self.registry.list())?;

        let prompt = format!(
            "Task: {task}\n\n\
             Context: {context_text}\n\n\
             Available tools:\n{tools_text}\n\n\
             Decide how to proceed. To invoke a tool, reply with a single JSON \
             object of the form {{\"tool\": \"<name>\", \"arguments\": {{...}}}} \
             inside a ```json fence. If no tool is needed, reply with your \
             answer in plain text."
        );

        let request = CompletionRequest::from_user(prompt)
            .with_system(self.system_prompt.clone())
            .with_temperature(self.temperature);

        let response = provider.complete(request).await?;
        Ok(response.content)
    }

    /// Run the full think/act loop for one task
    pub async fn run(&self, task: &str, context: Option<Value>) -> Result<AgentReport> {
        let task_id = format!("{}_{}", self.name, Uuid::new_v4());
        let mut report = AgentReport::begin(&self.name, &task_id);
        let mut finished = false;

        tracing::info!(agent = %self.name, task_id = %task_id, "Starting run");

        for iteration in 1..=self.max_iterations {
            tracing::debug!(agent = %self.name, iteration, "Think/act iteration");

            self.set_status(AgentStatus::Thinking);
            let thought = match self.think(task, context.as_ref()).await {
                Ok(thought) => thought,
                Err(e) => {
                    tracing::error!(agent = %self.name, error = %e, "Think failed");
                    report.push(ThoughtStep::new(StepKind::Error, e.to_string(), 0.0));
                    report.finish(AgentStatus::Error);
                    finished = true;
                    break;
                }
            };
            report.push(ThoughtStep::new(StepKind::Thinking, thought.clone(), 0.8));

            let Some(action) = extract_action(&thought) else {
                // The model answered directly; the thought is the result.
                report.final_result = Some(json!({ "message": thought }));
                report.finish(AgentStatus::Idle);
                finished = true;
                break;
            };

            self.set_status(AgentStatus::Acting);
            match self.dispatch(&action.tool, &action.arguments).await {
                Ok(result) => {
                    report.push(
                        ThoughtStep::new(StepKind::Action, format!("invoked {}", action.tool), 1.0)
                            .with_tool(&action.tool),
                    );
                    report.final_result = Some(result);
                    report.finish(AgentStatus::Idle);
                    finished = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(agent = %self.name, tool = %action.tool, error = %e, "Action failed");
                    report.push(ThoughtStep::new(StepKind::Error, e.to_string(), 0.0));
                    if !self.continue_on_error {
                        report.finish(AgentStatus::Error);
                        finished = true;
                        break;
                    }
                }
            }
        }

        if !finished {
            // Ran out of iterations without a conclusive action
            report.finish(AgentStatus::Error);
        }

        self.set_status(match report.status {
            AgentStatus::Error => AgentStatus::Error,
            _ => AgentStatus::Idle,
        });

        self.reports
            .lock()
            .expect("reports lock poisoned")
            .push(report.clone());

        tracing::info!(agent = %self.name, task_id = %task_id, status = ?report.status, "Run finished");

        Ok(report)
    }

    fn set_status(&self, status: AgentStatus) {
        *self.status.lock().expect("status lock poisoned") = status;
    }
}

fn default_system_prompt(name: &str, role: &str, description: &str) -> String {
    format!(
        "You are {name}, {role}.\n\n\
         {description}\n\n\
         Your job is to analyze the task and take the appropriate action with \
         the tools available to you. Be methodical and precise, explain your \
         steps clearly, pick the right tool for the job, and ask for \
         clarification when a request is ambiguous."
    )
}

/// Extract a tool invocation from a model reply.
///
/// Prefers a fenced ```json block; falls back to the outermost brace pair.
/// Returns None when the reply contains no parsable invocation.
fn extract_action(text: &str) -> Option<ActionRequest> {
    use std::sync::OnceLock;
    static FENCE_RE: OnceLock<Regex> = OnceLock::new();

    let fence_re = FENCE_RE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("static regex")
    });

    let candidate = if let Some(caps) = fence_re.captures(text) {
        caps.get(1)?.as_str().to_string()
    } else {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        if end <= start {
            return None;
        }
        text[start..=end].to_string()
    };

    let action: ActionRequest = serde_json::from_str(&candidate).ok()?;
    if action.tool.trim().is_empty() {
        return None;
    }
    Some(action)
}
