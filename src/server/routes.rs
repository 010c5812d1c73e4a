//! HTTP route handlers for the API.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

use super::state::AppState;
use crate::agent::{AgentReport, AgentStatusInfo, InvocationRecord};
use crate::error::AgentError;
use crate::memory::MemoryEntry;
use crate::tools::ToolMetadata;

/// API error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

/// Error wrapper that maps the taxonomy onto HTTP status codes
pub struct ApiError(pub AgentError);

impl From<AgentError> for ApiError {
    fn from(e: AgentError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AgentError::AgentNotFound(_) => (StatusCode::NOT_FOUND, "AGENT_NOT_FOUND"),
            AgentError::ToolNotFound(_) => (StatusCode::NOT_FOUND, "TOOL_NOT_FOUND"),
            AgentError::InvalidArguments { .. } => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENTS"),
            AgentError::EmptyToolName | AgentError::DuplicateTool(_) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST")
            }
            AgentError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            AgentError::ToolExecution { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "TOOL_EXECUTION_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
            code,
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Discovery endpoints
// ============================================================================

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Trinity Agent Service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/health",
            "agents": "/agents",
            "status": "/system/status",
        },
    }))
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub agents_active: Vec<String>,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let mut agents_active: Vec<String> = state.agents.keys().cloned().collect();
    agents_active.sort();

    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        agents_active,
    })
}

/// Per-agent entry in the agents listing
#[derive(Debug, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub role: String,
    pub description: String,
    pub tools: Vec<ToolMetadata>,
}

/// List agents and their tool metadata
pub async fn list_agents(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mut summaries: Vec<AgentSummary> = state
        .agents
        .values()
        .map(|agent| AgentSummary {
            name: agent.name().to_string(),
            role: agent.role().to_string(),
            description: agent.description().to_string(),
            tools: agent.list_tools(),
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));

    Json(json!({ "agents": summaries }))
}

/// System status response
#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub status: &'static str,
    pub timestamp: String,
    pub agents: BTreeMap<String, AgentStatusInfo>,
    pub system_info: Value,
}

/// Snapshot of every agent plus process info
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<SystemStatus> {
    let agents: BTreeMap<String, AgentStatusInfo> = state
        .agents
        .iter()
        .map(|(name, agent)| (name.clone(), agent.status_info()))
        .collect();

    let (short_term, long_term) = state.memory.counts();

    Json(SystemStatus {
        status: "operational",
        timestamp: Utc::now().to_rfc3339(),
        agents,
        system_info: json!({
            "version": env!("CARGO_PKG_VERSION"),
            "agents_count": state.agents.len(),
            "uptime_seconds": state.uptime_seconds(),
            "memory_entries": { "short_term": short_term, "long_term": long_term },
        }),
    })
}

// ============================================================================
// Agent execution endpoints
// ============================================================================

/// Body of a run request
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub task: String,
    #[serde(default)]
    pub context: Option<Value>,
}

/// Run an agent's full think/act loop on one task
pub async fn run_agent(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<RunRequest>,
) -> Result<Json<Value>, ApiError> {
    let agent = state.agent(&name)?.clone();

    info!(agent = %name, task_preview = %request.task.chars().take(50).collect::<String>(), "Run requested");

    let timeout = std::time::Duration::from_secs(state.settings.task_timeout_secs);
    let report: AgentReport =
        tokio::time::timeout(timeout, agent.run(&request.task, request.context))
            .await
            .map_err(|_| AgentError::Timeout(state.settings.task_timeout_secs))?
            .map_err(|e| {
                error!(agent = %name, error = %e, "Run failed");
                e
            })?;

    // Remember the run so later sessions can recall what happened
    let importance = match report.final_result {
        Some(_) => 0.6,
        None => 0.3,
    };
    state.memory.add_short_term(
        MemoryEntry::new("agent_run", format!("{}: {}", name, request.task), importance)
            .with_metadata(json!({ "task_id": report.task_id.clone() })),
    );

    Ok(Json(json!({
        "agent": name,
        "result": report,
    })))
}

/// Body of a direct tool dispatch request
#[derive(Debug, Deserialize)]
pub struct ToolRequest {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Dispatch a single tool on one agent
pub async fn run_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<ToolRequest>,
) -> Result<Json<Value>, ApiError> {
    let agent = state.agent(&name)?;

    info!(agent = %name, tool = %request.tool, "Tool dispatch requested");

    let result = agent.dispatch(&request.tool, &request.arguments).await?;

    Ok(Json(json!({
        "agent": name,
        "tool": request.tool,
        "result": result,
    })))
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    10
}

/// Most recent invocation records for one agent
pub async fn agent_history(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let agent = state.agent(&name)?;
    let history: Vec<InvocationRecord> = agent.history().recent(query.limit);

    Ok(Json(json!({
        "agent": name,
        "history_count": history.len(),
        "history": history,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
            agents_active: vec!["ceo".to_string()],
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("ceo"));
    }

    #[test]
    fn test_run_request_deserialization() {
        let request: RunRequest = serde_json::from_str(r#"{"task": "plan a launch"}"#).unwrap();
        assert_eq!(request.task, "plan a launch");
        assert!(request.context.is_none());

        let request: RunRequest =
            serde_json::from_str(r#"{"task": "t", "context": {"k": "v"}}"#).unwrap();
        assert_eq!(request.context.unwrap()["k"], "v");
    }

    #[test]
    fn test_tool_request_default_arguments() {
        let request: ToolRequest = serde_json::from_str(r#"{"tool": "echo"}"#).unwrap();
        assert_eq!(request.tool, "echo");
        assert!(request.arguments.is_null());
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let cases = [
            (AgentError::AgentNotFound("x".into()), StatusCode::NOT_FOUND),
            (AgentError::ToolNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                AgentError::InvalidArguments {
                    tool: "x".into(),
                    reason: "r".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (AgentError::Timeout(300), StatusCode::GATEWAY_TIMEOUT),
            (
                AgentError::ToolExecution {
                    tool: "x".into(),
                    source: anyhow::anyhow!("boom"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AgentError::Provider("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
