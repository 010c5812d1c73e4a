//! Application state for the API server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::agent::Agent;
use crate::agents;
use crate::config::Settings;
use crate::error::{AgentError, Result};
use crate::llm::provider_from_settings;
use crate::memory::MemoryManager;
use crate::workspace::Workspace;

/// Default starting budget for the executive agent, in minor units
const DEFAULT_BUDGET_CENTS: i64 = 100_000;

/// Shared application state for the API server
pub struct AppState {
    /// The three agents, by name
    pub agents: HashMap<String, Arc<Agent>>,
    /// Process-wide memory manager
    pub memory: MemoryManager,
    /// Immutable runtime settings
    pub settings: Settings,
    /// Workspace directory tree
    pub workspace: Workspace,
    /// Server start time (for health checks)
    start_time: Instant,
}

impl AppState {
    /// Build the full agent set from settings.
    ///
    /// Scaffolds the workspace, wires the LLM provider (when a key is
    /// configured), and constructs all three agents.
    pub fn new(settings: Settings) -> Result<Self> {
        let workspace = Workspace::init(&settings.workspace_path)?;
        let provider = provider_from_settings(&settings)?;
        let memory = MemoryManager::new(workspace.memory_dir())?;

        let mut agents = HashMap::new();

        let ouroboros = agents::ouroboros::build(&workspace, provider.clone())?;
        agents.insert(ouroboros.name().to_string(), Arc::new(ouroboros));

        let ceo = agents::ceo::build(DEFAULT_BUDGET_CENTS, "USD", provider.clone())?;
        agents.insert(ceo.name().to_string(), Arc::new(ceo));

        let polymath = agents::polymath::build(provider)?;
        agents.insert(polymath.name().to_string(), Arc::new(polymath));

        tracing::info!(count = agents.len(), "Initialized agents");

        Ok(Self {
            agents,
            memory,
            settings,
            workspace,
            start_time: Instant::now(),
        })
    }

    /// Look up an agent by name
    pub fn agent(&self, name: &str) -> Result<&Arc<Agent>> {
        self.agents
            .get(name)
            .ok_or_else(|| AgentError::AgentNotFound(name.to_string()))
    }

    /// Get the uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_state_builds_three_agents() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            workspace_path: temp.path().join("ws"),
            ..Default::default()
        };

        let state = AppState::new(settings).unwrap();
        assert_eq!(state.agents.len(), 3);
        assert!(state.agent("ouroboros").is_ok());
        assert!(state.agent("ceo").is_ok());
        assert!(state.agent("polymath").is_ok());
        assert!(matches!(
            state.agent("ghost").unwrap_err(),
            AgentError::AgentNotFound(_)
        ));
    }
}
