//! Trinity: a three-agent LLM service
//!
//! Three specialist agents (architecture, executive, research) each expose
//! a fixed, named set of tools through a uniform registry-and-dispatch
//! mechanism. An axum HTTP layer turns run requests into dispatches and
//! exposes discovery, status, and history endpoints.

pub mod agent;
pub mod agents;
pub mod config;
pub mod error;
pub mod llm;
pub mod logging;
pub mod memory;
pub mod server;
pub mod tasks;
pub mod tools;
pub mod workspace;

pub use agent::{Agent, AgentReport, AgentStatus, InvocationRecord};
pub use config::Settings;
pub use error::{AgentError, Result};
pub use server::{create_router, serve, AppState};
pub use tools::{ParamSpec, ParamType, Tool, ToolRegistry, ToolSchema};
pub use workspace::Workspace;
