//! Tool registry and dispatch
//!
//! Each agent owns a registry mapping tool names to handlers. The map is
//! populated at construction and immutable afterwards, so it can be shared
//! across concurrent dispatches without locking.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::tool::{Tool, ToolMetadata};
use crate::error::{AgentError, Result};

/// Registry of tools for one agent
#[derive(Default)]
pub struct ToolRegistry {
    /// Tools in registration order
    tools: Vec<Arc<dyn Tool>>,
    /// Name -> index into `tools`
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool.
    ///
    /// Names must be non-empty and unique; registering a duplicate name
    /// fails and leaves the first registration in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(AgentError::EmptyToolName);
        }
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }

        tracing::debug!(tool = %name, "Registered tool");
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Whether a tool with this name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Look up a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// Public metadata of all tools, in registration order.
    ///
    /// Handlers are never exposed, only name, description, and schema.
    pub fn list(&self) -> Vec<ToolMetadata> {
        self.tools.iter().map(|t| t.metadata()).collect()
    }

    /// Validate `args` against a tool's schema.
    ///
    /// Returns the normalized argument object: declared defaults are
    /// filled in for omitted optional parameters. Fails when a required
    /// parameter is missing, a supplied value's type does not match, or
    /// the arguments are not a JSON object.
    pub fn validate(&self, name: &str, args: &Value) -> Result<Value> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        let empty = Map::new();
        let supplied: &Map<String, Value> = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(AgentError::InvalidArguments {
                    tool: name.to_string(),
                    reason: format!("arguments must be a JSON object, got {}", json_kind(other)),
                })
            }
        };

        let schema = tool.schema();
        let mut normalized = Map::new();

        for spec in &schema.params {
            match supplied.get(&spec.name) {
                Some(value) => {
                    if !spec.param_type.matches(value) {
                        return Err(AgentError::InvalidArguments {
                            tool: name.to_string(),
                            reason: format!(
                                "parameter '{}' expects {}, got {}",
                                spec.name,
                                spec.param_type,
                                json_kind(value)
                            ),
                        });
                    }
                    normalized.insert(spec.name.clone(), value.clone());
                }
                None if spec.required => {
                    return Err(AgentError::InvalidArguments {
                        tool: name.to_string(),
                        reason: format!("missing required parameter '{}'", spec.name),
                    });
                }
                None => {
                    if let Some(default) = &spec.default {
                        normalized.insert(spec.name.clone(), default.clone());
                    }
                }
            }
        }

        // Unknown keys are passed through untouched so handlers can accept
        // free-form extras the schema does not pin down.
        for (key, value) in supplied {
            if !normalized.contains_key(key) {
                normalized.insert(key.clone(), value.clone());
            }
        }

        Ok(Value::Object(normalized))
    }

    /// Dispatch one tool invocation.
    ///
    /// Looks up the tool, validates and normalizes the arguments, and runs
    /// the handler. Handler failures are wrapped as `ToolExecution` rather
    /// than propagated raw.
    pub async fn dispatch(&self, name: &str, args: &Value) -> Result<Value> {
        let normalized = self.validate(name, args)?;
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        tracing::info!(tool = %name, "Dispatching tool");
        tool.execute(&normalized)
            .await
            .map_err(|source| AgentError::ToolExecution {
                tool: name.to_string(),
                source,
            })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::tool::{ParamSpec, ParamType, ToolSchema};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Return the input text unchanged"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(vec![ParamSpec::required(
                "text",
                ParamType::String,
                "Text to echo back",
            )])
        }

        async fn execute(&self, args: &Value) -> anyhow::Result<Value> {
            Ok(args["text"].clone())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::empty()
        }

        async fn execute(&self, _args: &Value) -> anyhow::Result<Value> {
            anyhow::bail!("boom")
        }
    }

    struct EmptyNameTool;

    #[async_trait]
    impl Tool for EmptyNameTool {
        fn name(&self) -> &str {
            ""
        }

        fn description(&self) -> &str {
            "Invalid"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::empty()
        }

        async fn execute(&self, _args: &Value) -> anyhow::Result<Value> {
            Ok(Value::Null)
        }
    }

    fn registry_with_echo() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_dispatch_echo() {
        let registry = registry_with_echo();
        let result = registry.dispatch("echo", &json!({"text": "hi"})).await.unwrap();
        assert_eq!(result, json!("hi"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_tool() {
        let registry = registry_with_echo();
        let err = registry.dispatch("missing", &json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolNotFound(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_dispatch_missing_required_param() {
        let registry = registry_with_echo();
        let err = registry.dispatch("echo", &json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_wrong_type() {
        let registry = registry_with_echo();
        let err = registry.dispatch("echo", &json!({"text": 42})).await.unwrap_err();
        match err {
            AgentError::InvalidArguments { reason, .. } => {
                assert!(reason.contains("expects string"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dispatch_wraps_handler_failure() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool)).unwrap();

        let err = registry.dispatch("failing", &json!({})).await.unwrap_err();
        match err {
            AgentError::ToolExecution { tool, source } => {
                assert_eq!(tool, "failing");
                assert!(source.to_string().contains("boom"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = registry_with_echo();
        let err = registry.register(Arc::new(EchoTool)).unwrap_err();
        assert!(matches!(err, AgentError::DuplicateTool(name) if name == "echo"));

        // First registration stays retrievable
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].name, "echo");
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(Arc::new(EmptyNameTool)).unwrap_err();
        assert!(matches!(err, AgentError::EmptyToolName));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_validate_fills_defaults() {
        struct DepthTool;

        #[async_trait]
        impl Tool for DepthTool {
            fn name(&self) -> &str {
                "depth"
            }
            fn description(&self) -> &str {
                "Schema with a default"
            }
            fn schema(&self) -> ToolSchema {
                ToolSchema::new(vec![
                    ParamSpec::required("query", ParamType::String, "Query"),
                    ParamSpec::optional("depth", ParamType::String, "Depth")
                        .with_default(json!("medium")),
                ])
            }
            async fn execute(&self, _args: &Value) -> anyhow::Result<Value> {
                Ok(Value::Null)
            }
        }

        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(DepthTool)).unwrap();

        let normalized = registry.validate("depth", &json!({"query": "rust"})).unwrap();
        assert_eq!(normalized["depth"], json!("medium"));

        let normalized = registry
            .validate("depth", &json!({"query": "rust", "depth": "deep"}))
            .unwrap();
        assert_eq!(normalized["depth"], json!("deep"));
    }

    #[test]
    fn test_validate_rejects_non_object_args() {
        let registry = registry_with_echo();
        let err = registry.validate("echo", &json!("not an object")).unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments { .. }));
    }

    #[test]
    fn test_list_exposes_metadata_only() {
        let registry = registry_with_echo();
        let listed = registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "echo");
        assert_eq!(listed[0].parameters.params[0].name, "text");

        // Metadata is plain data; serializing it must succeed and contain
        // nothing but name/description/parameters (keys come back sorted).
        let json = serde_json::to_value(&listed).unwrap();
        let keys: Vec<&String> = json[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["description", "name", "parameters"]);
    }
}
