//! Tool trait definition
//!
//! All tools implement this trait to provide a consistent interface.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON type a tool parameter accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    /// Check whether a JSON value matches this type.
    ///
    /// Integers are accepted where a number is expected, matching the
    /// usual JSON Schema reading.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Declaration of a single tool parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,
    /// Expected JSON type
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Whether the parameter must be supplied
    pub required: bool,
    /// Value filled in when the parameter is omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Human-readable description
    pub description: String,
}

impl ParamSpec {
    /// Declare a required parameter
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            default: None,
            description: description.into(),
        }
    }

    /// Declare an optional parameter
    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            default: None,
            description: description.into(),
        }
    }

    /// Set the default value used when the parameter is omitted
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Parameter schema for one tool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Parameters in declaration order
    pub params: Vec<ParamSpec>,
}

impl ToolSchema {
    /// Build a schema from a list of parameter specs
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// Schema with no parameters
    pub fn empty() -> Self {
        Self { params: Vec::new() }
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

/// Public metadata of a registered tool, as returned by discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Name of the tool
    pub name: String,
    /// What the tool does
    pub description: String,
    /// Parameter schema
    pub parameters: ToolSchema,
}

/// Trait for tools that an agent can dispatch
///
/// Tools receive a JSON object of arguments already validated against
/// their schema, with declared defaults filled in for omitted optional
/// parameters.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the name of this tool
    fn name(&self) -> &str;

    /// Get a description of this tool
    fn description(&self) -> &str;

    /// Get the parameter schema for this tool
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with the given arguments
    async fn execute(&self, args: &Value) -> Result<Value>;

    /// Public metadata for discovery endpoints
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.schema(),
        }
    }
}
