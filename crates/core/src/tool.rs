//! Tool trait: the abstraction over planner-invocable capabilities.
//!
//! Tools are what let a turn act on the world: look up the time, scan a
//! calendar, fetch email. The loop never calls a tool directly; it goes
//! through the dispatcher, which looks tools up in a [`CapabilityRegistry`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::action::ControlAction;
use crate::error::ToolError;

/// The value a tool produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Human-readable output shown to the planner.
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn text(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            data: None,
        }
    }

    /// A structured result; the text output is the compact JSON rendering.
    pub fn structured(data: Value) -> Self {
        let output = match &data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            output,
            data: Some(data),
        }
    }
}

/// Tool metadata rendered into the planner's action catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema describing the tool's keyword arguments
    pub parameters: Value,
}

impl ToolDefinition {
    /// `name(arg_a, arg_b)` from the schema's `properties`.
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self
            .parameters
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// The core Tool trait.
///
/// Tools receive their arguments as a keyword mapping; a call with no
/// arguments receives an empty map.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "get_current_time").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the planner).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> Value {
        serde_json::json!({ "type": "object", "properties": {} })
    }

    /// Execute the tool with the given keyword arguments.
    async fn execute(&self, args: Map<String, Value>) -> std::result::Result<ToolResult, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Read-only mapping from action name to tool.
///
/// Populated once at startup, then shared behind an `Arc` by every turn.
/// Control action names can never be registered.
pub struct CapabilityRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if ControlAction::is_reserved(&name) {
            return Err(ToolError::ReservedName(name));
        }
        if self.tools.insert(name.clone(), tool).is_some() {
            tracing::debug!(tool = %name, "Replaced previously registered tool");
        }
        Ok(())
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: Box<dyn Tool>) -> std::result::Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Definitions for every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
