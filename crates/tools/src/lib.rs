//! Built-in tool implementations for toolpilot.
//!
//! Domain tools (calendar, email, knowledge base) live with the embedding
//! application and are registered next to these.

pub mod current_time;

use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{CapabilityRegistry, Tool};

pub use current_time::CurrentTimeTool;

/// Names of every built-in tool.
pub const BUILTIN_TOOLS: [&str; 1] = ["get_current_time"];

fn builtin(name: &str) -> Option<Box<dyn Tool>> {
    match name {
        "get_current_time" => Some(Box::new(CurrentTimeTool::new())),
        _ => None,
    }
}

/// Create a registry with every built-in tool.
pub fn default_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    for name in BUILTIN_TOOLS {
        let Some(tool) = builtin(name) else {
            continue;
        };
        if let Err(e) = registry.register(tool) {
            tracing::warn!(tool = name, error = %e, "Skipping built-in tool");
            debug_assert!(false, "built-in tool {name} failed to register: {e}");
        }
    }
    registry
}

/// Create a registry with the named built-in tools.
pub fn registry_from_names<S: AsRef<str>>(names: &[S]) -> Result<CapabilityRegistry, ToolError> {
    let mut registry = CapabilityRegistry::new();
    for name in names {
        let name = name.as_ref();
        let tool = builtin(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        registry.register(tool)?;
    }
    Ok(registry)
}
