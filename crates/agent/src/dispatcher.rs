//! Tool dispatch: looks up a tool, runs it, and records what happened.
//!
//! Dispatch never fails: unknown names, tool errors and panics are all
//! turned into an error string and recorded like any other result, so the
//! planner sees them on the next round.

use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use toolpilot_core::action::Action;
use toolpilot_core::context::{Context, Outcome};
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::CapabilityRegistry;
use tracing::{debug, warn};

/// What a single invocation produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub result: String,
    pub data: Option<Value>,
    pub outcome: Outcome,
}

impl Invocation {
    fn failed(result: String) -> Self {
        Self {
            result,
            data: None,
            outcome: Outcome::ToolError,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Runs actions against a shared, read-only registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<CapabilityRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Invoke a tool by name. Never fails and never panics.
    pub async fn invoke(&self, name: &str, args: &Map<String, Value>) -> Invocation {
        let Some(tool) = self.registry.get(name) else {
            warn!(tool = name, "Dispatch to unregistered tool");
            return Invocation::failed(format!("Error: Tool {name} not found."));
        };

        let start = Instant::now();
        let fut = AssertUnwindSafe(tool.execute(args.clone()));
        let outcome = match fut.catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ToolError::Panicked(panic_message(&*payload))),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                debug!(tool = name, duration_ms, "Tool executed");
                Invocation {
                    result: result.output,
                    data: result.data,
                    outcome: Outcome::Success,
                }
            }
            Err(e) => {
                warn!(tool = name, duration_ms, error = %e, "Tool execution failed");
                Invocation::failed(format!("Error executing tool '{name}': {e}"))
            }
        }
    }

    /// Invoke `action` and append exactly one record to `context`.
    ///
    /// Returns the step index of the new record.
    pub async fn dispatch(&self, action: &Action, context: &mut Context) -> usize {
        let invocation = self.invoke(&action.name, &action.args).await;
        context.record(
            action.name.as_str(),
            action.args.clone(),
            invocation.result,
            invocation.data,
            invocation.outcome,
        )
    }
}
