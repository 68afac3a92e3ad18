//! Shared test helpers for the loop, parser and dispatcher tests.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use toolpilot_core::context::Context;
use toolpilot_core::error::{OracleError, ToolError};
use toolpilot_core::oracle::PlanningOracle;
use toolpilot_core::tool::{Tool, ToolResult};

use crate::end_turn::EndTurnPolicy;

/// An oracle that returns a sequence of scripted responses.
///
/// Each call to `plan` returns the next response in the queue.
/// Panics if more calls are made than responses provided.
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<String, OracleError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<Result<String, OracleError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Only successful text responses.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(t.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlanningOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn plan(&self, prompt: &str) -> Result<String, OracleError> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
            panic!("ScriptedOracle: no more responses (call #{})", prompts.len())
        })
    }
}

/// A tool returning fixed output and remembering every argument mapping.
pub struct CountingTool {
    name: &'static str,
    output: String,
    calls: Arc<Mutex<Vec<Map<String, Value>>>>,
}

impl CountingTool {
    pub fn new(name: &'static str, output: impl Into<String>) -> Self {
        Self {
            name,
            output: output.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle to the recorded calls; stays valid after the tool is boxed.
    pub fn calls(&self) -> Arc<Mutex<Vec<Map<String, Value>>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "Returns a fixed answer"
    }
    async fn execute(&self, args: Map<String, Value>) -> Result<ToolResult, ToolError> {
        self.calls.lock().unwrap().push(args);
        Ok(ToolResult::text(self.output.clone()))
    }
}

/// A tool that always returns an error.
pub struct FailingTool {
    name: &'static str,
}

impl FailingTool {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "Always fails"
    }
    async fn execute(&self, _args: Map<String, Value>) -> Result<ToolResult, ToolError> {
        Err(ToolError::ExecutionFailed {
            tool_name: self.name.to_string(),
            reason: "mailbox unavailable".into(),
        })
    }
}

/// A tool that panics while running.
pub struct PanickingTool {
    name: &'static str,
}

impl PanickingTool {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "Panics"
    }
    async fn execute(&self, _args: Map<String, Value>) -> Result<ToolResult, ToolError> {
        panic!("index out of range");
    }
}

/// An end-turn policy answering from a script, `false` once exhausted.
pub struct ScriptedEndTurn {
    answers: Mutex<VecDeque<bool>>,
    consults: Mutex<usize>,
}

impl ScriptedEndTurn {
    pub fn new(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            consults: Mutex::new(0),
        }
    }

    pub fn consults(&self) -> usize {
        *self.consults.lock().unwrap()
    }
}

#[async_trait]
impl EndTurnPolicy for ScriptedEndTurn {
    async fn should_end_turn(&self, _user_query: &str, _context: &Context) -> bool {
        *self.consults.lock().unwrap() += 1;
        self.answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}
