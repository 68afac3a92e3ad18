//! Per-turn execution history.
//!
//! A [`Context`] records every dispatched action of one turn in order and
//! derives two things from it: whether the goal looks satisfied, and the
//! final response handed back to the user when the planner stops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Whether a dispatched tool returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    ToolError,
}

/// One dispatched action and what came back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Position in the history, starting at 0. Trimming old records
    /// does not renumber the ones that remain.
    pub step: usize,
    pub action_name: String,
    pub args: Map<String, Value>,
    /// Text rendering of the result (or the error description).
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    pub outcome: Outcome,
    pub recorded_at: DateTime<Utc>,
}

/// Decides whether the history so far looks like a finished goal.
pub trait GoalCheck: Send + Sync {
    fn satisfied(&self, records: &[ExecutionRecord]) -> bool;
}

/// Phrases that mark a result as "not there yet".
pub const DEFAULT_DENYLIST: [&str; 4] = ["no matching events", "no emails", "i'm not sure", "error"];

/// Substring heuristic over the latest result.
///
/// Empty history is never satisfied; otherwise the goal counts as reached
/// unless the latest result contains a denylisted phrase (case-insensitive).
#[derive(Debug, Clone)]
pub struct DenylistGoalCheck {
    phrases: Vec<String>,
}

impl DenylistGoalCheck {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(|p| p.into().to_lowercase()).collect(),
        }
    }
}

impl Default for DenylistGoalCheck {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST)
    }
}

impl GoalCheck for DenylistGoalCheck {
    fn satisfied(&self, records: &[ExecutionRecord]) -> bool {
        let Some(last) = records.last() else {
            return false;
        };
        let lowered = last.result.to_lowercase();
        !self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}

/// History of one turn (or of a carried conversation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub turn_id: Uuid,
    user_query: String,
    records: Vec<ExecutionRecord>,
}

impl Context {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            user_query: user_query.into(),
            records: Vec::new(),
        }
    }

    /// Start a new turn on top of the existing history.
    pub fn continue_with(mut self, user_query: impl Into<String>) -> Self {
        self.turn_id = Uuid::new_v4();
        self.user_query = user_query.into();
        self
    }

    pub fn user_query(&self) -> &str {
        &self.user_query
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop the oldest records so at most `max` remain.
    pub fn retain_recent(&mut self, max: usize) {
        let excess = self.records.len().saturating_sub(max);
        self.records.drain(..excess);
    }

    /// Append a record; returns its step index.
    pub fn record(
        &mut self,
        action_name: impl Into<String>,
        args: Map<String, Value>,
        result: impl Into<String>,
        data: Option<Value>,
        outcome: Outcome,
    ) -> usize {
        let step = self.records.last().map_or(0, |r| r.step + 1);
        self.records.push(ExecutionRecord {
            step,
            action_name: action_name.into(),
            args,
            result: result.into(),
            data,
            outcome,
            recorded_at: Utc::now(),
        });
        step
    }

    /// Append a successful `(name, result)` pair with no arguments.
    pub fn update_with_action_result(&mut self, action_name: impl Into<String>, result: impl Into<String>) {
        self.record(action_name, Map::new(), result, None, Outcome::Success);
    }

    /// Most recent `(name, result)`, or `("None", "None")` on empty history.
    pub fn last_action_result(&self) -> (&str, &str) {
        match self.records.last() {
            Some(r) => (r.action_name.as_str(), r.result.as_str()),
            None => ("None", "None"),
        }
    }

    pub fn goal_satisfied(&self) -> bool {
        self.goal_satisfied_with(&DenylistGoalCheck::default())
    }

    pub fn goal_satisfied_with(&self, check: &dyn GoalCheck) -> bool {
        check.satisfied(&self.records)
    }

    /// Deterministic summary of the last result.
    pub fn final_response(&self) -> String {
        match self.records.last() {
            None => "I'm not sure what you wanted to do.".to_string(),
            Some(last) => format!(
                "Based on the last action [{}], here is what I found: {}",
                last.action_name, last.result
            ),
        }
    }

    /// One line per record, for prompts.
    pub fn actions_log(&self) -> String {
        if self.records.is_empty() {
            return "(no actions yet)".to_string();
        }
        self.records
            .iter()
            .map(|r| {
                let status = match r.outcome {
                    Outcome::Success => "ok",
                    Outcome::ToolError => "failed",
                };
                format!(
                    "{}. {}({}) [{}] -> {}",
                    r.step + 1,
                    r.action_name,
                    Value::Object(r.args.clone()),
                    status,
                    r.result
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
