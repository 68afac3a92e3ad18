//! Actions: the closed vocabulary the planner may choose from.
//!
//! An [`Action`] is either one of the reserved control actions, which the
//! orchestration loop handles itself, or the name of a registered tool.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

use crate::error::PlanError;

/// A `(name, args)` instruction derived from planner output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Tool or control name.
    pub name: String,

    /// Keyword arguments for the tool.
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl Action {
    pub fn new(name: impl Into<String>, args: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// An action with no arguments.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, Map::new())
    }

    /// The control action this names, if any.
    pub fn control(&self) -> Option<ControlAction> {
        ControlAction::from_name(&self.name)
    }

    /// Read a string argument. Non-string values are rendered as JSON.
    pub fn str_arg(&self, key: &str) -> Option<String> {
        match self.args.get(key)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Render in the single-line wire format.
    pub fn to_wire(&self) -> String {
        serde_json::json!({ "action": self.name, "args": self.args }).to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, Value::Object(self.args.clone()))
    }
}

/// Reserved names the loop intercepts before dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlAction {
    /// Stop and synthesize the final response from history.
    EndTurn,
    /// Answer directly with `args.response`.
    LlmAnswer,
    /// Ask the user `args.question`.
    RequestClarification,
    /// Describe the system's own capabilities.
    MetaQuery,
}

impl ControlAction {
    pub const ALL: [ControlAction; 4] = [
        ControlAction::EndTurn,
        ControlAction::LlmAnswer,
        ControlAction::RequestClarification,
        ControlAction::MetaQuery,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::EndTurn => "END_TURN",
            ControlAction::LlmAnswer => "LLM_ANSWER",
            ControlAction::RequestClarification => "REQUEST_CLARIFICATION",
            ControlAction::MetaQuery => "META_QUERY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    pub fn is_reserved(name: &str) -> bool {
        Self::from_name(name).is_some()
    }
}

impl fmt::Display for ControlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of action names permitted during one turn.
///
/// Built from the registered tool names plus the enabled control actions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionVocabulary {
    tools: BTreeSet<String>,
    controls: BTreeSet<ControlAction>,
}

impl ActionVocabulary {
    pub fn new<I, S>(tool_names: I, controls: impl IntoIterator<Item = ControlAction>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tools: tool_names.into_iter().map(Into::into).collect(),
            controls: controls.into_iter().collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        match ControlAction::from_name(name) {
            Some(control) => self.controls.contains(&control),
            None => self.tools.contains(name),
        }
    }

    pub fn allows(&self, control: ControlAction) -> bool {
        self.controls.contains(&control)
    }

    /// Check an action against the vocabulary.
    pub fn validate(&self, action: &Action) -> std::result::Result<(), PlanError> {
        if self.contains(&action.name) {
            Ok(())
        } else {
            Err(PlanError::InvalidAction {
                name: action.name.clone(),
            })
        }
    }

    /// Registered tool names, sorted.
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(String::as_str)
    }

    pub fn controls(&self) -> impl Iterator<Item = ControlAction> + '_ {
        self.controls.iter().copied()
    }

    /// Every permitted name, tools first.
    pub fn names(&self) -> Vec<&str> {
        self.tool_names()
            .chain(self.controls.iter().map(|c| c.as_str()))
            .collect()
    }
}
