//! Planner output parsing and the one-shot repair protocol.
//!
//! The planner is asked for exactly one JSON object per round:
//!
//! ```text
//! {"action": "<name>", "args": {...}}
//! ```
//!
//! [`parse_action`] turns raw text into an [`Action`] or a
//! [`PlanError::Malformed`]. [`PlanResolver`] wraps one planning round:
//! it calls the oracle, parses, validates against the vocabulary, and on
//! failure issues at most one corrective prompt before giving up.

use serde_json::{Map, Value};
use toolpilot_core::action::{Action, ActionVocabulary};
use toolpilot_core::error::PlanError;
use toolpilot_core::oracle::PlanningOracle;
use tracing::{debug, warn};

use crate::prompts::PromptBuilder;

/// Parse one planner response.
///
/// The trimmed text must be a JSON object whose `action` is a string.
/// `args` may be an object, `null`, or missing (both mean no arguments).
/// Whether the name is in the vocabulary is not checked here.
pub fn parse_action(raw: &str) -> Result<Action, PlanError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| PlanError::malformed(format!("not valid JSON: {e}")))?;

    let Value::Object(mut object) = value else {
        return Err(PlanError::malformed("expected a JSON object"));
    };

    let name = match object.remove("action") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(PlanError::malformed("'action' must be a string")),
        None => return Err(PlanError::malformed("missing 'action'")),
    };

    let args = match object.remove("args") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(args)) => args,
        Some(_) => return Err(PlanError::malformed("'args' must be an object")),
    };

    Ok(Action::new(name, args))
}

/// Parse a director-mode plan: one JSON object per line.
///
/// Blank and unparseable lines are skipped with a warning.
pub fn parse_actions_bulk(raw: &str) -> Vec<Action> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match parse_action(line) {
            Ok(action) => Some(action),
            Err(e) => {
                warn!(line, error = %e, "Skipping unparseable plan line");
                None
            }
        })
        .collect()
}

/// Why a planning round produced no action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The output was still not valid JSON after the parse repair.
    Unparseable,
    /// The planner kept naming actions outside the vocabulary.
    NoValidAction,
    /// The oracle itself failed.
    OracleUnavailable(String),
}

impl FailureKind {
    /// The fixed message returned to the user.
    pub fn apology(&self) -> &'static str {
        match self {
            FailureKind::Unparseable => {
                "I'm sorry, I could not understand the plan to fulfill your request."
            }
            FailureKind::NoValidAction => {
                "I'm sorry, the system could not find a valid way to fulfill your request."
            }
            FailureKind::OracleUnavailable(_) => {
                "I'm sorry, I could not reach the planning service to fulfill your request."
            }
        }
    }
}

/// A validated action and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub action: Action,
    /// Oracle calls spent in this round (1 or 2).
    pub oracle_calls: usize,
}

/// A failed round and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundFailure {
    pub kind: FailureKind,
    pub oracle_calls: usize,
}

/// Resolves one planning round into a validated action.
pub struct PlanResolver<'a> {
    oracle: &'a dyn PlanningOracle,
    prompts: &'a PromptBuilder<'a>,
    vocabulary: &'a ActionVocabulary,
    strict: bool,
}

impl<'a> PlanResolver<'a> {
    pub fn new(
        oracle: &'a dyn PlanningOracle,
        prompts: &'a PromptBuilder<'a>,
        vocabulary: &'a ActionVocabulary,
    ) -> Self {
        Self {
            oracle,
            prompts,
            vocabulary,
            strict: true,
        }
    }

    /// With `strict == false`, unknown names are passed through to the
    /// dispatcher instead of triggering the action repair.
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn is_acceptable(&self, action: &Action) -> bool {
        !self.strict || self.vocabulary.validate(action).is_ok()
    }

    async fn ask(&self, prompt: &str, calls: &mut usize) -> Result<String, RoundFailure> {
        *calls += 1;
        debug!(oracle = self.oracle.name(), call = *calls, prompt, "Consulting planner");
        let text = self.oracle.plan(prompt).await.map_err(|e| {
            warn!(oracle = self.oracle.name(), error = %e, "Planning oracle failed");
            RoundFailure {
                kind: FailureKind::OracleUnavailable(e.to_string()),
                oracle_calls: *calls,
            }
        })?;
        debug!(raw = %text.trim(), "Planner responded");
        Ok(text)
    }

    /// Run one round: plan, parse, validate, and repair at most once.
    pub async fn resolve(&self, query: &str, prompt: &str) -> Result<Resolved, RoundFailure> {
        let mut calls = 0;
        let raw = self.ask(prompt, &mut calls).await?;

        let fail = |kind: FailureKind, calls: usize| RoundFailure {
            kind,
            oracle_calls: calls,
        };

        match parse_action(&raw) {
            Err(e) => {
                warn!(error = %e, "Planner output was malformed, requesting repair");
                let retry = self.ask(&self.prompts.parse_repair(query), &mut calls).await?;
                match parse_action(&retry) {
                    Ok(action) if self.is_acceptable(&action) => Ok(Resolved {
                        action,
                        oracle_calls: calls,
                    }),
                    Ok(action) => {
                        warn!(action = %action.name, "Repaired plan names an unknown action");
                        Err(fail(FailureKind::NoValidAction, calls))
                    }
                    Err(e) => {
                        warn!(error = %e, "Repaired plan still malformed");
                        Err(fail(FailureKind::Unparseable, calls))
                    }
                }
            }
            Ok(action) if self.is_acceptable(&action) => Ok(Resolved {
                action,
                oracle_calls: calls,
            }),
            Ok(action) => {
                warn!(action = %action.name, "Planner chose an unknown action, requesting repair");
                let retry = self
                    .ask(&self.prompts.action_repair(query, &action.name), &mut calls)
                    .await?;
                match parse_action(&retry) {
                    Ok(action) if self.vocabulary.validate(&action).is_ok() => Ok(Resolved {
                        action,
                        oracle_calls: calls,
                    }),
                    _ => {
                        warn!("Repaired plan did not name a valid action");
                        Err(fail(FailureKind::NoValidAction, calls))
                    }
                }
            }
        }
    }
}
