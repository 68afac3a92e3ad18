//! End-turn policies: after each dispatch, decide whether to stop.

use async_trait::async_trait;
use std::sync::Arc;
use toolpilot_config::EndTurnMode;
use toolpilot_core::context::{Context, DenylistGoalCheck, GoalCheck};
use toolpilot_core::oracle::PlanningOracle;
use tracing::{debug, warn};

use crate::prompts::end_turn_prompt;

/// Consulted once after every dispatch.
#[async_trait]
pub trait EndTurnPolicy: Send + Sync {
    async fn should_end_turn(&self, user_query: &str, context: &Context) -> bool;
}

/// `true` for answers like `yes`, `"Yes."` or ` YES! `.
pub fn is_affirmative(answer: &str) -> bool {
    let cleaned = answer
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim();
    cleaned.eq_ignore_ascii_case("yes")
}

/// Asks an oracle whether the gathered results answer the query.
pub struct OracleEndTurn {
    oracle: Arc<dyn PlanningOracle>,
    fallback: Box<dyn GoalCheck>,
}

impl OracleEndTurn {
    pub fn new(oracle: Arc<dyn PlanningOracle>) -> Self {
        Self {
            oracle,
            fallback: Box::new(DenylistGoalCheck::default()),
        }
    }

    /// Goal check used when the oracle cannot be reached.
    pub fn with_fallback(mut self, check: Box<dyn GoalCheck>) -> Self {
        self.fallback = check;
        self
    }
}

#[async_trait]
impl EndTurnPolicy for OracleEndTurn {
    async fn should_end_turn(&self, user_query: &str, context: &Context) -> bool {
        match self.oracle.plan(&end_turn_prompt(user_query, context)).await {
            Ok(answer) => {
                let done = is_affirmative(&answer);
                debug!(answer = %answer.trim(), done, "End-turn oracle answered");
                done
            }
            Err(e) => {
                warn!(error = %e, "End-turn oracle failed, falling back to goal heuristic");
                context.goal_satisfied_with(self.fallback.as_ref())
            }
        }
    }
}

/// Ends the turn when the goal check is satisfied.
pub struct HeuristicEndTurn {
    check: Box<dyn GoalCheck>,
}

impl HeuristicEndTurn {
    pub fn new(check: Box<dyn GoalCheck>) -> Self {
        Self { check }
    }
}

impl Default for HeuristicEndTurn {
    fn default() -> Self {
        Self::new(Box::new(DenylistGoalCheck::default()))
    }
}

#[async_trait]
impl EndTurnPolicy for HeuristicEndTurn {
    async fn should_end_turn(&self, _user_query: &str, context: &Context) -> bool {
        context.goal_satisfied_with(self.check.as_ref())
    }
}

/// Never ends the turn; the planner's END_TURN or the budget does.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverEndTurn;

#[async_trait]
impl EndTurnPolicy for NeverEndTurn {
    async fn should_end_turn(&self, _user_query: &str, _context: &Context) -> bool {
        false
    }
}

/// The policy selected by `[agent] end_turn`.
pub fn policy_for(mode: EndTurnMode, oracle: Arc<dyn PlanningOracle>) -> Arc<dyn EndTurnPolicy> {
    match mode {
        EndTurnMode::Oracle => Arc::new(OracleEndTurn::new(oracle)),
        EndTurnMode::Heuristic => Arc::new(HeuristicEndTurn::default()),
        EndTurnMode::Never => Arc::new(NeverEndTurn),
    }
}
