//! The bounded planning loop.

use std::sync::Arc;
use toolpilot_config::LoopConfig;
use toolpilot_core::action::{Action, ActionVocabulary, ControlAction};
use toolpilot_core::context::Context;
use toolpilot_core::oracle::PlanningOracle;
use toolpilot_core::tool::CapabilityRegistry;
use tracing::{debug, error, info, warn};

use crate::dispatcher::ToolDispatcher;
use crate::end_turn::{EndTurnPolicy, OracleEndTurn, policy_for};
use crate::meta::MetaCapability;
use crate::parser::{FailureKind, PlanResolver, parse_actions_bulk};
use crate::prompts::{PlanningExample, PromptBuilder, default_examples};

const ANSWER_FALLBACK: &str = "I'm not sure how to answer that.";
const CLARIFY_FALLBACK: &str = "Can you clarify what you mean?";

/// Why a turn stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The planner chose END_TURN.
    EndTurn,
    /// The planner answered directly (LLM_ANSWER).
    Answered,
    /// The planner asked the user a question.
    Clarification,
    /// The planner asked for a capability description.
    MetaAnswer,
    /// The end-turn policy said the results are enough.
    GoalReached,
    /// The step budget ran out.
    BudgetExhausted,
    /// The turn failed; the response is a fixed apology.
    Failed(FailureKind),
}

/// Outcome of one turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// The text handed back to the user.
    pub response: String,
    /// The turn's history (including any carried records).
    pub context: Context,
    pub termination: Termination,
    /// Planning rounds started.
    pub steps: usize,
    /// Oracle calls made for planning, repairs included.
    pub planner_calls: usize,
    /// Tool dispatches made.
    pub dispatches: usize,
}

#[derive(Default)]
struct Counters {
    steps: usize,
    planner_calls: usize,
    dispatches: usize,
}

/// Drives the planner → dispatch → end-turn cycle for one query at a time.
///
/// The orchestrator holds no per-turn state, so one instance may serve
/// several concurrent turns.
pub struct Orchestrator {
    /// Planning oracle.
    oracle: Arc<dyn PlanningOracle>,
    /// Dispatcher over the shared registry.
    dispatcher: ToolDispatcher,
    /// Consulted after every dispatch.
    end_turn: Arc<dyn EndTurnPolicy>,
    /// Worked examples for the step-0 prompt.
    examples: Vec<PlanningExample>,
    /// Maximum planning rounds per turn.
    max_steps: usize,
    enable_meta_query: bool,
    enable_clarification: bool,
    strict_validation: bool,
}

impl Orchestrator {
    /// Create an orchestrator with default settings.
    ///
    /// The end-turn policy asks the same oracle used for planning.
    pub fn new(oracle: Arc<dyn PlanningOracle>, registry: Arc<CapabilityRegistry>) -> Self {
        Self {
            end_turn: Arc::new(OracleEndTurn::new(Arc::clone(&oracle))),
            oracle,
            dispatcher: ToolDispatcher::new(registry),
            examples: default_examples(),
            max_steps: 8,
            enable_meta_query: true,
            enable_clarification: true,
            strict_validation: true,
        }
    }

    /// Create an orchestrator from the `[agent]` section.
    pub fn from_config(
        config: &LoopConfig,
        oracle: Arc<dyn PlanningOracle>,
        registry: Arc<CapabilityRegistry>,
    ) -> Self {
        let examples = if config.examples.is_empty() {
            default_examples()
        } else {
            config.examples.iter().map(PlanningExample::from).collect()
        };
        let end_turn = policy_for(config.end_turn, Arc::clone(&oracle));

        Self::new(oracle, registry)
            .with_max_steps(config.max_steps)
            .with_meta_query(config.enable_meta_query)
            .with_clarification(config.enable_clarification)
            .with_strict_validation(config.strict_validation)
            .with_examples(examples)
            .with_end_turn(end_turn)
    }

    /// Set the maximum number of planning rounds per turn.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_end_turn(mut self, policy: Arc<dyn EndTurnPolicy>) -> Self {
        self.end_turn = policy;
        self
    }

    pub fn with_meta_query(mut self, enabled: bool) -> Self {
        self.enable_meta_query = enabled;
        self
    }

    pub fn with_clarification(mut self, enabled: bool) -> Self {
        self.enable_clarification = enabled;
        self
    }

    /// When disabled, unknown action names go straight to the dispatcher.
    pub fn with_strict_validation(mut self, enabled: bool) -> Self {
        self.strict_validation = enabled;
        self
    }

    pub fn with_examples(mut self, examples: Vec<PlanningExample>) -> Self {
        self.examples = examples;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Registered tools plus the enabled control actions.
    pub fn vocabulary(&self) -> ActionVocabulary {
        let mut controls = vec![ControlAction::EndTurn, ControlAction::LlmAnswer];
        if self.enable_clarification {
            controls.push(ControlAction::RequestClarification);
        }
        if self.enable_meta_query {
            controls.push(ControlAction::MetaQuery);
        }
        ActionVocabulary::new(self.dispatcher.registry().names(), controls)
    }

    /// Run a turn and return only the response text.
    pub async fn respond(&self, query: &str) -> String {
        self.run_turn(query, None).await.response
    }

    /// Run one turn, optionally on top of a carried context.
    pub async fn run_turn(&self, query: &str, carried: Option<Context>) -> TurnReport {
        let mut context = match carried {
            Some(previous) => previous.continue_with(query),
            None => Context::new(query),
        };

        info!(
            turn_id = %context.turn_id,
            carried_records = context.len(),
            max_steps = self.max_steps,
            "Starting turn"
        );

        let vocabulary = self.vocabulary();
        let definitions = self.dispatcher.registry().definitions();
        let prompts = PromptBuilder::new(&vocabulary, &definitions, &self.examples);
        let resolver = PlanResolver::new(self.oracle.as_ref(), &prompts, &vocabulary)
            .with_strict_validation(self.strict_validation);

        let mut counters = Counters::default();
        let mut step = 0;

        let (termination, action) = loop {
            if step >= self.max_steps {
                warn!(turn_id = %context.turn_id, step, "Step budget exhausted");
                break (Termination::BudgetExhausted, None);
            }
            counters.steps += 1;

            let prompt = if step == 0 {
                prompts.initial(query, &context)
            } else {
                let (last_action, last_result) = context.last_action_result();
                prompts.reflection(query, last_action, last_result)
            };

            let action = match resolver.resolve(query, &prompt).await {
                Ok(resolved) => {
                    counters.planner_calls += resolved.oracle_calls;
                    resolved.action
                }
                Err(failure) => {
                    counters.planner_calls += failure.oracle_calls;
                    break (Termination::Failed(failure.kind), None);
                }
            };

            debug!(turn_id = %context.turn_id, step, action = %action, "Planner chose action");

            // Disabled controls fall through to dispatch as unknown tools.
            let control = action.control().filter(|c| vocabulary.allows(*c));
            if let Some(control) = control {
                info!(turn_id = %context.turn_id, step, %control, "Planner chose control action");
            }
            match control {
                Some(ControlAction::EndTurn) => break (Termination::EndTurn, None),
                Some(ControlAction::LlmAnswer) => break (Termination::Answered, Some(action)),
                Some(ControlAction::RequestClarification) => {
                    break (Termination::Clarification, Some(action));
                }
                Some(ControlAction::MetaQuery) => break (Termination::MetaAnswer, Some(action)),
                None => {}
            }

            self.dispatcher.dispatch(&action, &mut context).await;
            counters.dispatches += 1;

            if self.end_turn.should_end_turn(query, &context).await {
                break (Termination::GoalReached, None);
            }
            step += 1;
        };

        if let Termination::Failed(kind) = &termination {
            error!(turn_id = %context.turn_id, failure = ?kind, "Turn failed");
        }

        let response = match (&termination, action) {
            (Termination::Failed(kind), _) => kind.apology().to_string(),
            (Termination::Answered, Some(a)) => {
                a.str_arg("response").unwrap_or_else(|| ANSWER_FALLBACK.to_string())
            }
            (Termination::Clarification, Some(a)) => {
                a.str_arg("question").unwrap_or_else(|| CLARIFY_FALLBACK.to_string())
            }
            (Termination::MetaAnswer, Some(a)) => self.describe_capabilities(query, &a),
            _ => context.final_response(),
        };

        info!(
            turn_id = %context.turn_id,
            termination = ?termination,
            steps = counters.steps,
            planner_calls = counters.planner_calls,
            dispatches = counters.dispatches,
            "Turn finished"
        );

        TurnReport {
            response,
            context,
            termination,
            steps: counters.steps,
            planner_calls: counters.planner_calls,
            dispatches: counters.dispatches,
        }
    }

    fn describe_capabilities(&self, query: &str, action: &Action) -> String {
        let question = action.str_arg("query").unwrap_or_else(|| query.to_string());
        MetaCapability::new(self.dispatcher.registry()).describe(&question)
    }

    /// Director mode: plan every action up front, then dispatch them in order.
    ///
    /// Lines naming control or unknown actions are skipped. There is no
    /// repair and no end-turn consult.
    pub async fn run_bulk(&self, query: &str) -> TurnReport {
        let mut context = Context::new(query);
        info!(turn_id = %context.turn_id, "Starting bulk turn");

        let vocabulary = self.vocabulary();
        let definitions = self.dispatcher.registry().definitions();
        let prompts = PromptBuilder::new(&vocabulary, &definitions, &self.examples);

        let mut counters = Counters {
            planner_calls: 1,
            ..Counters::default()
        };

        let raw = match self.oracle.plan(&prompts.bulk(query)).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(turn_id = %context.turn_id, error = %e, "Bulk planning failed");
                let kind = FailureKind::OracleUnavailable(e.to_string());
                return TurnReport {
                    response: kind.apology().to_string(),
                    context,
                    termination: Termination::Failed(kind),
                    steps: 0,
                    planner_calls: counters.planner_calls,
                    dispatches: 0,
                };
            }
        };

        let mut termination = Termination::EndTurn;
        for action in parse_actions_bulk(&raw) {
            if action.control().is_some() {
                debug!(action = %action.name, "Skipping control action in bulk plan");
                continue;
            }
            if !vocabulary.contains(&action.name) {
                warn!(action = %action.name, "Skipping unknown action in bulk plan");
                continue;
            }
            if counters.dispatches >= self.max_steps {
                warn!(turn_id = %context.turn_id, "Bulk plan truncated at step budget");
                termination = Termination::BudgetExhausted;
                break;
            }
            self.dispatcher.dispatch(&action, &mut context).await;
            counters.dispatches += 1;
        }
        counters.steps = counters.dispatches;

        info!(
            turn_id = %context.turn_id,
            dispatches = counters.dispatches,
            "Bulk turn finished"
        );

        TurnReport {
            response: context.final_response(),
            context,
            termination,
            steps: counters.steps,
            planner_calls: counters.planner_calls,
            dispatches: counters.dispatches,
        }
    }
}
