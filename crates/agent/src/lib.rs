//! The planning loop: the heart of toolpilot.
//!
//! A turn follows a **Plan → Dispatch → Check** cycle:
//!
//! 1. **Plan**: ask the oracle for one JSON action (step 0 gets the full
//!    instructions, later steps a reflection on the last result)
//! 2. **Parse & validate**: malformed output or unknown actions get one
//!    corrective prompt, then the turn fails with a fixed apology
//! 3. **Control actions** (`END_TURN`, `LLM_ANSWER`, `REQUEST_CLARIFICATION`,
//!    `META_QUERY`) end the turn without touching a tool
//! 4. **Dispatch**: run the tool; errors and panics become results
//! 5. **Check**: the end-turn policy decides whether to stop; otherwise loop
//!
//! The loop stops at the step budget at the latest.

pub mod dispatcher;
pub mod end_turn;
pub mod loop_runner;
pub mod meta;
pub mod parser;
pub mod prompts;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use dispatcher::{Invocation, ToolDispatcher};
pub use end_turn::{EndTurnPolicy, HeuristicEndTurn, NeverEndTurn, OracleEndTurn, is_affirmative, policy_for};
pub use loop_runner::{Orchestrator, Termination, TurnReport};
pub use meta::MetaCapability;
pub use parser::{FailureKind, PlanResolver, Resolved, RoundFailure, parse_action, parse_actions_bulk};
pub use prompts::{PlanningExample, PromptBuilder, default_examples};
pub use session::Session;
