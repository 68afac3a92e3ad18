//! # toolpilot core
//!
//! Domain types, traits, and error definitions for the toolpilot planning
//! loop. This crate has **no framework dependencies**: it defines the model
//! every other crate implements against.
//!
//! Each collaborator of the loop is a trait here (tools, the planning
//! oracle, the goal heuristic), so implementations can be swapped through
//! configuration and replaced by scripted stand-ins in tests.

pub mod action;
pub mod context;
pub mod error;
pub mod oracle;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use action::{Action, ActionVocabulary, ControlAction};
pub use context::{Context, DenylistGoalCheck, ExecutionRecord, GoalCheck, Outcome};
pub use error::{Error, OracleError, PlanError, Result, ToolError};
pub use oracle::PlanningOracle;
pub use tool::{CapabilityRegistry, Tool, ToolDefinition, ToolResult};
