//! Error types for the toolpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; only oracle, plan and
//! validation failures are ever surfaced to the user of a turn.

use thiserror::Error;

/// The top-level error type for toolpilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Planning oracle errors ---
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    // --- Planner output errors ---
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure to obtain text from a planning oracle.
///
/// Every variant is fatal to the turn that triggered it: the loop never
/// retries the oracle on its own.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by oracle, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Oracle returned no completion")]
    EmptyResponse,

    #[error("Oracle not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

/// Planner output that cannot be turned into a vocabulary action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Malformed plan: {reason}")]
    Malformed { reason: String },

    #[error("Invalid action: {name}")]
    InvalidAction { name: String },
}

impl PlanError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool panicked: {0}")]
    Panicked(String),

    #[error("Name is reserved for a control action: {0}")]
    ReservedName(String),
}
