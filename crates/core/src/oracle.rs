//! Planning oracle: the text-in, text-out planner the loop consults.
//!
//! Implementations: OpenAI-compatible endpoints (Ollama, OpenAI, OpenRouter)
//! in `toolpilot-providers`, scripted oracles in tests.

use async_trait::async_trait;
use crate::error::OracleError;

/// Stateless planner: one prompt in, raw text out.
///
/// Implementations must not retry internally; repair of bad output is the
/// parser's job, and transport failures end the turn.
#[async_trait]
pub trait PlanningOracle: Send + Sync {
    /// A short name for logs (e.g., "ollama").
    fn name(&self) -> &str;

    async fn plan(&self, prompt: &str) -> std::result::Result<String, OracleError>;
}
