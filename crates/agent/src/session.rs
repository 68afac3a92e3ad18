//! Multi-turn sessions.

use std::sync::Arc;
use toolpilot_config::{HistoryMode, LoopConfig};
use toolpilot_core::context::Context;
use tracing::debug;

use crate::loop_runner::{Orchestrator, TurnReport};

/// A conversation with one user, applying the configured history mode.
///
/// In `per_turn` mode every query starts from an empty context; in `carry`
/// mode the previous turn's records are handed to the next turn, oldest
/// first out once more than `max_history` are held. The step budget
/// restarts with every turn either way.
pub struct Session {
    orchestrator: Arc<Orchestrator>,
    mode: HistoryMode,
    max_history: usize,
    last: Option<TurnReport>,
    turns: usize,
}

impl Session {
    pub fn new(orchestrator: Arc<Orchestrator>, mode: HistoryMode) -> Self {
        Self {
            orchestrator,
            mode,
            max_history: LoopConfig::default().max_history_records,
            last: None,
            turns: 0,
        }
    }

    /// Session using `[agent] history` and `max_history_records`.
    pub fn from_config(config: &LoopConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self::new(orchestrator, config.history).with_max_history(config.max_history_records)
    }

    /// Cap on records carried into the next turn.
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    /// Run a turn and return the full report.
    pub async fn turn(&mut self, query: &str) -> &TurnReport {
        let previous = self.last.take();
        let carried = match self.mode {
            HistoryMode::Carry => previous.map(|report| {
                let mut context = report.context;
                context.retain_recent(self.max_history);
                debug!(records = context.len(), "Carrying history into turn");
                context
            }),
            HistoryMode::PerTurn => None,
        };

        let report = self.orchestrator.run_turn(query, carried).await;
        self.turns += 1;
        self.last.insert(report)
    }

    /// Run a turn and return only the response text.
    pub async fn ask(&mut self, query: &str) -> String {
        self.turn(query).await.response.clone()
    }

    /// Records the next turn starts from, before the cap is applied.
    pub fn history(&self) -> Option<&Context> {
        match self.mode {
            HistoryMode::Carry => self.last.as_ref().map(|report| &report.context),
            HistoryMode::PerTurn => None,
        }
    }

    pub fn turns(&self) -> usize {
        self.turns
    }

    /// Forget carried history.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
