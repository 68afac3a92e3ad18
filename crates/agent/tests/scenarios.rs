//! End-to-end scenarios for the planning loop.
//!
//! Each test wires a scripted planner, a scripted end-turn oracle and real
//! or counting tools into an `Orchestrator`, then checks the response and
//! exactly how many calls each collaborator received.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use toolpilot_agent::{FailureKind, NeverEndTurn, OracleEndTurn, Orchestrator, Session, Termination};
use toolpilot_config::{AppConfig, HistoryMode};
use toolpilot_core::error::{OracleError, ToolError};
use toolpilot_core::{CapabilityRegistry, PlanningOracle, Tool, ToolResult};
use toolpilot_tools::CurrentTimeTool;

// ── Scripted oracle ──────────────────────────────────────────────────────

/// Returns scripted responses in sequence and counts calls.
struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<String, OracleError>>>,
    call_count: Mutex<usize>,
}

impl ScriptedOracle {
    fn new(responses: Vec<Result<String, OracleError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            call_count: Mutex::new(0),
        }
    }

    fn texts(texts: &[&str]) -> Arc<Self> {
        Arc::new(Self::new(texts.iter().map(|t| Ok(t.to_string())).collect()))
    }

    fn calls(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl PlanningOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn plan(&self, _prompt: &str) -> Result<String, OracleError> {
        *self.call_count.lock().unwrap() += 1;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedOracle: no more responses")
    }
}

// ── Tools ────────────────────────────────────────────────────────────────

/// Counts invocations and returns a fixed answer.
struct CountingTool {
    name: &'static str,
    output: &'static str,
    calls: Arc<Mutex<usize>>,
}

#[async_trait::async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        self.name
    }
    fn description(&self) -> &str {
        "Searches the calendar"
    }
    async fn execute(&self, _args: Map<String, Value>) -> Result<ToolResult, ToolError> {
        *self.calls.lock().unwrap() += 1;
        Ok(ToolResult::text(self.output))
    }
}

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 10, 30, 0).unwrap()
}

fn time_registry() -> Arc<CapabilityRegistry> {
    let registry = CapabilityRegistry::new()
        .with(Box::new(CurrentTimeTool::with_clock(fixed_clock)))
        .unwrap();
    Arc::new(registry)
}

fn calendar_registry(calls: Arc<Mutex<usize>>) -> Arc<CapabilityRegistry> {
    let registry = CapabilityRegistry::new()
        .with(Box::new(CountingTool {
            name: "calendar_scan",
            output: "No matching events found",
            calls,
        }))
        .unwrap()
        .with(Box::new(CurrentTimeTool::with_clock(fixed_clock)))
        .unwrap();
    Arc::new(registry)
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn tool_call_then_end_turn_oracle_says_yes() {
    let planner = ScriptedOracle::texts(&[r#"{"action":"get_current_time","args":{}}"#]);
    let judge = ScriptedOracle::texts(&["yes"]);

    let orchestrator = Orchestrator::new(planner.clone(), time_registry())
        .with_end_turn(Arc::new(OracleEndTurn::new(judge.clone())));
    let report = orchestrator.run_turn("what day is it?", None).await;

    assert_eq!(planner.calls(), 1);
    assert_eq!(report.dispatches, 1);
    assert_eq!(judge.calls(), 1);
    assert_eq!(report.termination, Termination::GoalReached);
    assert!(report.response.starts_with("Based on the last action [get_current_time]"));
    assert!(report.response.contains("2025-05-01 10:30:00 (Thursday)"));
}

#[tokio::test]
async fn direct_answer_is_returned_immediately() {
    let planner = ScriptedOracle::texts(&[r#"{"action":"LLM_ANSWER","args":{"response":"Hi there!"}}"#]);
    let judge = ScriptedOracle::texts(&[]);

    let orchestrator = Orchestrator::new(planner.clone(), time_registry())
        .with_end_turn(Arc::new(OracleEndTurn::new(judge.clone())));
    let report = orchestrator.run_turn("hello", None).await;

    assert_eq!(report.response, "Hi there!");
    assert_eq!(report.dispatches, 0);
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn unparseable_twice_apologizes_after_two_calls() {
    let planner = ScriptedOracle::texts(&["Sure! Let me check the time.", "I think get_current_time"]);
    let calls = Arc::new(Mutex::new(0));

    let orchestrator = Orchestrator::new(planner.clone(), calendar_registry(calls.clone()))
        .with_end_turn(Arc::new(NeverEndTurn));
    let response = orchestrator.respond("what day is it?").await;

    assert_eq!(
        response,
        "I'm sorry, I could not understand the plan to fulfill your request."
    );
    assert_eq!(planner.calls(), 2);
    assert_eq!(*calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn unknown_action_is_repaired_and_dispatched() {
    let planner = ScriptedOracle::texts(&[
        r#"{"action":"calendar_lookup","args":{"query":"trip"}}"#,
        r#"{"action":"calendar_scan","args":{"query":"trip"}}"#,
    ]);
    let judge = ScriptedOracle::texts(&["yes"]);
    let calls = Arc::new(Mutex::new(0));

    let orchestrator = Orchestrator::new(planner.clone(), calendar_registry(calls.clone()))
        .with_end_turn(Arc::new(OracleEndTurn::new(judge)));
    let report = orchestrator.run_turn("do I have a trip planned?", None).await;

    assert_eq!(planner.calls(), 2);
    assert_eq!(report.planner_calls, 2);
    assert_eq!(*calls.lock().unwrap(), 1);
    assert_eq!(report.context.records()[0].action_name, "calendar_scan");
}

#[tokio::test]
async fn budget_exhausted_after_max_steps() {
    let planner = ScriptedOracle::texts(&[r#"{"action":"calendar_scan","args":{"query":"trip"}}"#; 3]);
    let judge = ScriptedOracle::texts(&["no", "no", "no"]);
    let calls = Arc::new(Mutex::new(0));

    let orchestrator = Orchestrator::new(planner.clone(), calendar_registry(calls.clone()))
        .with_max_steps(3)
        .with_end_turn(Arc::new(OracleEndTurn::new(judge.clone())));
    let report = orchestrator.run_turn("plan my trip", None).await;

    assert_eq!(*calls.lock().unwrap(), 3);
    assert_eq!(report.dispatches, 3);
    assert_eq!(judge.calls(), 3);
    assert_eq!(report.termination, Termination::BudgetExhausted);
    assert_eq!(
        report.response,
        "Based on the last action [calendar_scan], here is what I found: No matching events found"
    );
}

#[tokio::test]
async fn unreachable_planner_apologizes() {
    let planner = Arc::new(ScriptedOracle::new(vec![Err(OracleError::Network(
        "connection refused".into(),
    ))]));
    let orchestrator = Orchestrator::new(planner, time_registry());
    let report = orchestrator.run_turn("what day is it?", None).await;

    assert!(matches!(
        report.termination,
        Termination::Failed(FailureKind::OracleUnavailable(_))
    ));
    assert_eq!(report.dispatches, 0);
}

#[tokio::test]
async fn configured_orchestrator_with_heuristic_end_turn() {
    let config: AppConfig = toml::from_str(
        r#"
        [agent]
        max_steps = 4
        end_turn = "heuristic"
        enable_meta_query = false
        "#,
    )
    .unwrap();

    let planner = ScriptedOracle::texts(&[
        r#"{"action":"calendar_scan","args":{"query":"trip"}}"#,
        r#"{"action":"get_current_time"}"#,
    ]);
    let calls = Arc::new(Mutex::new(0));
    let orchestrator =
        Orchestrator::from_config(&config.agent, planner.clone(), calendar_registry(calls));
    let report = orchestrator.run_turn("when is my trip?", None).await;

    // "No matching events" keeps the heuristic unsatisfied; the time result ends it.
    assert_eq!(report.dispatches, 2);
    assert_eq!(report.termination, Termination::GoalReached);
    assert_eq!(planner.calls(), 2);
}

#[tokio::test]
async fn carried_session_sees_previous_turn() {
    let planner = ScriptedOracle::texts(&[
        r#"{"action":"get_current_time"}"#,
        r#"{"action":"END_TURN"}"#,
    ]);
    let orchestrator = Arc::new(
        Orchestrator::new(planner, time_registry()).with_end_turn(Arc::new(toolpilot_agent::HeuristicEndTurn::default())),
    );
    let mut session = Session::new(orchestrator, HistoryMode::Carry);

    let first = session.ask("what day is it?").await;
    let second = session.ask("say that again").await;

    assert!(first.contains("Thursday"));
    assert_eq!(first, second);
}

#[tokio::test]
async fn configured_session_carries_history() {
    let config: AppConfig = toml::from_str(
        r#"
        [agent]
        end_turn = "heuristic"
        history = "carry"
        "#,
    )
    .unwrap();

    let planner = ScriptedOracle::texts(&[
        r#"{"action":"get_current_time"}"#,
        r#"{"action":"END_TURN"}"#,
    ]);
    let orchestrator = Arc::new(Orchestrator::from_config(
        &config.agent,
        planner.clone(),
        time_registry(),
    ));
    let mut session = Session::from_config(&config.agent, orchestrator);

    let first = session.ask("what day is it?").await;
    let second = session.turn("say that again").await;

    assert_eq!(second.termination, Termination::EndTurn);
    assert_eq!(second.context.len(), 1);
    assert_eq!(second.context.records()[0].action_name, "get_current_time");
    assert_eq!(second.response, first);
    assert_eq!(planner.calls(), 2);
}
