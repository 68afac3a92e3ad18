//! Prompt templates for the planning oracle.
//!
//! Every prompt asks for the same single-line JSON wire format; they differ
//! in how much instruction and history they carry:
//!
//! | Prompt | When |
//! |---|---|
//! | [`PromptBuilder::initial`] | step 0: instructions, action catalogue, worked examples |
//! | [`PromptBuilder::reflection`] | step > 0: last action and result, original goal |
//! | [`PromptBuilder::parse_repair`] | planner output was not valid JSON |
//! | [`PromptBuilder::action_repair`] | planner named an action that does not exist |
//! | [`PromptBuilder::bulk`] | director mode: several actions, one per line |
//! | [`end_turn_prompt`] | yes/no "have we got enough?" question |

use serde_json::{Map, Value};
use toolpilot_config::ExampleConfig;
use toolpilot_core::action::{Action, ActionVocabulary, ControlAction};
use toolpilot_core::context::Context;
use toolpilot_core::tool::ToolDefinition;

/// A worked example: what the planner should answer for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanningExample {
    pub query: String,
    pub action: Action,
}

impl PlanningExample {
    pub fn new(query: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            query: query.into(),
            action: Action::new(name, args),
        }
    }
}

impl From<&ExampleConfig> for PlanningExample {
    fn from(config: &ExampleConfig) -> Self {
        Self::new(config.query.clone(), config.action.clone(), config.args.clone())
    }
}

/// Built-in examples. Only those naming a vocabulary action are shown.
pub fn default_examples() -> Vec<PlanningExample> {
    vec![
        PlanningExample::new("what day is it?", "get_current_time", serde_json::json!({})),
        PlanningExample::new(
            "what's your name?",
            "LLM_ANSWER",
            serde_json::json!({"response": "I'm your planning assistant."}),
        ),
        PlanningExample::new(
            "what can you do?",
            "META_QUERY",
            serde_json::json!({"query": "what can you do?"}),
        ),
        PlanningExample::new(
            "move it to later",
            "REQUEST_CLARIFICATION",
            serde_json::json!({"question": "Which event would you like to move, and to when?"}),
        ),
    ]
}

fn control_help(control: ControlAction) -> &'static str {
    match control {
        ControlAction::EndTurn => "END_TURN: stop; the results gathered so far answer the request",
        ControlAction::LlmAnswer => {
            "LLM_ANSWER(response): answer directly in natural language when no tool is needed"
        }
        ControlAction::RequestClarification => {
            "REQUEST_CLARIFICATION(question): ask the user a question when the request is ambiguous"
        }
        ControlAction::MetaQuery => "META_QUERY(query): explain what this assistant is able to do",
    }
}

/// Renders prompts for one turn.
pub struct PromptBuilder<'a> {
    vocabulary: &'a ActionVocabulary,
    definitions: &'a [ToolDefinition],
    examples: Vec<&'a PlanningExample>,
}

impl<'a> PromptBuilder<'a> {
    pub fn new(
        vocabulary: &'a ActionVocabulary,
        definitions: &'a [ToolDefinition],
        examples: &'a [PlanningExample],
    ) -> Self {
        Self {
            vocabulary,
            definitions,
            examples: examples
                .iter()
                .filter(|e| vocabulary.contains(&e.action.name))
                .collect(),
        }
    }

    fn format_line(&self) -> String {
        format!(
            "{{\"action\": \"<one of: {}>\", \"args\": {{...}}}}",
            self.vocabulary.names().join(", ")
        )
    }

    fn catalogue(&self) -> String {
        let mut out = String::new();
        if self.definitions.is_empty() {
            out.push_str("Available tools: none\n");
        } else {
            out.push_str("Available tools:\n");
            for def in self.definitions {
                out.push_str(&format!("- {}: {}\n", def.signature(), def.description));
            }
        }
        out.push_str("\nControl actions:\n");
        for control in self.vocabulary.controls() {
            out.push_str(&format!("- {}\n", control_help(control)));
        }
        out
    }

    /// The smallest valid example for repair prompts.
    pub fn minimal_example(&self) -> Action {
        self.examples
            .iter()
            .find(|e| e.action.control().is_none())
            .or_else(|| self.examples.first())
            .map(|e| e.action.clone())
            .unwrap_or_else(|| Action::bare(ControlAction::EndTurn.as_str()))
    }

    /// Step 0: full instructions.
    pub fn initial(&self, query: &str, context: &Context) -> String {
        let mut prompt = String::from(
            "You are the backend planner of a personal assistant.\n\
             Decide the single next action that best fulfils the user's request.\n\n",
        );
        prompt.push_str(&self.catalogue());

        if !self.examples.is_empty() {
            prompt.push_str("\nExamples:\n");
            for example in &self.examples {
                prompt.push_str(&format!(
                    "User: \"{}\"\n→ {}\n",
                    example.query,
                    example.action.to_wire()
                ));
            }
        }

        if !context.is_empty() {
            prompt.push_str("\nEarlier in this conversation:\n");
            prompt.push_str(&context.actions_log());
            prompt.push('\n');
        }

        prompt.push_str(&format!(
            "\nRespond STRICTLY with one line of JSON and nothing else:\n{}\n\nUser Query: \"{}\"\n",
            self.format_line(),
            query
        ));
        prompt
    }

    /// Step > 0: reflect on the previous result.
    pub fn reflection(&self, query: &str, last_action: &str, last_result: &str) -> String {
        format!(
            "You are the backend planner of a personal assistant.\n\n\
             Previous step:\nTool used: {last_action}\nResult: {last_result}\n\n\
             User's original request:\n\"{query}\"\n\n\
             Reflect and decide the next best step: retry with different arguments, \
             use a different tool, or end the turn if the request is answered.\n\n\
             Respond STRICTLY with one line of JSON and nothing else:\n{}\n",
            self.format_line()
        )
    }

    /// After output that was not valid JSON.
    pub fn parse_repair(&self, query: &str) -> String {
        format!(
            "You failed to output valid JSON.\n\
             You must respond ONLY with one line of valid JSON, no markdown, no explanation.\n\n\
             Example:\n{}\n\n\
             Retry the plan for: \"{query}\"\n",
            self.minimal_example().to_wire()
        )
    }

    /// After an action name outside the vocabulary.
    pub fn action_repair(&self, query: &str, bad_name: &str) -> String {
        format!(
            "The tool or action \"{bad_name}\" does not exist.\n\
             Valid actions are: {}.\n\n\
             Example valid JSON:\n{}\n\n\
             Retry planning for original query: \"{query}\"\n",
            self.vocabulary.names().join(", "),
            self.minimal_example().to_wire()
        )
    }

    /// Director mode: the whole plan at once.
    pub fn bulk(&self, query: &str) -> String {
        let mut prompt = String::from(
            "You are the backend planner of a personal assistant.\n\
             Break the user's request into the tool calls needed to answer it.\n\n",
        );
        prompt.push_str(&self.catalogue());
        prompt.push_str(&format!(
            "\nReturn one JSON object per line, in execution order, and nothing else.\n\
             Each line: {}\n\nUser Query: \"{query}\"\n",
            self.format_line()
        ));
        prompt
    }
}

/// The yes/no question put to the end-turn oracle.
pub fn end_turn_prompt(user_query: &str, context: &Context) -> String {
    format!(
        "User asked: {user_query}\n\
         Progress so far:\n{}\n\
         Do we have enough information to answer the user's query? Answer with \"yes\" or \"no\" only.",
        context.actions_log()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "get_current_time".into(),
            description: "Tell the current date and time".into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }]
    }

    fn vocab(controls: &[ControlAction]) -> ActionVocabulary {
        ActionVocabulary::new(["get_current_time"], controls.iter().copied())
    }

    #[test]
    fn initial_prompt_lists_catalogue_and_examples() {
        let v = vocab(&[ControlAction::EndTurn, ControlAction::LlmAnswer]);
        let d = defs();
        let examples = default_examples();
        let prompts = PromptBuilder::new(&v, &d, &examples);
        let prompt = prompts.initial("what time is it?", &Context::new("what time is it?"));

        assert!(prompt.contains("- get_current_time(): Tell the current date and time"));
        assert!(prompt.contains("LLM_ANSWER(response)"));
        assert!(prompt.contains(r#"{"action":"get_current_time","args":{}}"#));
        assert!(prompt.contains("User Query: \"what time is it?\""));
        // Disabled controls are neither described nor exemplified.
        assert!(!prompt.contains("REQUEST_CLARIFICATION"));
        assert!(!prompt.contains("META_QUERY"));
        assert!(!prompt.contains("Earlier in this conversation"));
    }

    #[test]
    fn initial_prompt_includes_carried_history() {
        let v = vocab(&[ControlAction::EndTurn]);
        let d = defs();
        let prompts = PromptBuilder::new(&v, &d, &[]);
        let mut ctx = Context::new("earlier");
        ctx.update_with_action_result("get_current_time", "Thursday");
        let prompt = prompts.initial("and tomorrow?", &ctx);
        assert!(prompt.contains("Earlier in this conversation"));
        assert!(prompt.contains("Thursday"));
    }

    #[test]
    fn reflection_embeds_last_result_and_goal() {
        let v = vocab(&[ControlAction::EndTurn]);
        let d = defs();
        let prompts = PromptBuilder::new(&v, &d, &[]);
        let prompt = prompts.reflection("plan my trip", "calendar_scan", "No matching events");
        assert!(prompt.contains("Tool used: calendar_scan"));
        assert!(prompt.contains("Result: No matching events"));
        assert!(prompt.contains("\"plan my trip\""));
    }

    #[test]
    fn repair_prompts_restate_query_with_one_example() {
        let v = vocab(&[ControlAction::EndTurn, ControlAction::LlmAnswer]);
        let d = defs();
        let examples = default_examples();
        let prompts = PromptBuilder::new(&v, &d, &examples);

        let parse = prompts.parse_repair("what day is it?");
        assert!(parse.contains("valid JSON"));
        assert!(parse.contains("\"what day is it?\""));
        assert_eq!(parse.matches("\"action\"").count(), 1);

        let action = prompts.action_repair("what day is it?", "get_date");
        assert!(action.contains("\"get_date\" does not exist"));
        assert!(action.contains("get_current_time, END_TURN, LLM_ANSWER"));
    }

    #[test]
    fn minimal_example_prefers_tools_then_falls_back() {
        let d = defs();
        let examples = default_examples();

        let v = vocab(&[ControlAction::EndTurn, ControlAction::LlmAnswer]);
        let prompts = PromptBuilder::new(&v, &d, &examples);
        assert_eq!(prompts.minimal_example().name, "get_current_time");

        let v = ActionVocabulary::new(Vec::<String>::new(), [ControlAction::EndTurn, ControlAction::LlmAnswer]);
        let prompts = PromptBuilder::new(&v, &[], &examples);
        assert_eq!(prompts.minimal_example().name, "LLM_ANSWER");

        let prompts = PromptBuilder::new(&v, &[], &[]);
        assert_eq!(prompts.minimal_example().name, "END_TURN");
    }

    #[test]
    fn end_turn_prompt_asks_yes_or_no() {
        let mut ctx = Context::new("q");
        ctx.update_with_action_result("get_current_time", "Thursday");
        let prompt = end_turn_prompt("what day is it?", &ctx);
        assert!(prompt.starts_with("User asked: what day is it?"));
        assert!(prompt.contains("Thursday"));
        assert!(prompt.ends_with("Answer with \"yes\" or \"no\" only."));
    }

    #[test]
    fn example_from_config() {
        let config = ExampleConfig {
            query: "find my trip".into(),
            action: "calendar_scan".into(),
            args: serde_json::json!({"query": "trip"}),
        };
        let example = PlanningExample::from(&config);
        assert_eq!(example.action.str_arg("query").as_deref(), Some("trip"));
    }
}
