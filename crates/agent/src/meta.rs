//! Answers "what can you do?" style questions from the registry itself.

use std::collections::BTreeSet;
use toolpilot_core::tool::{CapabilityRegistry, ToolDefinition};

const STOP_WORDS: [&str; 16] = [
    "the", "and", "can", "you", "your", "what", "how", "are", "for", "with", "about", "does", "tell",
    "help", "able", "things",
];

fn keywords(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|w| w.len() >= 3 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Describes registered capabilities in natural language.
pub struct MetaCapability<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> MetaCapability<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    /// Tools whose name or description shares a keyword with `question`.
    pub fn matching(&self, question: &str) -> Vec<ToolDefinition> {
        let wanted = keywords(question);
        if wanted.is_empty() {
            return Vec::new();
        }
        self.registry
            .definitions()
            .into_iter()
            .filter(|def| {
                let have = keywords(&format!("{} {}", def.name.replace('_', " "), def.description));
                !have.is_disjoint(&wanted)
            })
            .collect()
    }

    /// Answer a capability question.
    pub fn describe(&self, question: &str) -> String {
        if self.registry.is_empty() {
            return "I don't have any tools available right now.".to_string();
        }

        let matched = self.matching(question);
        let (header, defs) = if matched.is_empty() {
            ("Here is what I can do:", self.registry.definitions())
        } else {
            ("Here is what I can do that relates to your question:", matched)
        };

        let mut out = String::from(header);
        for def in defs {
            out.push_str(&format!("\n- {}: {}", def.name, def.description));
        }
        out
    }
}
