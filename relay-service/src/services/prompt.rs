//! Prompt assembly.

use super::knowledge::KnowledgeBlock;
use super::providers::ChatMessage;
use crate::models::Question;
use std::sync::Arc;

/// Behavioural contract for the model: knowledge only, admit gaps.
pub const INSTRUCTIONS: &str = "You are a helpful assistant who answers questions strictly \
from the provided KNOWLEDGE. Do not invent facts or speculate. If the KNOWLEDGE does not \
contain the answer, reply that you do not have that information.";

/// Pre-rendered system message; only the user message varies per request.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    system: Arc<str>,
}

impl PromptTemplate {
    pub fn new(knowledge: &KnowledgeBlock) -> Self {
        let system = format!("{}\n\nKNOWLEDGE:\n{}", INSTRUCTIONS, knowledge.as_str());
        Self {
            system: Arc::from(system),
        }
    }

    pub fn system_message(&self) -> &str {
        &self.system
    }

    /// Exactly two messages: system, then user.
    pub fn build(&self, question: &Question) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.as_ref()),
            ChatMessage::user(question.as_str()),
        ]
    }
}
