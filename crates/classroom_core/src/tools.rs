//! crates/classroom_core/src/tools.rs
//!
//! The closed set of tools the tutor may invoke.

use crate::events::{ItemKind, ResponseOutput};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolName {
    DisplayExplanationText,
    DisplayOpenendedQuestion,
    DisplayMultipleChoice,
    EndConversation,
    /// A name the classroom does not know how to draw.
    Unknown(String),
}

impl ToolName {
    pub fn parse(name: &str) -> Self {
        match name {
            "display_explanation_text" => ToolName::DisplayExplanationText,
            "display_openended_question" => ToolName::DisplayOpenendedQuestion,
            "display_multiple_choice" => ToolName::DisplayMultipleChoice,
            "end_conversation" => ToolName::EndConversation,
            other => ToolName::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolName::DisplayExplanationText => f.write_str("display_explanation_text"),
            ToolName::DisplayOpenendedQuestion => f.write_str("display_openended_question"),
            ToolName::DisplayMultipleChoice => f.write_str("display_multiple_choice"),
            ToolName::EndConversation => f.write_str("end_conversation"),
            ToolName::Unknown(name) => f.write_str(name),
        }
    }
}

/// A function call found in a completed response.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: ToolName,
    pub call_id: String,
    /// Raw, unparsed arguments.
    pub arguments: Option<String>,
}

impl ToolInvocation {
    /// Extracts the invocation from a response output item, if it is a function call.
    pub fn from_output(output: &ResponseOutput) -> Option<Self> {
        if output.kind != ItemKind::FunctionCall {
            return None;
        }
        Some(Self {
            name: ToolName::parse(output.name.as_deref().unwrap_or_default()),
            call_id: output.call_id.clone().unwrap_or_default(),
            arguments: output.arguments.clone(),
        })
    }
}
