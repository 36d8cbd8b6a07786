//! crates/classroom_core/src/session_config.rs
//!
//! Builds the configuration of one tutoring session. A fresh, immutable
//! `SessionConfig` is made for every checkpoint arrival; nothing here is shared
//! between sessions.

use crate::checkpoints::CheckpointStore;
use serde_json::{json, Value};

const TUTOR_PERSONA: &str = r#"You are an AI tutor who teaches from YouTube videos and draws on a blackboard for visual aids.
The video has just been paused at the checkpoint marked [Current Checkpoint]. Ask the user the question for this checkpoint about the content that came before it.
Start with a very short reminder of what the previous content covered, then ask the question. Never reveal the answer before asking.
Use the blackboard tools whenever a visual aid helps.
When everything is covered, ask whether the user wants to return to the video. Only if they clearly say yes, say goodbye and then call end_conversation. Do not end the conversation without the user's clear intent."#;

/// Session settings that come from configuration rather than from the video.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub model: String,
    pub voice: String,
    pub vad_threshold: f64,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-realtime-preview-2024-12-17".to_string(),
            voice: "verse".to_string(),
            vad_threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
        }
    }
}

/// Everything the token endpoint needs to configure one realtime session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model: String,
    pub voice: String,
    pub instructions: String,
    pub tools: Vec<Value>,
    pub tool_choice: String,
    pub turn_detection: Value,
}

impl SessionConfig {
    /// Builds the configuration for the session opened at checkpoint `index`.
    ///
    /// `index` is clamped to the last checkpoint.
    pub fn for_checkpoint(
        checkpoints: &CheckpointStore,
        index: usize,
        settings: &SessionSettings,
    ) -> Self {
        Self {
            model: settings.model.clone(),
            voice: settings.voice.clone(),
            instructions: build_instructions(checkpoints, index),
            tools: tool_schemas(),
            tool_choice: "auto".to_string(),
            turn_detection: json!({
                "type": "server_vad",
                "threshold": settings.vad_threshold,
                "prefix_padding_ms": settings.prefix_padding_ms,
                "silence_duration_ms": settings.silence_duration_ms,
                "create_response": true,
            }),
        }
    }

    /// The JSON payload for `POST /session-token`.
    pub fn token_request(&self) -> Value {
        json!({
            "model": self.model,
            "voice": self.voice,
            "instructions": self.instructions,
            "tools": self.tools,
            "tool_choice": self.tool_choice,
            "turn_detection": self.turn_detection,
        })
    }
}

/// Lays out the transcript up to checkpoint `index` for the model. Earlier
/// checkpoints are tagged only when their conversation took place.
pub fn build_instructions(store: &CheckpointStore, index: usize) -> String {
    let checkpoints = store.checkpoints();
    let Some(last) = checkpoints.len().checked_sub(1) else {
        return TUTOR_PERSONA.to_string();
    };
    let current = index.min(last);

    let mut transcript = String::new();
    for (i, checkpoint) in checkpoints[..=current].iter().enumerate() {
        transcript.push_str(&checkpoint.segment);
        transcript.push(' ');
        if i < current && store.was_asked(i) {
            transcript.push_str("\n[Previous Checkpoint]\nQuestion asked: ");
            transcript.push_str(&checkpoint.question);
            transcript.push_str("\n\n");
        }
    }
    transcript.push_str("\n[Current Checkpoint]\nQuestion you should ask in this session: ");
    transcript.push_str(&checkpoints[current].question);
    transcript.push_str("\n\n");

    format!("{TUTOR_PERSONA}\n\nTranscription:\n{transcript}")
}

/// Function schemas for the four blackboard tools.
pub fn tool_schemas() -> Vec<Value> {
    vec![
        json!({
            "type": "function",
            "name": "display_explanation_text",
            "description": "Display explanation text on the blackboard to supplement what you say. Run this before you start explaining. Add notes only for a longer, detailed explanation.",
            "parameters": {
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "The title of the explanation" },
                    "bullets": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Very concise bullet points to display"
                    },
                    "notes": { "type": "string", "description": "Optional free-form notes shown next to the bullets" }
                },
                "required": ["title", "bullets"]
            }
        }),
        json!({
            "type": "function",
            "name": "display_openended_question",
            "description": "Display an open-ended question on the blackboard. The user answers by speaking.",
            "parameters": {
                "type": "object",
                "properties": {
                    "question": { "type": "string", "description": "The question text" }
                },
                "required": ["question"]
            }
        }),
        json!({
            "type": "function",
            "name": "display_multiple_choice",
            "description": "Display a multiple choice question. Briefly tell the user you are about to ask a question, run this function, then explain the question.",
            "parameters": {
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "The title of the quiz" },
                    "question": { "type": "string", "description": "The question text" },
                    "options": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Array of possible answer options"
                    },
                    "correctAnswer": { "type": "string", "description": "The correct answer option" },
                    "feedback": { "type": "string", "description": "Short feedback shown after the user answers" }
                },
                "required": ["title", "question", "options", "correctAnswer"]
            }
        }),
        json!({
            "type": "function",
            "name": "end_conversation",
            "description": "End the current conversation and send the user back to the video. Briefly say goodbye first.",
            "parameters": {
                "type": "object",
                "properties": {},
                "required": []
            }
        }),
    ]
}
