//! crates/classroom_core/src/domain.rs
//!
//! Defines the pure, core data structures for the classroom.
//! These structs are independent of any transport; the serde derives only
//! describe how the preprocessing backend shapes them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A fixed point in a video where the tutor stops playback and asks a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Seconds from the start of the video.
    pub time: f64,
    pub question: String,
    /// Transcript text between the previous checkpoint and this one.
    #[serde(default)]
    pub segment: String,
}

/// The 11-character identifier of a hosted video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub(crate) fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical watch URL for this id.
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The coarse screen the classroom is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    WaitingForInput,
    Processing,
    Class,
    Review,
    /// Terminal screen after review. Reachable, but nothing happens there yet.
    Done,
}

impl Status {
    /// Whether `self -> next` is a legal move of the classroom state machine.
    pub fn can_transition_to(self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::WaitingForInput, Status::Processing)
                | (Status::Processing, Status::Class)
                | (Status::Processing, Status::WaitingForInput)
                | (Status::Class, Status::Review)
                | (Status::Review, Status::Done)
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::WaitingForInput => "waitingForInput",
            Status::Processing => "processing",
            Status::Class => "class",
            Status::Review => "review",
            Status::Done => "done",
        };
        f.write_str(name)
    }
}

/// End-of-video summary produced alongside the checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalReview {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub review_questions: Vec<String>,
}

/// Everything the preprocessing backend returns for one video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessResult {
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(default, rename = "final")]
    pub final_review: Option<FinalReview>,
}

/// Short-lived bearer token that authorizes one realtime session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_machine_only_moves_forward_or_back_from_processing() {
        assert!(Status::WaitingForInput.can_transition_to(Status::Processing));
        assert!(Status::Processing.can_transition_to(Status::WaitingForInput));
        assert!(Status::Review.can_transition_to(Status::Done));
        assert!(!Status::Class.can_transition_to(Status::WaitingForInput));
        assert!(!Status::Done.can_transition_to(Status::Review));
        assert!(!Status::WaitingForInput.can_transition_to(Status::Class));
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = SessionCredential::new("ek_secret");
        assert!(!format!("{:?}", credential).contains("ek_secret"));
        assert_eq!(credential.expose(), "ek_secret");
    }

    #[test]
    fn preprocess_result_tolerates_missing_fields() {
        let parsed: PreprocessResult =
            serde_json::from_str(r#"{"checkpoints":[{"time":4.5,"question":"Why?"}]}"#)
                .unwrap();
        assert_eq!(parsed.checkpoints[0].segment, "");
        assert!(parsed.final_review.is_none());
    }
}
