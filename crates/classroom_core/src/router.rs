//! crates/classroom_core/src/router.rs
//!
//! Turns inbound realtime events into whiteboard state and follow-up actions.
//!
//! The router is fed each event exactly once, as it arrives, and never replays
//! the event log; whatever `response.done` arrived last decides the board. It
//! performs no I/O itself: side effects are returned as [`RouterAction`]s for
//! the caller to carry out.

use crate::events::{EventBody, RealtimeEvent};
use crate::tools::{ToolInvocation, ToolName};
use crate::whiteboard::{
    Board, ExplanationPayload, MultipleChoicePayload, OpenendedPayload, UiState,
};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delays the router asks for when scheduling actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterTimings {
    /// Wait after `session.created` before the first `response.create`.
    pub settle_delay: Duration,
    /// Wait after a blackboard tool call before asking the model to continue.
    pub followup_delay: Duration,
    /// Time left for the goodbye to play before the session is torn down.
    pub end_grace: Duration,
}

impl Default for RouterTimings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            followup_delay: Duration::from_millis(20),
            end_grace: Duration::from_millis(3_000),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RouterAction {
    /// Send `event` on the session after `after`.
    Send { event: RealtimeEvent, after: Duration },
    /// Tear the session down and leave conversation mode after `after`.
    EndConversation { after: Duration },
}

#[derive(Debug, Default)]
pub struct TutorRouter {
    timings: RouterTimings,
    session_started: bool,
    speaking: bool,
    last_response_id: Option<String>,
    board: Board,
}

impl TutorRouter {
    pub fn new(timings: RouterTimings) -> Self {
        Self {
            timings,
            ..Default::default()
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn ui_state(&self) -> UiState {
        self.board.ui_state()
    }

    /// Whether the tutor avatar should be animating.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Advances the board animation by one step.
    pub fn tick_board(&mut self) -> crate::whiteboard::Tick {
        self.board.tick()
    }

    /// Forgets everything about the previous session.
    pub fn reset(&mut self) {
        self.session_started = false;
        self.speaking = false;
        self.last_response_id = None;
        self.board = Board::Empty;
    }

    /// Applies the most recently received event.
    pub fn observe(&mut self, event: &RealtimeEvent) -> Vec<RouterAction> {
        match &event.body {
            EventBody::SessionCreated { .. } => {
                if self.session_started {
                    debug!("Ignoring repeated session.created");
                    return Vec::new();
                }
                self.session_started = true;
                info!("Realtime session created, asking the tutor to start");
                vec![RouterAction::Send {
                    event: RealtimeEvent::response_create(),
                    after: self.timings.settle_delay,
                }]
            }
            EventBody::SessionUpdated { .. } => {
                debug!("Realtime session updated");
                Vec::new()
            }
            EventBody::AudioTranscriptDelta { .. } => {
                self.speaking = true;
                Vec::new()
            }
            EventBody::OutputAudioBufferStopped | EventBody::AudioDone => {
                self.speaking = false;
                Vec::new()
            }
            EventBody::ResponseDone { response } => {
                if let Some(id) = &response.id {
                    if self.last_response_id.as_ref() == Some(id) {
                        warn!("Ignoring duplicate response.done for {}", id);
                        return Vec::new();
                    }
                    self.last_response_id = Some(id.clone());
                }
                let calls: Vec<ToolInvocation> = response
                    .output
                    .iter()
                    .filter_map(ToolInvocation::from_output)
                    .collect();
                self.dispatch(calls)
            }
            EventBody::Error { error } => {
                warn!("Realtime service reported an error: {}", error);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn dispatch(&mut self, calls: Vec<ToolInvocation>) -> Vec<RouterAction> {
        let mut actions = Vec::new();
        let mut needs_followup = false;

        for call in calls {
            info!("Tutor invoked {} ({})", call.name, call.call_id);
            let arguments = call.arguments.as_deref();
            match call.name {
                ToolName::DisplayExplanationText => {
                    self.board = Board::explanation(ExplanationPayload::from_arguments(arguments));
                    needs_followup = true;
                }
                ToolName::DisplayOpenendedQuestion => {
                    self.board = Board::openended(OpenendedPayload::from_arguments(arguments));
                    needs_followup = true;
                }
                ToolName::DisplayMultipleChoice => {
                    self.board = Board::multiple_choice(
                        MultipleChoicePayload::from_arguments(arguments),
                        call.call_id,
                    );
                    needs_followup = true;
                }
                ToolName::EndConversation => {
                    actions.push(RouterAction::EndConversation {
                        after: self.timings.end_grace,
                    });
                }
                ToolName::Unknown(name) => {
                    warn!("Unknown tool {}, clearing the blackboard", name);
                    self.board = Board::Empty;
                }
            }
        }

        if needs_followup {
            actions.insert(
                0,
                RouterAction::Send {
                    event: RealtimeEvent::response_create(),
                    after: self.timings.followup_delay,
                },
            );
        }
        actions
    }

    /// Records the user's pick on a multiple-choice board and returns the
    /// events that report it to the tutor. Returns nothing when the board is
    /// not a multiple-choice question or is already answered.
    pub fn select_option(&mut self, index: usize) -> Vec<RouterAction> {
        let Some(report) = self.board.select(index) else {
            return Vec::new();
        };
        info!("User selected '{}' for {}", report.choice, report.call_id);
        vec![
            RouterAction::Send {
                event: RealtimeEvent::function_call_output(
                    report.call_id,
                    format!("The user has selected {} on the blackboard. ", report.choice),
                ),
                after: Duration::ZERO,
            },
            RouterAction::Send {
                event: RealtimeEvent::response_create_with("Give feedback about the user's choice."),
                after: Duration::ZERO,
            },
        ]
    }
}
