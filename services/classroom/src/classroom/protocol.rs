//! services/classroom/src/classroom/protocol.rs
//!
//! Defines the messages exchanged between the classroom shell and whatever
//! front end drives it (the terminal binary, or a test).

use classroom_core::domain::{FinalReview, Status};

//=========================================================================================
// Commands Sent TO the Shell
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    /// Submits a video link while waiting for input; anything typed during a
    /// conversation is sent to the tutor instead.
    Text(String),
    /// Picks option `n` (zero based) on a multiple-choice board.
    Pick(usize),
    /// Ends the current conversation and resumes the video.
    EndChat,
    /// Leaves the review screen.
    Finish,
    Quit,
}

impl ShellCommand {
    /// Parses one line of terminal input. Slash commands are `/pick N` (one
    /// based), `/end`, `/finish` and `/quit`; anything else is text.
    /// Returns `None` for blank lines and malformed commands.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(ShellCommand::Text(line.to_string()));
        };
        let mut parts = command.split_whitespace();
        match (parts.next()?, parts.next()) {
            ("pick", Some(n)) => n
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(ShellCommand::Pick),
            ("end", None) => Some(ShellCommand::EndChat),
            ("finish", None) => Some(ShellCommand::Finish),
            ("quit", None) => Some(ShellCommand::Quit),
            _ => None,
        }
    }
}

//=========================================================================================
// Notices Sent FROM the Shell
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Status(Status),
    /// A blocking message for the user, e.g. an invalid link.
    Alert(String),
    /// Something failed; the classroom carries on.
    Error(String),
    /// Playback reached a checkpoint and a conversation is starting.
    Checkpoint { index: usize, question: String },
    /// Conversation mode switched on or off.
    Conversation(bool),
    /// The tutor started or stopped talking.
    Speaking(bool),
    /// The whiteboard as text, sent whenever it changes.
    Board(String),
    Review(Option<FinalReview>),
}
