//! services/classroom/src/classroom/state.rs
//!
//! Defines the classroom's shared dependencies and its mutable screen state.

use crate::config::Config;
use classroom_core::{
    checkpoints::CheckpointStore,
    domain::{FinalReview, Status, VideoId},
    ports::{ClassroomBackend, MediaDevices, RealtimeConnector, VideoPlayer},
    router::RouterTimings,
    session_config::SessionSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

//=========================================================================================
// ClassroomDeps (Created Once at Startup)
//=========================================================================================

/// Tunables the shell reads at runtime.
#[derive(Debug, Clone)]
pub struct ClassroomSettings {
    pub session: SessionSettings,
    pub timings: RouterTimings,
    pub poll_interval: Duration,
    pub reveal_interval: Duration,
}

impl Default for ClassroomSettings {
    fn default() -> Self {
        Self {
            session: SessionSettings::default(),
            timings: RouterTimings::default(),
            poll_interval: Duration::from_millis(500),
            reveal_interval: Duration::from_millis(40),
        }
    }
}

impl From<&Config> for ClassroomSettings {
    fn from(config: &Config) -> Self {
        Self {
            session: config.session.clone(),
            timings: config.timings,
            poll_interval: config.poll_interval,
            reveal_interval: config.reveal_interval,
        }
    }
}

/// The adapters behind every port, created once at startup.
#[derive(Clone)]
pub struct ClassroomDeps {
    pub settings: ClassroomSettings,
    pub backend: Arc<dyn ClassroomBackend>,
    pub player: Arc<dyn VideoPlayer>,
    pub media: Arc<dyn MediaDevices>,
    pub connector: Arc<dyn RealtimeConnector>,
}

//=========================================================================================
// ClassroomState (Owned by the Shell)
//=========================================================================================

#[derive(Debug)]
pub struct ClassroomState {
    pub status: Status,
    /// True while a tutoring conversation holds the video paused.
    pub conversation_mode: bool,
    pub video_id: Option<VideoId>,
    pub checkpoints: CheckpointStore,
    pub final_review: Option<FinalReview>,
}

impl Default for ClassroomState {
    fn default() -> Self {
        Self {
            status: Status::WaitingForInput,
            conversation_mode: false,
            video_id: None,
            checkpoints: CheckpointStore::default(),
            final_review: None,
        }
    }
}

impl ClassroomState {
    /// Moves to `next` when the transition is legal. Returns whether it moved.
    pub fn set_status(&mut self, next: Status) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            warn!("Ignoring illegal transition {} -> {}", self.status, next);
            false
        }
    }
}
