pub mod checkpoints;
pub mod domain;
pub mod events;
pub mod link;
pub mod ports;
pub mod router;
pub mod session_config;
pub mod tools;
pub mod whiteboard;

pub use checkpoints::{Arrival, CheckpointStore};
pub use domain::{Checkpoint, FinalReview, PreprocessResult, SessionCredential, Status, VideoId};
pub use events::{EventBody, RealtimeEvent};
pub use link::{extract_video_id, is_valid_link, parse_link, LinkError};
pub use ports::{
    ClassroomBackend, LocalTrack, MediaDevices, PeerHandle, PortError, PortResult,
    RealtimeConnector, RealtimeLink, VideoPlayer,
};
pub use router::{RouterAction, RouterTimings, TutorRouter};
pub use session_config::{SessionConfig, SessionSettings};
pub use whiteboard::{Board, ChoiceReport, UiState};
