//! services/classroom/src/classroom/mod.rs
//!
//! The runtime side of the classroom: the shell that owns the state machine,
//! the session controller and the playback poller.

pub mod playback;
pub mod protocol;
pub mod session;
pub mod shell;
pub mod state;

pub use playback::{playback_events, PlaybackEvent};
pub use protocol::{Notice, ShellCommand};
pub use session::{ConnectionState, SessionController, SessionError, SessionInbound};
pub use shell::Classroom;
pub use state::{ClassroomDeps, ClassroomSettings, ClassroomState};

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Runs `fut` unless `token` is cancelled first. `None` means cancelled.
pub(crate) async fn cancellable<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        output = fut => Some(output),
    }
}
