//! crates/classroom_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the classroom's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete backend, video player, audio devices and
//! realtime transport.

use crate::domain::{PreprocessResult, SessionCredential, VideoId};
use crate::session_config::SessionConfig;
use async_trait::async_trait;
use futures::{Sink, Stream};
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (network, devices, player).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Channel closed")]
    Closed,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Realtime Link Types
//=========================================================================================

/// Raw PCM16 frames captured from a local microphone.
pub type AudioFrames = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Writing half of the data channel. One JSON event per item.
pub type OutboundSink = Pin<Box<dyn Sink<String, Error = PortError> + Send>>;

/// Reading half of the data channel. One JSON event per item.
pub type InboundStream = Pin<Box<dyn Stream<Item = PortResult<String>> + Send>>;

/// The connection that carries a realtime session, split into its halves.
pub struct RealtimeLink {
    pub outbound: OutboundSink,
    pub inbound: InboundStream,
    pub peer: Box<dyn PeerHandle>,
}

/// Whatever owns the underlying connection (peer connection, socket task).
#[async_trait]
pub trait PeerHandle: Send {
    /// Releases the connection. Must be safe to call more than once.
    async fn close(&mut self);
}

/// A captured local audio source.
pub trait LocalTrack: Send {
    fn label(&self) -> &str;

    /// Hands out the captured frames. Returns `None` after the first call.
    fn take_frames(&mut self) -> Option<AudioFrames>;

    /// Stops capturing. Must be safe to call more than once.
    fn stop(&mut self);
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait ClassroomBackend: Send + Sync {
    /// Turns a video link into its checkpoints.
    async fn preprocess(&self, youtube_link: &str) -> PortResult<PreprocessResult>;

    /// Requests a short-lived credential for a realtime session configured by `config`.
    async fn session_token(&self, config: &SessionConfig) -> PortResult<SessionCredential>;
}

#[async_trait]
pub trait VideoPlayer: Send + Sync {
    /// Attaches a player for `video_id`. Failing to attach is not an error;
    /// the player simply stays detached.
    async fn load(&self, video_id: &VideoId);

    async fn play(&self);

    async fn pause(&self);

    /// Current playback position in seconds, `None` while detached.
    async fn current_time(&self) -> Option<f64>;

    /// Whether the underlying player has reported end of media.
    async fn has_ended(&self) -> bool;
}

#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Opens the default microphone. Denied access is `PortError::PermissionDenied`.
    async fn open_microphone(&self) -> PortResult<Box<dyn LocalTrack>>;
}

#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Establishes the realtime connection for `model` using `credential`,
    /// attaching the microphone `track`.
    async fn connect(
        &self,
        credential: &SessionCredential,
        model: &str,
        track: &mut dyn LocalTrack,
    ) -> PortResult<RealtimeLink>;
}
