//! services/classroom/src/classroom/session.rs
//!
//! Owns the lifecycle of one realtime tutoring session: credential, microphone,
//! transport, outbound sends and the event log.

use crate::classroom::cancellable;
use classroom_core::{
    events::RealtimeEvent,
    ports::{
        ClassroomBackend, InboundStream, LocalTrack, MediaDevices, OutboundSink, PeerHandle,
        PortError, RealtimeConnector,
    },
    session_config::SessionConfig,
};
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events kept in the log, newest first.
const EVENT_LOG_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    /// Being torn down by `stop`, which returns to `Idle`.
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("A realtime session is already active")]
    AlreadyActive,
    #[error("No session credential was issued: {0}")]
    MissingCredential(PortError),
    #[error("Failed to obtain a session credential: {0}")]
    Credential(PortError),
    #[error("Microphone unavailable: {0}")]
    Microphone(PortError),
    #[error("Realtime connection failed: {0}")]
    Connect(PortError),
    #[error("Session start was cancelled")]
    Cancelled,
}

/// What the inbound side of a live session produced.
#[derive(Debug)]
pub enum SessionInbound {
    Event(RealtimeEvent),
    /// The remote side went away. The caller should `stop` the session.
    Ended,
}

struct LiveSession {
    outbound: OutboundSink,
    inbound: InboundStream,
    peer: Box<dyn PeerHandle>,
    track: Box<dyn LocalTrack>,
}

pub struct SessionController {
    backend: Arc<dyn ClassroomBackend>,
    media: Arc<dyn MediaDevices>,
    connector: Arc<dyn RealtimeConnector>,
    state: ConnectionState,
    live: Option<LiveSession>,
    events: VecDeque<RealtimeEvent>,
}

/// Acquires credential, microphone and connection in order, releasing the
/// microphone when a later step fails or `cancel` fires.
async fn open(
    backend: &dyn ClassroomBackend,
    media: &dyn MediaDevices,
    connector: &dyn RealtimeConnector,
    config: &SessionConfig,
    cancel: &CancellationToken,
) -> Result<LiveSession, SessionError> {
    let credential = cancellable(cancel, backend.session_token(config))
        .await
        .ok_or(SessionError::Cancelled)?
        .map_err(|e| match e {
            PortError::InvalidResponse(_) => SessionError::MissingCredential(e),
            e => SessionError::Credential(e),
        })?;
    debug!("Session credential obtained: {:?}", credential);

    let mut track = cancellable(cancel, media.open_microphone())
        .await
        .ok_or(SessionError::Cancelled)?
        .map_err(SessionError::Microphone)?;

    let connected = cancellable(
        cancel,
        connector.connect(&credential, &config.model, track.as_mut()),
    )
    .await;
    match connected {
        Some(Ok(link)) => Ok(LiveSession {
            outbound: link.outbound,
            inbound: link.inbound,
            peer: link.peer,
            track,
        }),
        Some(Err(e)) => {
            track.stop();
            Err(SessionError::Connect(e))
        }
        None => {
            track.stop();
            Err(SessionError::Cancelled)
        }
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

impl SessionController {
    pub fn new(
        backend: Arc<dyn ClassroomBackend>,
        media: Arc<dyn MediaDevices>,
        connector: Arc<dyn RealtimeConnector>,
    ) -> Self {
        Self {
            backend,
            media,
            connector,
            state: ConnectionState::Idle,
            live: None,
            events: VecDeque::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// The event log, most recent first.
    pub fn events(&self) -> impl Iterator<Item = &RealtimeEvent> {
        self.events.iter()
    }

    /// Opens a session configured by `config`. Everything acquired so far is
    /// released when `cancel` fires or a later step fails.
    pub async fn start(
        &mut self,
        config: &SessionConfig,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            return Err(SessionError::AlreadyActive);
        }

        self.state = ConnectionState::Connecting;
        let opened = open(
            self.backend.as_ref(),
            self.media.as_ref(),
            self.connector.as_ref(),
            config,
            cancel,
        )
        .await;
        match opened {
            Ok(live) => {
                info!("Realtime session open on {}", live.track.label());
                self.live = Some(live);
                self.events.clear();
                self.state = ConnectionState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = ConnectionState::Idle;
                Err(e)
            }
        }
    }

    /// Sends `event` on the data channel. Returns `false`, after logging, when
    /// no session is open or the write fails; nothing is queued.
    pub async fn send(&mut self, mut event: RealtimeEvent) -> bool {
        let live = match self.live.as_mut() {
            Some(live) if self.state == ConnectionState::Open => live,
            _ => {
                error!("Dropping {}: no realtime session is open", event.kind());
                return false;
            }
        };

        if event.event_id.is_none() {
            event.event_id = Some(Uuid::new_v4().to_string());
        }
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(e) => {
                error!("Failed to serialize {}: {}", event.kind(), e);
                return false;
            }
        };
        if let Err(e) = live.outbound.send(text).await {
            error!("Failed to send {}: {}", event.kind(), e);
            return false;
        }

        if event.timestamp.is_none() {
            event.timestamp = Some(timestamp());
        }
        debug!("Sent {}", event.kind());
        self.record(event);
        true
    }

    /// Parses one inbound message and logs it. Malformed messages are dropped.
    pub fn on_message(&mut self, text: &str) -> Option<RealtimeEvent> {
        let mut event: RealtimeEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed realtime message: {}", e);
                return None;
            }
        };
        if event.timestamp.is_none() {
            event.timestamp = Some(timestamp());
        }
        self.record(event.clone());
        Some(event)
    }

    /// Waits for the next inbound event. Never resolves while no session is live.
    pub async fn next_event(&mut self) -> SessionInbound {
        loop {
            let next = match self.live.as_mut() {
                Some(live) => live.inbound.next().await,
                None => return std::future::pending().await,
            };
            match next {
                Some(Ok(text)) => {
                    if let Some(event) = self.on_message(&text) {
                        return SessionInbound::Event(event);
                    }
                }
                Some(Err(e)) => warn!("Realtime channel error: {}", e),
                None => {
                    info!("Realtime channel closed by the remote side");
                    return SessionInbound::Ended;
                }
            }
        }
    }

    /// Closes the data channel, stops the microphone and closes the peer, then
    /// resets to `Idle`. Does nothing when no session is live.
    pub async fn stop(&mut self) {
        let Some(mut live) = self.live.take() else {
            return;
        };
        info!("Stopping realtime session");
        self.state = ConnectionState::Closed;
        if let Err(e) = live.outbound.close().await {
            debug!("Data channel already closed: {}", e);
        }
        live.track.stop();
        live.peer.close().await;
        self.state = ConnectionState::Idle;
    }

    fn record(&mut self, event: RealtimeEvent) {
        self.events.push_front(event);
        self.events.truncate(EVENT_LOG_CAPACITY);
    }
}
