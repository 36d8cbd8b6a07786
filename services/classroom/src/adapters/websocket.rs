//! services/classroom/src/adapters/websocket.rs
//!
//! The WebSocket transport to the realtime service. It implements the
//! `RealtimeConnector` port from the `core` crate.
//!
//! The socket carries both the event stream and the audio: microphone frames
//! go out as `input_audio_buffer.append` events, and `response.audio.delta`
//! events are diverted to the speaker instead of the inbound stream, so the
//! session controller sees the same events it would on a data channel.

use crate::adapters::audio::CommandSpeaker;
use async_stream::stream;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use classroom_core::{
    domain::SessionCredential,
    events::RealtimeEvent,
    ports::{
        InboundStream, LocalTrack, OutboundSink, PeerHandle, PortError, PortResult,
        RealtimeConnector, RealtimeLink,
    },
};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderName, HeaderValue},
        Message,
    },
};
use tokio_util::sync::{CancellationToken, PollSender};
use tracing::{debug, error, info, warn};

const CHANNEL_CAPACITY: usize = 64;
const CLOSE_TIMEOUT: Duration = Duration::from_millis(500);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone, Debug)]
pub struct WebSocketConnector {
    url: String,
    playback_command: Option<String>,
}

impl WebSocketConnector {
    /// `playback_command` receives the tutor's PCM audio; `None` discards it.
    pub fn new(url: impl Into<String>, playback_command: Option<String>) -> Self {
        Self {
            url: url.into(),
            playback_command,
        }
    }
}

/// Owns the socket tasks of one connection.
struct SocketPeer {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

#[async_trait]
impl PeerHandle for SocketPeer {
    async fn close(&mut self) {
        self.token.cancel();
        for task in self.tasks.drain(..) {
            let abort = task.abort_handle();
            if tokio::time::timeout(CLOSE_TIMEOUT, task).await.is_err() {
                abort.abort();
            }
        }
    }
}

/// Decodes the PCM of a `response.audio.delta` event; `None` for any other event.
fn audio_delta(text: &str) -> Option<Vec<u8>> {
    if !text.contains("response.audio.delta") {
        return None;
    }
    let value: Value = serde_json::from_str(text).ok()?;
    if value.get("type").and_then(Value::as_str) != Some("response.audio.delta") {
        return None;
    }
    let delta = value.get("delta").and_then(Value::as_str).unwrap_or_default();
    match BASE64.decode(delta) {
        Ok(pcm) => Some(pcm),
        Err(e) => {
            warn!("Dropping undecodable audio delta: {}", e);
            Some(Vec::new())
        }
    }
}

//=========================================================================================
// `RealtimeConnector` Trait Implementation
//=========================================================================================

#[async_trait]
impl RealtimeConnector for WebSocketConnector {
    async fn connect(
        &self,
        credential: &SessionCredential,
        model: &str,
        track: &mut dyn LocalTrack,
    ) -> PortResult<RealtimeLink> {
        let url = format!("{}?model={}", self.url, model);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| PortError::Unexpected(format!("invalid realtime url {}: {}", url, e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|e| PortError::InvalidResponse(format!("unusable credential: {}", e)))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);
        request.headers_mut().insert(
            HeaderName::from_static("openai-beta"),
            HeaderValue::from_static("realtime=v1"),
        );

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| PortError::Unavailable(format!("realtime connection failed: {}", e)))?;
        info!("Realtime socket connected to {}", self.url);

        let (mut ws_sink, mut ws_stream) = socket.split();
        let token = CancellationToken::new();
        let (out_tx, mut out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (in_tx, mut in_rx) = mpsc::channel::<PortResult<String>>(CHANNEL_CAPACITY);
        let mut tasks = Vec::new();

        // --- Writer: outbound events to the socket ---
        let writer_token = token.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = writer_token.cancelled() => break,
                    next = out_rx.recv() => match next {
                        Some(text) => {
                            if let Err(e) = ws_sink.send(Message::Text(text)).await {
                                error!("Realtime socket write failed: {}", e);
                                return;
                            }
                        }
                        None => break,
                    }
                }
            }
            let _ = ws_sink.send(Message::Close(None)).await;
        }));

        // --- Microphone: PCM frames as append events ---
        if let Some(mut frames) = track.take_frames() {
            let mic_token = token.clone();
            let mic_tx = out_tx.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    let pcm = tokio::select! {
                        _ = mic_token.cancelled() => break,
                        frame = frames.next() => match frame {
                            Some(pcm) => pcm,
                            None => break,
                        }
                    };
                    let event = RealtimeEvent::audio_append(BASE64.encode(&pcm));
                    match serde_json::to_string(&event) {
                        Ok(text) => {
                            if mic_tx.send(text).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to encode audio frame: {}", e),
                    }
                }
                debug!("Microphone pump stopped");
            }));
        }

        // --- Reader: socket to inbound events, audio to the speaker ---
        let mut speaker = match &self.playback_command {
            Some(command) => match CommandSpeaker::spawn(command) {
                Ok(speaker) => Some(speaker),
                Err(e) => {
                    warn!("Tutor audio will not be played: {}", e);
                    None
                }
            },
            None => None,
        };
        let reader_token = token.clone();
        tasks.push(tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = reader_token.cancelled() => break,
                    message = ws_stream.next() => message,
                };
                match message {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(pcm) = audio_delta(&text) {
                            if let Some(out) = speaker.as_mut() {
                                if let Err(e) = out.write(&pcm).await {
                                    warn!("Disabling tutor audio: {}", e);
                                    speaker = None;
                                }
                            }
                        } else if in_tx.send(Ok(text)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Realtime socket closed by the service: {:?}", frame);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let _ = in_tx
                            .send(Err(PortError::Unavailable(e.to_string())))
                            .await;
                        break;
                    }
                    None => break,
                }
            }
            if let Some(mut out) = speaker {
                out.stop();
            }
        }));

        let outbound: OutboundSink =
            Box::pin(PollSender::new(out_tx).sink_map_err(|_| PortError::Closed));
        let inbound: InboundStream = Box::pin(stream! {
            while let Some(item) = in_rx.recv().await {
                yield item;
            }
        });

        Ok(RealtimeLink {
            outbound,
            inbound,
            peer: Box::new(SocketPeer { token, tasks }),
        })
    }
}
