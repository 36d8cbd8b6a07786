//! services/classroom/src/adapters/mpv.rs
//!
//! Video playback through an external `mpv` process driven over its JSON IPC
//! socket. It implements the `VideoPlayer` port from the `core` crate.
//!
//! Every player failure is logged and leaves the player detached; the session
//! keeps running without a video, as it would with a blocked embed.

use async_trait::async_trait;
use classroom_core::{
    domain::VideoId,
    ports::{PortError, PortResult, VideoPlayer},
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_ATTEMPTS: u32 = 50;
const CONNECT_RETRY: Duration = Duration::from_millis(100);

struct MpvConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl MpvConnection {
    fn new(stream: UnixStream) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Sends one command and waits for the reply carrying the same `request_id`.
    /// Events read in the meantime are folded into `ended`.
    async fn request(&mut self, id: u64, command: Value, ended: &AtomicBool) -> PortResult<Value> {
        let mut line = json!({ "command": command, "request_id": id }).to_string();
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| PortError::Unavailable(format!("mpv socket write failed: {}", e)))?;

        loop {
            let next = timeout(REQUEST_TIMEOUT, self.lines.next_line())
                .await
                .map_err(|_| PortError::Unavailable("mpv did not answer".to_string()))?
                .map_err(|e| PortError::Unavailable(format!("mpv socket read failed: {}", e)))?;
            let Some(raw) = next else {
                return Err(PortError::Unavailable("mpv closed the socket".to_string()));
            };
            let message: Value = match serde_json::from_str(&raw) {
                Ok(message) => message,
                Err(e) => {
                    debug!("Ignoring unparseable mpv line: {}", e);
                    continue;
                }
            };

            if let Some(event) = message.get("event").and_then(Value::as_str) {
                if event == "end-file" && message.get("reason").and_then(Value::as_str) == Some("eof")
                {
                    info!("mpv reached the end of the video");
                    ended.store(true, Ordering::SeqCst);
                }
                continue;
            }
            if message.get("request_id").and_then(Value::as_u64) != Some(id) {
                continue;
            }
            return match message.get("error").and_then(Value::as_str) {
                Some("success") => Ok(message.get("data").cloned().unwrap_or(Value::Null)),
                other => Err(PortError::InvalidResponse(
                    other.unwrap_or("missing error field").to_string(),
                )),
            };
        }
    }
}

#[derive(Default)]
struct MpvState {
    connection: Option<MpvConnection>,
    child: Option<Child>,
    next_id: u64,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct MpvPlayer {
    program: Option<PathBuf>,
    socket_path: PathBuf,
    state: Mutex<MpvState>,
    ended: AtomicBool,
}

impl MpvPlayer {
    /// A player that starts `program` on first load, listening on `socket_path`.
    pub fn new(program: impl Into<PathBuf>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
            socket_path: socket_path.into(),
            state: Mutex::new(MpvState::default()),
            ended: AtomicBool::new(false),
        }
    }

    /// A player attached to an already connected IPC socket.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            program: None,
            socket_path: PathBuf::new(),
            state: Mutex::new(MpvState {
                connection: Some(MpvConnection::new(stream)),
                ..MpvState::default()
            }),
            ended: AtomicBool::new(false),
        }
    }

    async fn attach(&self, state: &mut MpvState) -> PortResult<()> {
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| PortError::Unavailable("no player program configured".to_string()))?;

        if state.child.is_none() {
            let _ = std::fs::remove_file(&self.socket_path);
            let child = Command::new(program)
                .arg("--idle=yes")
                .arg("--force-window=yes")
                .arg(format!("--input-ipc-server={}", self.socket_path.display()))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    PortError::Unavailable(format!("failed to start {}: {}", program.display(), e))
                })?;
            state.child = Some(child);
        }

        for _ in 0..CONNECT_ATTEMPTS {
            match UnixStream::connect(&self.socket_path).await {
                Ok(stream) => {
                    state.connection = Some(MpvConnection::new(stream));
                    info!("Attached to mpv at {}", self.socket_path.display());
                    return Ok(());
                }
                Err(_) => tokio::time::sleep(CONNECT_RETRY).await,
            }
        }
        Err(PortError::Unavailable(format!(
            "mpv socket {} never became ready",
            self.socket_path.display()
        )))
    }

    async fn command(&self, state: &mut MpvState, command: Value) -> PortResult<Value> {
        state.next_id += 1;
        let id = state.next_id;
        let connection = state
            .connection
            .as_mut()
            .ok_or_else(|| PortError::Unavailable("player detached".to_string()))?;
        let result = connection.request(id, command, &self.ended).await;
        if let Err(PortError::Unavailable(reason)) = &result {
            warn!("Detaching from mpv: {}", reason);
            state.connection = None;
        }
        result
    }

    async fn set_paused(&self, paused: bool) {
        let mut state = self.state.lock().await;
        if state.connection.is_none() {
            return;
        }
        if let Err(e) = self
            .command(&mut state, json!(["set_property", "pause", paused]))
            .await
        {
            warn!("Failed to set pause={} on mpv: {}", paused, e);
        }
    }
}

//=========================================================================================
// `VideoPlayer` Trait Implementation
//=========================================================================================

#[async_trait]
impl VideoPlayer for MpvPlayer {
    async fn load(&self, video_id: &VideoId) {
        let mut state = self.state.lock().await;
        if state.connection.is_none() {
            if let Err(e) = self.attach(&mut state).await {
                warn!("Video player unavailable: {}", e);
                return;
            }
        }
        self.ended.store(false, Ordering::SeqCst);
        match self
            .command(&mut state, json!(["loadfile", video_id.watch_url(), "replace"]))
            .await
        {
            Ok(_) => info!("Loaded video {}", video_id),
            Err(e) => warn!("Failed to load video {}: {}", video_id, e),
        }
    }

    async fn play(&self) {
        self.set_paused(false).await;
    }

    async fn pause(&self) {
        self.set_paused(true).await;
    }

    async fn current_time(&self) -> Option<f64> {
        let mut state = self.state.lock().await;
        state.connection.as_ref()?;
        match self
            .command(&mut state, json!(["get_property", "time-position"]))
            .await
        {
            Ok(data) => data.as_f64(),
            // No file loaded yet.
            Err(PortError::InvalidResponse(_)) => None,
            Err(e) => {
                debug!("time-position unavailable: {}", e);
                None
            }
        }
    }

    async fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}
