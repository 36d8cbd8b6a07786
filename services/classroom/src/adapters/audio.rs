//! services/classroom/src/adapters/audio.rs
//!
//! Microphone capture and speaker playback through command-line audio tools
//! (ALSA's `arecord`/`aplay` by default). Both exchange raw mono PCM16.
//! It implements the `MediaDevices` port from the `core` crate.

use crate::config::split_command;
use async_stream::stream;
use async_trait::async_trait;
use classroom_core::ports::{AudioFrames, LocalTrack, MediaDevices, PortError, PortResult};
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

/// 100 ms of 24 kHz mono PCM16.
const FRAME_BYTES: usize = 4_800;

fn spawn_error(program: &str, e: std::io::Error) -> PortError {
    match e.kind() {
        ErrorKind::PermissionDenied => {
            PortError::PermissionDenied(format!("not allowed to run {}: {}", program, e))
        }
        ErrorKind::NotFound => PortError::Unavailable(format!("{} is not installed", program)),
        _ => PortError::Unexpected(format!("failed to start {}: {}", program, e)),
    }
}

//=========================================================================================
// Microphone
//=========================================================================================

/// Opens microphones by running the configured capture command.
#[derive(Clone, Debug)]
pub struct CommandMicrophone {
    command: String,
}

impl CommandMicrophone {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// A running capture process. Its stdout is the PCM stream.
pub struct ProcessTrack {
    label: String,
    child: Child,
    frames: Option<AudioFrames>,
}

impl LocalTrack for ProcessTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn take_frames(&mut self) -> Option<AudioFrames> {
        self.frames.take()
    }

    fn stop(&mut self) {
        if let Err(e) = self.child.start_kill() {
            // Already exited.
            debug!("Capture process for {} not killed: {}", self.label, e);
        }
    }
}

#[async_trait]
impl MediaDevices for CommandMicrophone {
    async fn open_microphone(&self) -> PortResult<Box<dyn LocalTrack>> {
        let (program, args) =
            split_command(&self.command).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&program, e))?;

        // A capture tool that cannot open the device exits right away.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        if let Ok(Some(status)) = child.try_wait() {
            return Err(PortError::PermissionDenied(format!(
                "{} exited with {} while opening the microphone",
                program, status
            )));
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| PortError::Unexpected("capture process has no stdout".to_string()))?;
        let frames: AudioFrames = Box::pin(stream! {
            let mut buffer = vec![0u8; FRAME_BYTES];
            loop {
                match stdout.read(&mut buffer).await {
                    Ok(0) => break,
                    Ok(n) => {
                        yield buffer[..n].to_vec();
                    }
                    Err(e) => {
                        warn!("Microphone read failed: {}", e);
                        break;
                    }
                }
            }
        });

        info!("Microphone opened with {}", program);
        Ok(Box::new(ProcessTrack {
            label: program,
            child,
            frames: Some(frames),
        }))
    }
}

//=========================================================================================
// Speaker
//=========================================================================================

/// Plays PCM by piping it into the configured playback command.
pub struct CommandSpeaker {
    child: Child,
    stdin: ChildStdin,
}

impl CommandSpeaker {
    pub fn spawn(command: &str) -> PortResult<Self> {
        let (program, args) =
            split_command(command).map_err(|e| PortError::Unexpected(e.to_string()))?;
        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&program, e))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PortError::Unexpected("playback process has no stdin".to_string()))?;
        Ok(Self { child, stdin })
    }

    pub async fn write(&mut self, pcm: &[u8]) -> PortResult<()> {
        self.stdin
            .write_all(pcm)
            .await
            .map_err(|e| PortError::Unexpected(format!("speaker write failed: {}", e)))
    }

    pub fn stop(&mut self) {
        let _ = self.child.start_kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn missing_capture_tool_is_reported() {
        let microphone = CommandMicrophone::new("classroom-test-no-such-recorder -q");
        let err = microphone.open_microphone().await.err().unwrap();
        assert!(matches!(err, PortError::Unavailable(_)), "{err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_output_becomes_frames() {
        let microphone = CommandMicrophone::new("yes");
        let mut track = microphone.open_microphone().await.unwrap();
        let mut frames = track.take_frames().unwrap();
        let first = frames.next().await.unwrap();
        assert!(!first.is_empty());
        assert!(track.take_frames().is_none());
        track.stop();
        track.stop();
    }
}
