//! In-memory stand-ins for every classroom port.
#![allow(dead_code)]

use async_trait::async_trait;
use classroom_core::{
    domain::{Checkpoint, FinalReview, PreprocessResult, SessionCredential, VideoId},
    ports::{
        AudioFrames, ClassroomBackend, InboundStream, LocalTrack, MediaDevices, OutboundSink,
        PeerHandle, PortError, PortResult, RealtimeConnector, RealtimeLink, VideoPlayer,
    },
    session_config::SessionConfig,
};
use classroom_lib::classroom::{ClassroomDeps, ClassroomSettings, Notice};
use futures::SinkExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::PollSender;

pub const LINK: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub fn checkpoint(time: f64, question: &str) -> Checkpoint {
    Checkpoint {
        time,
        question: question.to_string(),
        segment: format!("transcript before {}", time),
    }
}

//=========================================================================================
// Backend
//=========================================================================================

#[derive(Default)]
pub struct FakeBackend {
    pub checkpoints: Vec<Checkpoint>,
    pub final_review: Option<FinalReview>,
    pub fail_preprocess: bool,
    /// Never answer `/preprocess`.
    pub hold_preprocess: bool,
    /// Never answer `/session-token`.
    pub hold_token: bool,
    /// `None` answers like a backend that forgot the client secret.
    pub credential: Option<String>,
    pub preprocessed: Mutex<Vec<String>>,
    pub token_requests: Mutex<Vec<SessionConfig>>,
}

impl FakeBackend {
    pub fn with_checkpoints(checkpoints: Vec<Checkpoint>) -> Self {
        Self {
            checkpoints,
            credential: Some("ek_fake".to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClassroomBackend for FakeBackend {
    async fn preprocess(&self, youtube_link: &str) -> PortResult<PreprocessResult> {
        self.preprocessed.lock().unwrap().push(youtube_link.to_string());
        if self.hold_preprocess {
            std::future::pending::<()>().await;
        }
        if self.fail_preprocess {
            return Err(PortError::Unavailable("backend down".to_string()));
        }
        Ok(PreprocessResult {
            checkpoints: self.checkpoints.clone(),
            final_review: self.final_review.clone(),
        })
    }

    async fn session_token(&self, config: &SessionConfig) -> PortResult<SessionCredential> {
        self.token_requests.lock().unwrap().push(config.clone());
        if self.hold_token {
            std::future::pending::<()>().await;
        }
        self.credential
            .clone()
            .map(SessionCredential::new)
            .ok_or_else(|| PortError::InvalidResponse("Missing client_secret in response".into()))
    }
}

//=========================================================================================
// Player
//=========================================================================================

#[derive(Default)]
pub struct FakePlayer {
    pub calls: Mutex<Vec<String>>,
    pub time: Mutex<Option<f64>>,
    pub ended: AtomicBool,
}

impl FakePlayer {
    pub fn set_time(&self, time: f64) {
        *self.time.lock().unwrap() = Some(time);
    }

    pub fn finish(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Option<String> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl VideoPlayer for FakePlayer {
    async fn load(&self, video_id: &VideoId) {
        self.calls.lock().unwrap().push(format!("load {}", video_id));
    }

    async fn play(&self) {
        self.calls.lock().unwrap().push("play".to_string());
    }

    async fn pause(&self) {
        self.calls.lock().unwrap().push("pause".to_string());
    }

    async fn current_time(&self) -> Option<f64> {
        *self.time.lock().unwrap()
    }

    async fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

//=========================================================================================
// Microphone
//=========================================================================================

pub struct FakeTrack {
    pub stopped: Arc<AtomicBool>,
}

impl LocalTrack for FakeTrack {
    fn label(&self) -> &str {
        "fake microphone"
    }

    fn take_frames(&mut self) -> Option<AudioFrames> {
        None
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeMedia {
    pub deny: bool,
    pub opened: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeMedia {
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Default::default()
        }
    }

    /// Whether the most recently opened track was stopped.
    pub fn last_stopped(&self) -> bool {
        self.opened
            .lock()
            .unwrap()
            .last()
            .is_some_and(|stopped| stopped.load(Ordering::SeqCst))
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn open_microphone(&self) -> PortResult<Box<dyn LocalTrack>> {
        if self.deny {
            return Err(PortError::PermissionDenied("microphone blocked".to_string()));
        }
        let stopped = Arc::new(AtomicBool::new(false));
        self.opened.lock().unwrap().push(stopped.clone());
        Ok(Box::new(FakeTrack { stopped }))
    }
}

//=========================================================================================
// Realtime transport
//=========================================================================================

/// The service's end of one fake connection.
pub struct Remote {
    /// Everything the session sent.
    pub sent: mpsc::Receiver<String>,
    /// Pushes messages to the session; dropping it hangs up.
    pub push: mpsc::Sender<PortResult<String>>,
    pub closed: Arc<AtomicBool>,
}

impl Remote {
    pub async fn deliver(&self, json: &str) {
        self.push.send(Ok(json.to_string())).await.unwrap();
    }

    /// The next sent event, parsed.
    pub async fn next_sent(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(30), self.sent.recv())
            .await
            .expect("nothing was sent")
            .expect("outbound channel closed");
        serde_json::from_str(&text).unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakePeer {
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl PeerHandle for FakePeer {
    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

pub struct FakeConnector {
    pub fail: bool,
    remotes: mpsc::UnboundedSender<Remote>,
}

impl FakeConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Remote>) {
        let (remotes, rx) = mpsc::unbounded_channel();
        (
            Self {
                fail: false,
                remotes,
            },
            rx,
        )
    }

    pub fn failing() -> Self {
        let (mut connector, _) = Self::new();
        connector.fail = true;
        connector
    }
}

#[async_trait]
impl RealtimeConnector for FakeConnector {
    async fn connect(
        &self,
        credential: &SessionCredential,
        _model: &str,
        _track: &mut dyn LocalTrack,
    ) -> PortResult<RealtimeLink> {
        if self.fail {
            return Err(PortError::Unavailable("no route to the tutor".to_string()));
        }
        assert_eq!(credential.expose(), "ek_fake");

        let (out_tx, out_rx) = mpsc::channel::<String>(64);
        let (in_tx, in_rx) = mpsc::channel::<PortResult<String>>(64);
        let closed = Arc::new(AtomicBool::new(false));

        let outbound: OutboundSink =
            Box::pin(PollSender::new(out_tx).sink_map_err(|_| PortError::Closed));
        let inbound: InboundStream = Box::pin(futures::stream::unfold(in_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        }));

        let _ = self.remotes.send(Remote {
            sent: out_rx,
            push: in_tx,
            closed: closed.clone(),
        });
        Ok(RealtimeLink {
            outbound,
            inbound,
            peer: Box::new(FakePeer { closed }),
        })
    }
}

//=========================================================================================
// Wiring
//=========================================================================================

pub fn deps(
    backend: Arc<FakeBackend>,
    player: Arc<FakePlayer>,
    media: Arc<FakeMedia>,
    connector: FakeConnector,
) -> ClassroomDeps {
    ClassroomDeps {
        settings: ClassroomSettings::default(),
        backend,
        player,
        media,
        connector: Arc::new(connector),
    }
}

/// Waits for the first notice matching `wanted`, skipping the others.
pub async fn wait_for(
    notices: &mut mpsc::UnboundedReceiver<Notice>,
    wanted: impl Fn(&Notice) -> bool,
) -> Notice {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let notice = notices.recv().await.expect("classroom stopped");
            if wanted(&notice) {
                return notice;
            }
        }
    })
    .await
    .expect("notice never arrived")
}

/// Everything already queued, without waiting.
pub fn drain(notices: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut out = Vec::new();
    while let Ok(notice) = notices.try_recv() {
        out.push(notice);
    }
    out
}
