//! services/classroom/src/classroom/shell.rs
//!
//! This is the main control loop of the classroom. It owns the screen state,
//! the playback poller, the realtime session and the tutor router, and
//! multiplexes their inputs on a single task.

use crate::classroom::{
    cancellable,
    playback::{playback_events, PlaybackEvent},
    protocol::{Notice, ShellCommand},
    session::{SessionController, SessionError, SessionInbound},
    state::{ClassroomDeps, ClassroomState},
};
use crate::error::ClassroomError;
use classroom_core::{
    checkpoints::{Arrival, CheckpointStore},
    domain::Status,
    events::{EventBody, RealtimeEvent},
    link::parse_link,
    router::{RouterAction, TutorRouter},
    session_config::SessionConfig,
    whiteboard::Tick,
};
use futures::{Stream, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::time::DelayQueue;
use tracing::{debug, error, info, warn};

type PlaybackStream = Pin<Box<dyn Stream<Item = PlaybackEvent> + Send>>;

/// A router action waiting for its delay to pass.
#[derive(Debug)]
enum Scheduled {
    Send(RealtimeEvent),
    EndConversation,
}

async fn next_playback(playback: &mut Option<PlaybackStream>) -> Option<PlaybackEvent> {
    match playback {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

async fn next_command(
    commands: &mut Option<mpsc::Receiver<ShellCommand>>,
) -> Option<ShellCommand> {
    match commands {
        Some(commands) => commands.recv().await,
        None => std::future::pending().await,
    }
}

/// Drives `op` while still reading commands. `Quit` or a closed channel fires
/// `shutdown`, `EndChat` fires `end_chat` when one is given, and anything else
/// is turned away with an alert.
async fn while_listening<F: Future>(
    op: F,
    commands: Option<&mut mpsc::Receiver<ShellCommand>>,
    shutdown: &CancellationToken,
    end_chat: Option<&CancellationToken>,
    notices: &mpsc::UnboundedSender<Notice>,
) -> F::Output {
    let Some(commands) = commands else {
        return op.await;
    };
    tokio::pin!(op);
    loop {
        tokio::select! {
            output = &mut op => return output,
            command = commands.recv(), if !shutdown.is_cancelled() => match (command, end_chat) {
                (Some(ShellCommand::Quit) | None, _) => shutdown.cancel(),
                (Some(ShellCommand::EndChat), Some(end_chat)) => end_chat.cancel(),
                (Some(command), _) => {
                    debug!("Turning away {:?} while busy", command);
                    let busy = Notice::Alert("Still working, try again in a moment.".to_string());
                    if notices.send(busy).is_err() {
                        debug!("Notice dropped, no listener");
                    }
                }
            },
        }
    }
}

pub struct Classroom {
    deps: ClassroomDeps,
    state: ClassroomState,
    session: SessionController,
    router: TutorRouter,
    playback: Option<PlaybackStream>,
    scheduled: DelayQueue<Scheduled>,
    animating: bool,
    /// Held by `run` so long operations can still react to `/end` and `/quit`.
    commands: Option<mpsc::Receiver<ShellCommand>>,
    notices: mpsc::UnboundedSender<Notice>,
    shutdown: CancellationToken,
}

impl Classroom {
    pub fn new(
        deps: ClassroomDeps,
        notices: mpsc::UnboundedSender<Notice>,
        shutdown: CancellationToken,
    ) -> Self {
        let session = SessionController::new(
            deps.backend.clone(),
            deps.media.clone(),
            deps.connector.clone(),
        );
        let router = TutorRouter::new(deps.settings.timings);
        Self {
            deps,
            state: ClassroomState::default(),
            session,
            router,
            playback: None,
            scheduled: DelayQueue::new(),
            animating: false,
            commands: None,
            notices,
            shutdown,
        }
    }

    pub fn state(&self) -> &ClassroomState {
        &self.state
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn router(&self) -> &TutorRouter {
        &self.router
    }

    /// Router actions still waiting for their delay.
    pub fn pending_actions(&self) -> usize {
        self.scheduled.len()
    }

    /// Runs until `Quit`, the command channel closes or the shutdown token fires.
    pub async fn run(
        mut self,
        commands: mpsc::Receiver<ShellCommand>,
    ) -> Result<(), ClassroomError> {
        self.commands = Some(commands);
        let step = self.deps.settings.reveal_interval.max(Duration::from_millis(1));
        let mut reveal = tokio::time::interval(step);
        reveal.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Classroom ready");
        self.notify(Notice::Status(self.state.status));

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                command = next_command(&mut self.commands) => match command {
                    Some(ShellCommand::Quit) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = next_playback(&mut self.playback) => self.on_playback(event).await,
                inbound = self.session.next_event() => self.on_inbound(inbound).await,
                Some(expired) = self.scheduled.next(), if !self.scheduled.is_empty() => {
                    self.on_scheduled(expired.into_inner()).await;
                }
                _ = reveal.tick(), if self.animating => self.tick_board(),
            }
        }

        self.close().await;
        info!("Classroom closed");
        Ok(())
    }

    pub async fn handle_command(&mut self, command: ShellCommand) {
        debug!("Handling {:?}", command);
        match command {
            ShellCommand::Text(text) => match self.state.status {
                Status::WaitingForInput => self.submit_link(&text).await,
                Status::Class if self.state.conversation_mode => self.say(text).await,
                status => {
                    self.notify(Notice::Alert(format!("Nothing to send while in {}.", status)));
                }
            },
            ShellCommand::Pick(index) => self.select_option(index).await,
            ShellCommand::EndChat => {
                if self.state.conversation_mode {
                    info!("User ended the conversation");
                    self.leave_conversation().await;
                } else {
                    self.notify(Notice::Alert("There is no conversation to end.".to_string()));
                }
            }
            ShellCommand::Finish => {
                if !self.set_status(Status::Done) {
                    self.notify(Notice::Alert("The video is not finished yet.".to_string()));
                }
            }
            ShellCommand::Quit => self.shutdown.cancel(),
        }
    }

    /// Validates `link`, preprocesses the video and starts playback.
    pub async fn submit_link(&mut self, link: &str) {
        if self.state.status != Status::WaitingForInput {
            warn!("Ignoring link submitted while in {}", self.state.status);
            return;
        }
        let video_id = match parse_link(link) {
            Ok(video_id) => video_id,
            Err(e) => {
                self.notify(Notice::Alert(e.to_string()));
                return;
            }
        };

        self.set_status(Status::Processing);
        let link = link.trim();
        let preprocess = cancellable(&self.shutdown, self.deps.backend.preprocess(link));
        let Some(result) = while_listening(
            preprocess,
            self.commands.as_mut(),
            &self.shutdown,
            None,
            &self.notices,
        )
        .await
        else {
            return;
        };
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                error!("Preprocessing failed for {}: {}", link, e);
                self.notify(Notice::Error(format!("Could not process the video: {}", e)));
                self.set_status(Status::WaitingForInput);
                return;
            }
        };

        self.state.checkpoints = CheckpointStore::new(result.checkpoints);
        self.state.final_review = result.final_review;
        self.state.video_id = Some(video_id.clone());
        self.set_status(Status::Class);

        self.deps.player.load(&video_id).await;
        self.deps.player.play().await;
        self.playback = Some(Box::pin(playback_events(
            self.deps.player.clone(),
            self.deps.settings.poll_interval,
        )));
    }

    pub async fn on_playback(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::TimeUpdate(time) => {
                if self.state.status != Status::Class || self.state.conversation_mode {
                    return;
                }
                if let Some(arrival) = self.state.checkpoints.observe(time) {
                    self.enter_conversation(arrival).await;
                }
            }
            PlaybackEvent::Ended => {
                if self.state.status != Status::Class {
                    return;
                }
                info!("Video finished, moving to review");
                self.leave_conversation().await;
                self.playback = None;
                if self.set_status(Status::Review) {
                    self.notify(Notice::Review(self.state.final_review.clone()));
                }
            }
        }
    }

    async fn enter_conversation(&mut self, arrival: Arrival) {
        let Some(checkpoint) = self.state.checkpoints.get(arrival.index).cloned() else {
            return;
        };
        if arrival.waiting > 0 {
            info!(
                "Opening checkpoint {}, {} more already passed",
                arrival.index, arrival.waiting
            );
        }

        self.deps.player.pause().await;
        self.state.conversation_mode = true;
        self.router.reset();
        self.notify(Notice::Checkpoint {
            index: arrival.index,
            question: checkpoint.question,
        });
        self.notify(Notice::Conversation(true));

        let config = SessionConfig::for_checkpoint(
            &self.state.checkpoints,
            arrival.index,
            &self.deps.settings.session,
        );
        let end_chat = self.shutdown.child_token();
        let started = while_listening(
            self.session.start(&config, &end_chat),
            self.commands.as_mut(),
            &self.shutdown,
            Some(&end_chat),
            &self.notices,
        )
        .await;
        match started {
            Ok(()) => {
                self.state.checkpoints.mark_asked(arrival.index);
                info!("Tutor session started for checkpoint {}", arrival.index);
            }
            Err(SessionError::Cancelled) if self.shutdown.is_cancelled() => {
                debug!("Session start cancelled by shutdown");
            }
            Err(SessionError::Cancelled) => {
                info!("User ended the conversation before the tutor connected");
                self.leave_conversation().await;
            }
            Err(e) => {
                error!("Failed to start the tutor session: {}", e);
                self.notify(Notice::Error(format!("Could not start the tutor: {}", e)));
                self.leave_conversation().await;
            }
        }
    }

    pub async fn on_inbound(&mut self, inbound: SessionInbound) {
        let event = match inbound {
            SessionInbound::Event(event) => event,
            SessionInbound::Ended => {
                warn!("The tutor session ended unexpectedly");
                self.notify(Notice::Error("The tutor disconnected.".to_string()));
                self.leave_conversation().await;
                return;
            }
        };

        let was_speaking = self.router.is_speaking();
        let board_before = self.router.ui_state();
        let actions = self.router.observe(&event);
        if self.router.is_speaking() != was_speaking {
            self.notify(Notice::Speaking(self.router.is_speaking()));
        }
        let board_changed = !actions.is_empty() || self.router.ui_state() != board_before;
        if matches!(event.body, EventBody::ResponseDone { .. }) && board_changed {
            self.publish_board();
            self.animating = true;
        }
        self.apply(actions).await;
    }

    async fn on_scheduled(&mut self, action: Scheduled) {
        match action {
            Scheduled::Send(event) => {
                self.session.send(event).await;
            }
            Scheduled::EndConversation => {
                info!("Tutor ended the conversation");
                self.leave_conversation().await;
            }
        }
    }

    /// Carries out router actions. Undelayed sends go out now, in order.
    async fn apply(&mut self, actions: Vec<RouterAction>) {
        for action in actions {
            match action {
                RouterAction::Send { event, after } if after.is_zero() => {
                    self.session.send(event).await;
                }
                RouterAction::Send { event, after } => {
                    self.scheduled.insert(Scheduled::Send(event), after);
                }
                RouterAction::EndConversation { after } => {
                    self.scheduled.insert(Scheduled::EndConversation, after);
                }
            }
        }
    }

    /// Tears the session down and resumes the video when still in class.
    pub async fn leave_conversation(&mut self) {
        self.session.stop().await;
        self.router.reset();
        self.scheduled.clear();
        self.animating = false;
        if self.state.conversation_mode {
            self.state.conversation_mode = false;
            self.notify(Notice::Conversation(false));
        }
        if self.state.status == Status::Class {
            self.deps.player.play().await;
        }
    }

    pub async fn select_option(&mut self, index: usize) {
        let actions = self.router.select_option(index);
        if actions.is_empty() {
            self.notify(Notice::Alert("There is no open choice to pick.".to_string()));
            return;
        }
        self.publish_board();
        self.animating = true;
        self.apply(actions).await;
    }

    /// Sends typed text to the tutor and asks it to answer.
    pub async fn say(&mut self, text: String) {
        if self.session.send(RealtimeEvent::user_text(text)).await {
            self.session.send(RealtimeEvent::response_create()).await;
        } else {
            self.notify(Notice::Error("The tutor is not connected.".to_string()));
        }
    }

    fn tick_board(&mut self) {
        match self.router.tick_board() {
            Tick::Idle => self.animating = false,
            Tick::Advanced => {}
            Tick::Completed => self.publish_board(),
        }
    }

    fn publish_board(&self) {
        self.notify(Notice::Board(self.router.board().to_string()));
    }

    fn set_status(&mut self, next: Status) -> bool {
        let moved = self.state.set_status(next);
        if moved {
            info!("Classroom is now in {}", next);
            self.notify(Notice::Status(next));
        }
        moved
    }

    fn notify(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            debug!("Notice dropped, no listener");
        }
    }

    async fn close(&mut self) {
        self.session.stop().await;
        self.scheduled.clear();
        self.playback = None;
        if self.state.video_id.is_some() {
            self.deps.player.pause().await;
        }
    }
}
