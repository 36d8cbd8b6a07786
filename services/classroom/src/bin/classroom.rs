//! services/classroom/src/bin/classroom.rs
//!
//! Terminal front end: reads commands from stdin and prints notices to stdout.
//! Logs go to stderr.

use classroom_lib::{
    adapters::{CommandMicrophone, HttpBackend, MpvPlayer, WebSocketConnector},
    classroom::{Classroom, ClassroomDeps, ClassroomSettings, Notice, ShellCommand},
    config::Config,
    error::ClassroomError,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_notice(notice: Notice) {
    match notice {
        Notice::Status(status) => println!("[status] {}", status),
        Notice::Alert(message) => println!("[!] {}", message),
        Notice::Error(message) => println!("[error] {}", message),
        Notice::Checkpoint { index, question } => {
            println!("[checkpoint {}] {}", index + 1, question)
        }
        Notice::Conversation(true) => {
            println!("[tutor] Conversation started. Speak, type, or /end to return to the video.")
        }
        Notice::Conversation(false) => println!("[tutor] Back to the video."),
        Notice::Speaking(true) => println!("[tutor] ..."),
        Notice::Speaking(false) => {}
        Notice::Board(board) => println!("{}", board),
        Notice::Review(Some(review)) => {
            println!("== Review ==\n{}", review.summary);
            for (i, question) in review.review_questions.iter().enumerate() {
                println!("  {}. {}", i + 1, question);
            }
            println!("Type /finish when done.");
        }
        Notice::Review(None) => println!("== Review ==\nType /finish when done."),
    }
}

#[tokio::main]
async fn main() -> Result<(), ClassroomError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Starting classroom...");

    // --- 2. Initialize Service Adapters ---
    let client = reqwest::Client::new();
    let backend = HttpBackend::discover(
        client,
        &config.local_api_url,
        config.remote_api_url.as_deref(),
    )
    .await?;
    info!("Using backend at {}", backend.base_url());

    let deps = ClassroomDeps {
        settings: ClassroomSettings::from(&config),
        backend: Arc::new(backend),
        player: Arc::new(MpvPlayer::new(config.mpv_path.clone(), config.mpv_socket.clone())),
        media: Arc::new(CommandMicrophone::new(config.record_command.clone())),
        connector: Arc::new(WebSocketConnector::new(
            config.realtime_ws_url.clone(),
            Some(config.playback_command.clone()),
        )),
    };

    // --- 3. Wire Up Input, Output & Shutdown ---
    let shutdown = CancellationToken::new();
    let (command_tx, command_rx) = mpsc::channel(16);
    let (notice_tx, mut notice_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            print_notice(notice);
        }
    });

    let input_token = shutdown.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                _ = input_token.cancelled() => break,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => match ShellCommand::from_line(&line) {
                    Some(command) => {
                        if command_tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    None if line.trim().starts_with('/') => {
                        println!("[!] Commands: /pick N, /end, /finish, /quit");
                    }
                    None => {}
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    println!("Paste a YouTube link to start.");

    // --- 4. Run the Classroom ---
    Classroom::new(deps, notice_tx, shutdown).run(command_rx).await
}
