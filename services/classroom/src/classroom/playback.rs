//! services/classroom/src/classroom/playback.rs
//!
//! Polls the video player at a fixed cadence and turns its state into
//! playback events for the shell.

use async_stream::stream;
use classroom_core::ports::VideoPlayer;
use futures::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackEvent {
    /// The current position in seconds.
    TimeUpdate(f64),
    /// The video finished. Yielded once, after which the stream ends.
    Ended,
}

/// Ticks every `period` while the stream is held. Dropping the stream stops
/// the timer.
pub fn playback_events(
    player: Arc<dyn VideoPlayer>,
    period: Duration,
) -> impl Stream<Item = PlaybackEvent> + Send {
    stream! {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Some(time) = player.current_time().await {
                yield PlaybackEvent::TimeUpdate(time);
            }
            if player.has_ended().await {
                debug!("Playback ended");
                yield PlaybackEvent::Ended;
                break;
            }
        }
    }
}
