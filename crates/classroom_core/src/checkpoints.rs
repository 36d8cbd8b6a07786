//! crates/classroom_core/src/checkpoints.rs
//!
//! The ordered checkpoint list of a video and the cursor that tracks which
//! checkpoint playback is heading towards.

use crate::domain::Checkpoint;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// A checkpoint whose conversation should open now.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival {
    pub index: usize,
    /// Checkpoints already passed that are still waiting for their own
    /// conversation. Non-zero after a seek or a stalled poller.
    pub waiting: usize,
}

/// Holds the checkpoints sorted by time and a cursor into them.
///
/// The cursor starts at 0, only moves forward, and stops at `len()`. Every
/// checkpoint the cursor passes is queued and handed out by `observe` exactly
/// once, oldest first.
#[derive(Debug, Clone, Default)]
pub struct CheckpointStore {
    checkpoints: Vec<Checkpoint>,
    cursor: usize,
    pending: VecDeque<usize>,
    asked: Vec<bool>,
}

impl CheckpointStore {
    pub fn new(mut checkpoints: Vec<Checkpoint>) -> Self {
        for checkpoint in &mut checkpoints {
            if !(checkpoint.time >= 0.0) {
                warn!("Clamping invalid checkpoint time {} to 0", checkpoint.time);
                checkpoint.time = 0.0;
            }
        }
        // Stable, so duplicate times keep their backend order.
        checkpoints.sort_by(|a, b| a.time.total_cmp(&b.time));
        let asked = vec![false; checkpoints.len()];
        Self {
            checkpoints,
            cursor: 0,
            pending: VecDeque::new(),
            asked,
        }
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn get(&self, index: usize) -> Option<&Checkpoint> {
        self.checkpoints.get(index)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// True once every checkpoint has been passed and handed out.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.checkpoints.len() && self.pending.is_empty()
    }

    /// Records that the conversation for `index` actually took place.
    pub fn mark_asked(&mut self, index: usize) {
        if let Some(asked) = self.asked.get_mut(index) {
            *asked = true;
        }
    }

    pub fn was_asked(&self, index: usize) -> bool {
        self.asked.get(index).copied().unwrap_or(false)
    }

    /// Feeds one playback-time sample.
    ///
    /// Moves the cursor past every checkpoint whose time is `<= time`, queues
    /// them, and hands out the oldest queued one. Returns `None` when nothing
    /// is waiting.
    pub fn observe(&mut self, time: f64) -> Option<Arrival> {
        let start = self.cursor;
        while self
            .checkpoints
            .get(self.cursor)
            .is_some_and(|checkpoint| time >= checkpoint.time)
        {
            self.pending.push_back(self.cursor);
            self.cursor += 1;
        }
        if self.cursor > start + 1 {
            warn!(
                "Playback passed checkpoints {}..{} in one step at {:.1}s",
                start, self.cursor, time
            );
        }

        let index = self.pending.pop_front()?;
        debug!("Reached checkpoint {} at {:.1}s", index, time);
        Some(Arrival {
            index,
            waiting: self.pending.len(),
        })
    }
}
