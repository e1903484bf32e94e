// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deadline queue for session timers.
//!
//! Each timer kind has at most one pending deadline. Cancelling removes the
//! entry outright, so a cancelled timer can never fire.

use indexmap::IndexMap;
use std::time::Instant;

/// Timers owned by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Next idle animation frame
    AnimationTick,
    /// Propagate the live camera into the bound camera
    RemoteDebounce,
    /// Stop ignoring external camera changes
    LocalEchoRelease,
    /// Stop ignoring remote camera updates
    RemoteEchoRelease,
}

/// Pending deadlines keyed by kind
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    deadlines: IndexMap<TimerKind, Instant>,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer, replacing any pending deadline of the same kind
    pub fn schedule(&mut self, kind: TimerKind, at: Instant) {
        // Re-insert so ties resolve by most recent arming
        self.deadlines.shift_remove(&kind);
        self.deadlines.insert(kind, at);
    }

    /// Disarm a timer. Returns whether it was pending.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.deadlines.shift_remove(&kind).is_some()
    }

    /// Whether a timer is pending
    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.deadlines.contains_key(&kind)
    }

    /// Deadline of a pending timer
    pub fn deadline(&self, kind: TimerKind) -> Option<Instant> {
        self.deadlines.get(&kind).copied()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    /// Remove and return the earliest timer due at `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerKind, Instant)> {
        let (index, _) = self
            .deadlines
            .iter()
            .enumerate()
            .filter(|(_, (_, at))| **at <= now)
            .min_by_key(|(index, (_, at))| (**at, *index))
            .map(|(index, (kind, at))| (index, (*kind, *at)))?;

        self.deadlines.shift_remove_index(index)
    }

    /// Disarm everything
    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    /// Whether no timer is pending
    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}
