// SPDX-License-Identifier: MIT OR Apache-2.0
//! Idle animation between two camera poses.
//!
//! While running, every tick evaluates a raised-cosine oscillation from
//! `pose_a` to `pose_b` and back over one cycle. Restarting resets the cycle
//! start, so a resumed animation always begins at `pose_a`.

use crate::audio::AudioCue;
use crate::config::{CameraRig, SyncTimings};
use crate::pose::{ease_cycle, CameraPose};
use crate::timer::{TimerKind, TimerQueue};
use std::time::{Duration, Instant};

/// Drives the idle oscillation and its audio cue
pub struct IdleAnimationDriver {
    pose_a: CameraPose,
    pose_b: CameraPose,
    /// One full A -> B -> A cycle
    cycle: Duration,
    /// Tick period
    period: Duration,
    /// Set iff the animation is running
    started_at: Option<Instant>,
    sound: Option<Box<dyn AudioCue>>,
}

impl IdleAnimationDriver {
    /// Create a stopped driver
    pub fn new(rig: &CameraRig, timings: &SyncTimings) -> Self {
        Self {
            pose_a: rig.pose_a,
            pose_b: rig.pose_b,
            cycle: timings.cycle(),
            period: timings.tick(),
            started_at: None,
            sound: None,
        }
    }

    /// Attach a looping audio cue that follows the animation
    pub fn set_sound(&mut self, mut cue: Box<dyn AudioCue>) {
        if let Some(mut old) = self.sound.take() {
            old.destroy();
        }
        cue.set_loop(true);
        if self.is_running() {
            cue.play();
        }
        self.sound = Some(cue);
    }

    /// Whether an audio cue is attached
    pub fn has_sound(&self) -> bool {
        self.sound.is_some()
    }

    /// Whether the oscillation is running
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Start a fresh cycle. Returns false if already running.
    pub fn start(&mut self, now: Instant, timers: &mut TimerQueue) -> bool {
        if self.is_running() {
            return false;
        }

        if let Some(sound) = &mut self.sound {
            sound.play();
        }

        self.started_at = Some(now);
        timers.schedule(TimerKind::AnimationTick, now + self.period);
        tracing::debug!("Idle animation started");
        true
    }

    /// Stop the oscillation and pause the cue. Returns whether it was running.
    pub fn stop(&mut self, timers: &mut TimerQueue) -> bool {
        timers.cancel(TimerKind::AnimationTick);

        // The cue is paused even when idle; it may have been started elsewhere
        if let Some(sound) = &mut self.sound {
            sound.pause();
        }

        let was_running = self.started_at.take().is_some();
        if was_running {
            tracing::debug!("Idle animation stopped");
        }
        was_running
    }

    /// Pose of the oscillation at `now`
    pub fn pose_at(&self, now: Instant) -> CameraPose {
        let elapsed = self
            .started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        let x = elapsed.as_secs_f64() / self.cycle.as_secs_f64();
        CameraPose::lerp(&self.pose_a, &self.pose_b, ease_cycle(x))
    }

    /// Handle an elapsed tick: re-arm and return the frame pose
    pub fn tick(&mut self, deadline: Instant, now: Instant, timers: &mut TimerQueue) -> Option<CameraPose> {
        if !self.is_running() {
            return None;
        }

        let mut next = deadline + self.period;
        if next <= now {
            // Fell behind; skip missed frames instead of bursting
            next = now + self.period;
        }
        timers.schedule(TimerKind::AnimationTick, next);

        let pose = self.pose_at(now);
        tracing::trace!(?pose, "Idle animation frame");
        Some(pose)
    }

    /// Stop and release the audio cue
    pub fn release(&mut self, timers: &mut TimerQueue) {
        self.stop(timers);
        if let Some(mut sound) = self.sound.take() {
            sound.destroy();
        }
    }
}
