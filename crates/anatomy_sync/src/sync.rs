// SPDX-License-Identifier: MIT OR Apache-2.0
//! Two-way camera binding with echo suppression.
//!
//! The controller holds the bound camera (owned by the caller, mirrored
//! here) and the live camera (the debounced mirror of the widget). Two
//! time-boxed suppression flags break feedback loops:
//! - local echo: a bound-camera change caused by our own remote-update
//!   handler must not be pushed back to the widget
//! - remote echo: a `camera.updated` caused by our own `camera.set` must not
//!   be written into the bound camera
//!
//! The controller only decides. Sending commands and running the idle
//! animation is left to [`Session`](crate::Session).

use crate::config::SyncTimings;
use crate::pose::{BoundCamera, CameraPose, PartialPose};
use crate::timer::{TimerKind, TimerQueue};
use std::time::{Duration, Instant};

/// Echo suppression state for one direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Suppression {
    /// Updates pass through
    #[default]
    Inactive,
    /// Held until the widget announces readiness
    UntilReady,
    /// Held until the matching release timer fires
    Active,
}

impl Suppression {
    /// Whether updates are currently dropped
    pub fn is_held(&self) -> bool {
        !matches!(self, Suppression::Inactive)
    }
}

/// Outcome of an external bound-camera change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalChange {
    /// Accepted; the widget must follow
    Applied,
    /// Same as the current binding
    Unchanged,
    /// Echo of our own write
    Suppressed,
}

/// Outcome of a remote camera update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteUpdate {
    /// Written to the live camera; propagates after the debounce
    Staged,
    /// Echo of our own `camera.set`
    Suppressed,
    /// Automatic mode owns the camera
    Automatic,
    /// Missing position, target or up
    Incomplete,
}

/// Bound/live camera state and echo suppression
#[derive(Debug, Clone)]
pub struct CameraSyncController {
    bound: BoundCamera,
    live: BoundCamera,
    local_echo: Suppression,
    remote_echo: Suppression,
    suppression: Duration,
    debounce: Duration,
}

impl CameraSyncController {
    /// Create a controller in automatic mode.
    ///
    /// Remote updates stay suppressed until [`release_until_ready`](Self::release_until_ready).
    pub fn new(timings: &SyncTimings) -> Self {
        Self {
            bound: BoundCamera::auto(),
            live: BoundCamera::auto(),
            local_echo: Suppression::Inactive,
            remote_echo: Suppression::UntilReady,
            suppression: timings.suppression(),
            debounce: timings.debounce(),
        }
    }

    /// Current bound camera
    pub fn bound(&self) -> BoundCamera {
        self.bound
    }

    /// Current live camera mirror
    pub fn live(&self) -> BoundCamera {
        self.live
    }

    /// Manual mode: the bound camera holds a pose
    pub fn is_manual(&self) -> bool {
        self.bound.is_manual()
    }

    /// Automatic mode: the idle animation owns the camera
    pub fn is_auto(&self) -> bool {
        self.bound.is_auto()
    }

    /// Suppression of external changes
    pub fn local_echo(&self) -> Suppression {
        self.local_echo
    }

    /// Suppression of remote updates
    pub fn remote_echo(&self) -> Suppression {
        self.remote_echo
    }

    /// The caller changed the bound camera
    pub fn external_change(&mut self, value: BoundCamera, timers: &mut TimerQueue) -> ExternalChange {
        if self.local_echo.is_held() {
            return ExternalChange::Suppressed;
        }
        if value == self.bound {
            return ExternalChange::Unchanged;
        }
        self.accept(value, timers);
        ExternalChange::Applied
    }

    /// Flip between manual (at `center`) and automatic mode.
    ///
    /// A toggle is a local action, so local-echo suppression does not apply.
    pub fn toggle(&mut self, center: CameraPose, timers: &mut TimerQueue) -> BoundCamera {
        let next = if self.is_manual() {
            BoundCamera::auto()
        } else {
            BoundCamera::manual(center)
        };
        self.accept(next, timers);
        next
    }

    fn accept(&mut self, value: BoundCamera, timers: &mut TimerQueue) {
        self.bound = value;
        self.live = value;
        // A pending remote write is stale now
        timers.cancel(TimerKind::RemoteDebounce);
    }

    /// The widget reported its live camera
    pub fn remote_update(&mut self, update: &PartialPose, now: Instant, timers: &mut TimerQueue) -> RemoteUpdate {
        if self.remote_echo.is_held() {
            return RemoteUpdate::Suppressed;
        }
        if self.is_auto() {
            return RemoteUpdate::Automatic;
        }
        let Some(pose) = update.complete() else {
            return RemoteUpdate::Incomplete;
        };

        self.live = BoundCamera::manual(pose);
        self.hold_local(now, timers);
        timers.schedule(TimerKind::RemoteDebounce, now + self.debounce);
        RemoteUpdate::Staged
    }

    /// Debounce elapsed: propagate the live camera into the bound camera.
    ///
    /// Returns the new bound camera if it changed. Never writes outside
    /// manual mode.
    pub fn flush_live(&mut self, now: Instant, timers: &mut TimerQueue) -> Option<BoundCamera> {
        if self.bound.is_auto() || self.live.is_auto() || self.live == self.bound {
            return None;
        }
        self.bound = self.live;
        // The owner will echo this value back; keep ignoring it for a window
        self.hold_local(now, timers);
        Some(self.bound)
    }

    fn hold_local(&mut self, now: Instant, timers: &mut TimerQueue) {
        self.local_echo = Suppression::Active;
        timers.schedule(TimerKind::LocalEchoRelease, now + self.suppression);
    }

    /// Assert remote-echo suppression ahead of an outbound `camera.set`.
    ///
    /// The release is armed immediately, so a lost completion heals after
    /// one window.
    pub fn hold_remote(&mut self, now: Instant, timers: &mut TimerQueue) {
        self.remote_echo = Suppression::Active;
        timers.schedule(TimerKind::RemoteEchoRelease, now + self.suppression);
    }

    /// A `camera.set` completed: keep suppressing for one window from now
    pub fn extend_remote_hold(&mut self, now: Instant, timers: &mut TimerQueue) {
        if self.remote_echo == Suppression::Active {
            timers.schedule(TimerKind::RemoteEchoRelease, now + self.suppression);
        }
    }

    /// The widget is ready; lift the start-up suppression
    pub fn release_until_ready(&mut self) {
        if self.remote_echo == Suppression::UntilReady {
            self.remote_echo = Suppression::Inactive;
        }
    }

    /// A release timer fired
    pub fn on_release(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::LocalEchoRelease => self.local_echo = Suppression::Inactive,
            TimerKind::RemoteEchoRelease => {
                if self.remote_echo == Suppression::Active {
                    self.remote_echo = Suppression::Inactive;
                }
            }
            TimerKind::AnimationTick | TimerKind::RemoteDebounce => {}
        }
    }

    /// Drop the binding and any pending remote write.
    ///
    /// Returns whether the bound camera changed.
    pub fn clear(&mut self, timers: &mut TimerQueue) -> bool {
        let changed = self.bound.is_manual();
        self.accept(BoundCamera::auto(), timers);
        timers.cancel(TimerKind::LocalEchoRelease);
        self.local_echo = Suppression::Inactive;
        changed
    }

    /// Adopt the caller's initial binding without side effects
    pub fn seed(&mut self, value: BoundCamera) {
        self.bound = value;
        self.live = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::pose_at_x;

    fn controller() -> (CameraSyncController, TimerQueue) {
        let mut sync = CameraSyncController::new(&SyncTimings::default());
        sync.release_until_ready();
        (sync, TimerQueue::new())
    }

    #[test]
    fn test_remote_suppressed_until_ready() {
        let mut sync = CameraSyncController::new(&SyncTimings::default());
        let mut timers = TimerQueue::new();
        sync.seed(BoundCamera::manual(pose_at_x(1.0)));

        let update = PartialPose::from(pose_at_x(2.0));
        assert_eq!(sync.remote_update(&update, Instant::now(), &mut timers), RemoteUpdate::Suppressed);

        sync.release_until_ready();
        assert_eq!(sync.remote_update(&update, Instant::now(), &mut timers), RemoteUpdate::Staged);
    }

    #[test]
    fn test_remote_update_ignored_in_auto_mode() {
        let (mut sync, mut timers) = controller();
        let update = PartialPose::from(pose_at_x(2.0));
        assert_eq!(sync.remote_update(&update, Instant::now(), &mut timers), RemoteUpdate::Automatic);
        assert!(sync.bound().is_auto());
        assert!(timers.is_empty());
    }

    #[test]
    fn test_incomplete_update_is_dropped() {
        let (mut sync, mut timers) = controller();
        sync.seed(BoundCamera::manual(pose_at_x(1.0)));
        let update = PartialPose {
            position: Some(pose_at_x(3.0).position),
            ..PartialPose::default()
        };
        assert_eq!(sync.remote_update(&update, Instant::now(), &mut timers), RemoteUpdate::Incomplete);
        assert_eq!(sync.live(), BoundCamera::manual(pose_at_x(1.0)));
    }

    #[test]
    fn test_staged_update_propagates_after_debounce() {
        let (mut sync, mut timers) = controller();
        let now = Instant::now();
        sync.seed(BoundCamera::manual(pose_at_x(1.0)));

        let update = PartialPose::from(pose_at_x(2.0));
        assert_eq!(sync.remote_update(&update, now, &mut timers), RemoteUpdate::Staged);
        assert_eq!(sync.live(), BoundCamera::manual(pose_at_x(2.0)));
        assert_eq!(sync.bound(), BoundCamera::manual(pose_at_x(1.0)));
        assert!(sync.local_echo().is_held());

        let later = now + Duration::from_millis(500);
        assert_eq!(sync.flush_live(later, &mut timers), Some(BoundCamera::manual(pose_at_x(2.0))));
        // The owner's echo of the write is ignored
        assert_eq!(
            sync.external_change(BoundCamera::manual(pose_at_x(2.0)), &mut timers),
            ExternalChange::Suppressed
        );
    }

    #[test]
    fn test_remote_hold_blocks_updates() {
        let (mut sync, mut timers) = controller();
        let now = Instant::now();
        sync.seed(BoundCamera::manual(pose_at_x(1.0)));
        sync.hold_remote(now, &mut timers);

        let update = PartialPose::from(pose_at_x(2.0));
        assert_eq!(sync.remote_update(&update, now, &mut timers), RemoteUpdate::Suppressed);
        assert_eq!(sync.bound(), BoundCamera::manual(pose_at_x(1.0)));

        sync.on_release(TimerKind::RemoteEchoRelease);
        assert_eq!(sync.remote_update(&update, now, &mut timers), RemoteUpdate::Staged);
    }

    #[test]
    fn test_extend_only_while_active() {
        let (mut sync, mut timers) = controller();
        let now = Instant::now();
        sync.extend_remote_hold(now, &mut timers);
        assert!(!timers.is_pending(TimerKind::RemoteEchoRelease));

        sync.hold_remote(now, &mut timers);
        let ack = now + Duration::from_millis(200);
        sync.extend_remote_hold(ack, &mut timers);
        assert_eq!(
            timers.deadline(TimerKind::RemoteEchoRelease),
            Some(ack + Duration::from_millis(500))
        );
    }

    #[test]
    fn test_external_change_cancels_pending_write() {
        let (mut sync, mut timers) = controller();
        let now = Instant::now();
        sync.seed(BoundCamera::manual(pose_at_x(1.0)));
        sync.remote_update(&PartialPose::from(pose_at_x(2.0)), now, &mut timers);
        sync.on_release(TimerKind::LocalEchoRelease);

        assert_eq!(sync.external_change(BoundCamera::auto(), &mut timers), ExternalChange::Applied);
        assert!(!timers.is_pending(TimerKind::RemoteDebounce));
        assert_eq!(sync.flush_live(now, &mut timers), None);
        assert!(sync.bound().is_auto());
    }

    #[test]
    fn test_unchanged_external_value() {
        let (mut sync, mut timers) = controller();
        assert_eq!(sync.external_change(BoundCamera::auto(), &mut timers), ExternalChange::Unchanged);
    }

    #[test]
    fn test_toggle_flips_mode() {
        let (mut sync, mut timers) = controller();
        assert_eq!(sync.toggle(pose_at_x(5.0), &mut timers), BoundCamera::manual(pose_at_x(5.0)));
        assert!(sync.is_manual());
        assert_eq!(sync.toggle(pose_at_x(5.0), &mut timers), BoundCamera::auto());
        assert!(sync.is_auto());
    }

    #[test]
    fn test_clear_reports_change() {
        let (mut sync, mut timers) = controller();
        assert!(!sync.clear(&mut timers));
        sync.seed(BoundCamera::manual(pose_at_x(1.0)));
        assert!(sync.clear(&mut timers));
        assert!(sync.live().is_auto());
    }
}
