// SPDX-License-Identifier: MIT OR Apache-2.0
//! One widget session.
//!
//! A session exists from the moment the widget is shown until it is torn
//! down. It owns the widget handle, the audio cue and every timer, so
//! tearing it down cancels everything at once.
//!
//! The camera may only be driven while the gate is open
//! (`model_ready && !hidden`). Opening the gate resets the widget to the
//! initial pose and then applies the current mode:
//! - manual: push the bound pose
//! - automatic: return to `pose_a` and start the idle animation

use crate::audio::AudioBackend;
use crate::config::{CameraRig, ConfigError, SceneConfig, SyncTimings};
use crate::idle::IdleAnimationDriver;
use crate::pose::{BoundCamera, CameraPose, PartialPose};
use crate::remote::{RemoteCommand, RemoteEvent, RemoteWidget, RequestId, Timeline};
use crate::sync::{CameraSyncController, ExternalChange, RemoteUpdate, Suppression};
use crate::timer::{TimerKind, TimerQueue};
use indexmap::IndexMap;
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

/// Unique identifier for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What to do when a command completes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyAction {
    /// Manual `camera.set` finished
    ReleaseRemoteHold,
    /// Return-to-`pose_a` finished; start idling
    StartIdle,
    /// Reveal reset finished; apply the current mode
    ApplyMode,
    /// `timeline.info` answered
    Timeline,
}

impl ReplyAction {
    /// Completion of a `camera.set`
    fn is_camera(self) -> bool {
        !matches!(self, Self::Timeline)
    }
}

/// Observer of bound-camera writes made by the session
pub type CameraObserver = Box<dyn FnMut(&BoundCamera)>;

/// Runtime state of one shown widget
pub struct Session {
    id: SessionId,
    rig: CameraRig,
    sync: CameraSyncController,
    idle: IdleAnimationDriver,
    timers: TimerQueue,
    remote: Box<dyn RemoteWidget>,
    /// Commands awaiting completion, in issue order. Holds at most one
    /// `camera.set`; a newer one supersedes it.
    pending: IndexMap<RequestId, ReplyAction>,
    next_request: u64,
    model_ready: bool,
    hidden: bool,
    sound: Option<(String, Box<dyn AudioBackend>)>,
    tour_chapter: Option<usize>,
    observers: Vec<CameraObserver>,
    released: bool,
}

impl Session {
    /// Create a session for a freshly embedded widget
    pub fn new(rig: CameraRig, timings: SyncTimings, remote: Box<dyn RemoteWidget>) -> Self {
        let id = SessionId::new();
        tracing::info!(session = %id, "Session created");
        Self {
            id,
            rig,
            sync: CameraSyncController::new(&timings),
            idle: IdleAnimationDriver::new(&rig, &timings),
            timers: TimerQueue::new(),
            remote,
            pending: IndexMap::new(),
            next_request: 0,
            model_ready: false,
            hidden: false,
            sound: None,
            tour_chapter: None,
            observers: Vec::new(),
            released: false,
        }
    }

    /// Create a session from a scene description.
    ///
    /// Declines with [`ConfigError::MissingCamera`] when poses are absent.
    pub fn from_scene(scene: &SceneConfig, remote: Box<dyn RemoteWidget>) -> Result<Self, ConfigError> {
        let rig = scene.rig()?;
        let mut session = Self::new(rig, scene.timings, remote).with_hidden(scene.hidden);
        session.tour_chapter = scene.tour_chapter;
        Ok(session)
    }

    /// Load a looping audio cue once the widget is ready
    pub fn with_sound(mut self, source: impl Into<String>, backend: Box<dyn AudioBackend>) -> Self {
        self.sound = Some((source.into(), backend));
        self
    }

    /// Select a 1-based tour chapter before revealing
    pub fn with_tour_chapter(mut self, chapter: usize) -> Self {
        self.tour_chapter = Some(chapter);
        self
    }

    /// Start hidden or visible
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Adopt the owner's initial binding
    pub fn with_bound(mut self, bound: BoundCamera) -> Self {
        self.sync.seed(bound);
        self
    }

    /// Register an observer for bound-camera writes
    pub fn subscribe(&mut self, observer: impl FnMut(&BoundCamera) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Session identifier
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Bound camera as last known
    pub fn bound_camera(&self) -> BoundCamera {
        self.sync.bound()
    }

    /// Live camera mirror
    pub fn live_camera(&self) -> BoundCamera {
        self.sync.live()
    }

    /// Manual mode: the owner controls the camera
    pub fn is_manual_mode(&self) -> bool {
        self.sync.is_manual()
    }

    /// Automatic mode: the idle animation controls the camera
    pub fn is_auto_mode(&self) -> bool {
        self.sync.is_auto()
    }

    /// Whether the idle animation is running
    pub fn is_animating(&self) -> bool {
        self.idle.is_running()
    }

    /// Whether the widget announced readiness
    pub fn is_ready(&self) -> bool {
        self.model_ready
    }

    /// Whether the widget is shown
    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    /// Whether the camera may be driven
    pub fn is_gate_open(&self) -> bool {
        self.model_ready && !self.hidden
    }

    /// Remote-echo suppression state
    pub fn remote_suppression(&self) -> Suppression {
        self.sync.remote_echo()
    }

    /// Local-echo suppression state
    pub fn local_suppression(&self) -> Suppression {
        self.sync.local_echo()
    }

    /// Commands still awaiting completion
    pub fn pending_replies(&self) -> usize {
        self.pending.len()
    }

    /// Earliest timer deadline; call [`advance`](Self::advance) once it passes
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Dispatch a widget event
    pub fn on_remote_event(&mut self, event: RemoteEvent, now: Instant) {
        match event {
            RemoteEvent::HumanReady => self.on_human_ready(now),
            RemoteEvent::CameraUpdated(update) => self.on_remote_camera_update(&update, now),
        }
    }

    fn on_human_ready(&mut self, now: Instant) {
        if self.model_ready {
            tracing::debug!(session = %self.id, "Duplicate ready announcement ignored");
            return;
        }
        tracing::info!(session = %self.id, "Widget ready");
        self.sync.release_until_ready();

        if let Some((source, backend)) = &mut self.sound {
            match backend.load(source) {
                Ok(cue) => self.idle.set_sound(cue),
                Err(e) => tracing::warn!("Audio cue unavailable: {}", e),
            }
        }

        match self.tour_chapter {
            Some(chapter) => {
                tracing::debug!(chapter, "Selecting tour chapter");
                self.send(RemoteCommand::TimelineInfo, Some(ReplyAction::Timeline));
            }
            None => self.mark_ready(now),
        }
    }

    fn mark_ready(&mut self, now: Instant) {
        self.model_ready = true;
        if self.is_gate_open() {
            self.reveal(now);
        }
    }

    /// The widget reported its live camera
    pub fn on_remote_camera_update(&mut self, update: &PartialPose, now: Instant) {
        match self.sync.remote_update(update, now, &mut self.timers) {
            RemoteUpdate::Staged => tracing::trace!("Remote camera staged"),
            RemoteUpdate::Suppressed => tracing::trace!("Remote camera echo suppressed"),
            RemoteUpdate::Automatic => tracing::trace!("Remote camera ignored in automatic mode"),
            RemoteUpdate::Incomplete => tracing::debug!("Remote camera update missing fields"),
        }
    }

    /// The owner changed the bound camera
    pub fn notify_external_change(&mut self, value: impl Into<BoundCamera>, now: Instant) {
        match self.sync.external_change(value.into(), &mut self.timers) {
            ExternalChange::Applied => {
                tracing::debug!(manual = self.sync.is_manual(), "Bound camera changed");
                self.apply_mode(now);
            }
            ExternalChange::Unchanged => tracing::trace!("Bound camera unchanged"),
            ExternalChange::Suppressed => tracing::trace!("Bound camera echo suppressed"),
        }
    }

    /// Switch between manual (at the center pose) and automatic mode
    pub fn toggle_mode(&mut self, now: Instant) {
        let bound = self.sync.toggle(self.rig.pose_center, &mut self.timers);
        tracing::debug!(manual = bound.is_manual(), "Mode toggled");
        self.notify_observers();
        self.apply_mode(now);
    }

    /// Show or hide the widget
    pub fn set_hidden(&mut self, hidden: bool, now: Instant) {
        if self.hidden == hidden {
            return;
        }
        self.hidden = hidden;

        if hidden {
            tracing::debug!(session = %self.id, "Widget hidden");
            self.idle.stop(&mut self.timers);
            self.drop_camera_replies();
            if self.sync.clear(&mut self.timers) {
                self.notify_observers();
            }
        } else if self.model_ready {
            tracing::debug!(session = %self.id, "Widget shown");
            self.reveal(now);
        }
    }

    /// A command sent with a reply id completed
    pub fn on_reply(&mut self, id: RequestId, payload: Value, now: Instant) {
        let Some(action) = self.pending.shift_remove(&id) else {
            tracing::trace!(id = id.value(), "Unknown or late reply ignored");
            return;
        };

        match action {
            ReplyAction::ReleaseRemoteHold => self.sync.extend_remote_hold(now, &mut self.timers),
            ReplyAction::StartIdle => {
                self.sync.extend_remote_hold(now, &mut self.timers);
                if self.is_gate_open() && self.sync.is_auto() {
                    self.idle.start(now, &mut self.timers);
                }
            }
            ReplyAction::ApplyMode => {
                self.sync.extend_remote_hold(now, &mut self.timers);
                self.apply_mode(now);
            }
            ReplyAction::Timeline => {
                self.select_chapter(payload);
                self.mark_ready(now);
            }
        }
    }

    fn select_chapter(&mut self, payload: Value) {
        let Some(chapter) = self.tour_chapter else {
            return;
        };
        let timeline: Timeline = match serde_json::from_value(payload) {
            Ok(timeline) => timeline,
            Err(e) => {
                tracing::warn!("Malformed timeline info: {}", e);
                return;
            }
        };
        match timeline.chapter(chapter) {
            Some(chapter_id) => {
                let command = RemoteCommand::TimelineSet {
                    chapter_id: chapter_id.clone(),
                };
                self.send(command, None);
            }
            None => tracing::warn!(chapter, "Tour chapter not found"),
        }
    }

    /// Fire every timer due at `now`
    pub fn advance(&mut self, now: Instant) {
        while let Some((kind, deadline)) = self.timers.pop_due(now) {
            match kind {
                TimerKind::AnimationTick => {
                    if let Some(pose) = self.idle.tick(deadline, now, &mut self.timers) {
                        self.sync.hold_remote(now, &mut self.timers);
                        self.remote.send(RemoteCommand::CameraSet { pose, animate: false }, None);
                    }
                }
                TimerKind::RemoteDebounce => {
                    if let Some(bound) = self.sync.flush_live(now, &mut self.timers) {
                        tracing::debug!("Remote camera propagated to binding");
                        debug_assert!(bound.is_manual());
                        self.notify_observers();
                    }
                }
                TimerKind::LocalEchoRelease | TimerKind::RemoteEchoRelease => self.sync.on_release(kind),
            }
        }
    }

    /// Stop everything and release the widget and audio.
    ///
    /// Pending completions are forgotten; nothing fires afterwards.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.timers.clear();
        self.pending.clear();
        self.idle.release(&mut self.timers);
        self.remote.destroy();
        self.observers.clear();
        tracing::info!(session = %self.id, "Session torn down");
    }

    fn reveal(&mut self, now: Instant) {
        let pose = self.rig.pose_init.unwrap_or(self.rig.pose_a);
        self.send_camera(pose, false, ReplyAction::ApplyMode, now);
    }

    fn apply_mode(&mut self, now: Instant) {
        if !self.is_gate_open() {
            return;
        }

        match self.sync.bound().pose().copied() {
            Some(pose) => {
                self.idle.stop(&mut self.timers);
                self.send_camera(pose, true, ReplyAction::ReleaseRemoteHold, now);
            }
            None => {
                let pose = self.rig.pose_a;
                self.send_camera(pose, true, ReplyAction::StartIdle, now);
            }
        }
    }

    fn send_camera(&mut self, pose: CameraPose, animate: bool, action: ReplyAction, now: Instant) {
        self.drop_camera_replies();
        self.sync.hold_remote(now, &mut self.timers);
        self.send(RemoteCommand::CameraSet { pose, animate }, Some(action));
    }

    fn send(&mut self, command: RemoteCommand, action: Option<ReplyAction>) {
        let reply = action.map(|action| {
            self.next_request += 1;
            let id = RequestId(self.next_request);
            self.pending.insert(id, action);
            id
        });
        tracing::trace!(command = command.name(), "Sending widget command");
        self.remote.send(command, reply);
    }

    /// Forget outstanding `camera.set` completions; late ones are then ignored
    fn drop_camera_replies(&mut self) {
        let before = self.pending.len();
        self.pending.retain(|_, action| !action.is_camera());
        if self.pending.len() < before {
            tracing::trace!("Superseded camera completion dropped");
        }
    }

    fn notify_observers(&mut self) {
        let bound = self.sync.bound();
        for observer in &mut self.observers {
            observer(&bound);
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{pose_at_x, RecordingBackend, RecordingWidget};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    fn rig(pose_init: Option<CameraPose>) -> CameraRig {
        CameraRig {
            pose_a: pose_at_x(0.0),
            pose_b: pose_at_x(10.0),
            pose_center: pose_at_x(5.0),
            pose_init,
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn session(pose_init: Option<CameraPose>) -> (Session, RecordingWidget) {
        let widget = RecordingWidget::default();
        let session = Session::new(rig(pose_init), SyncTimings::default(), Box::new(widget.clone()));
        (session, widget)
    }

    /// Complete the most recent command expecting a reply
    fn ack(session: &mut Session, widget: &RecordingWidget, now: Instant) {
        let id = widget.last_reply_id().unwrap();
        session.on_reply(id, Value::Null, now);
    }

    /// Ready, revealed and idling
    fn idling(start: Instant) -> (Session, RecordingWidget) {
        let (mut session, widget) = session(None);
        session.on_remote_event(RemoteEvent::HumanReady, start);
        ack(&mut session, &widget, start);
        ack(&mut session, &widget, start);
        assert!(session.is_animating());
        widget.take();
        (session, widget)
    }

    #[test]
    fn test_ready_reveals_then_idles() {
        let start = Instant::now();
        let (mut session, widget) = session(None);
        assert!(!session.is_gate_open());

        session.on_remote_event(RemoteEvent::HumanReady, start);
        assert!(session.is_ready());
        let sent = widget.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RemoteCommand::CameraSet { pose: pose_at_x(0.0), animate: false });

        session.on_reply(sent[0].1.unwrap(), Value::Null, start + ms(10));
        let sent = widget.take();
        assert_eq!(sent[0].0, RemoteCommand::CameraSet { pose: pose_at_x(0.0), animate: true });
        assert!(!session.is_animating());

        session.on_reply(sent[0].1.unwrap(), Value::Null, start + ms(20));
        assert!(session.is_animating());

        session.advance(start + ms(50));
        let frames = widget.camera_sets();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].position.x < 0.01);
    }

    #[test]
    fn test_reveal_applies_init_pose() {
        let start = Instant::now();
        let (mut session, widget) = session(Some(pose_at_x(42.0)));
        session.on_remote_event(RemoteEvent::HumanReady, start);
        assert_eq!(widget.camera_sets(), vec![pose_at_x(42.0)]);
    }

    #[test]
    fn test_idle_frames_follow_oscillation() {
        let start = Instant::now();
        let (mut session, widget) = idling(start);

        // Advance to half a cycle in tick-sized steps
        let mut now = start;
        while now < start + Duration::from_secs(10) {
            now += ms(30);
            session.advance(now);
        }
        let frames = widget.camera_sets();
        assert!(frames.len() > 300);
        let last = frames.last().unwrap();
        assert!((last.position.x - 10.0).abs() < 0.01);
    }

    #[test]
    fn test_manual_pose_stops_animation_before_next_tick() {
        let start = Instant::now();
        let (mut session, widget) = idling(start);

        session.notify_external_change(Some(pose_at_x(5.0)), start + ms(10));
        assert!(!session.is_animating());
        assert!(session.is_manual_mode());

        session.advance(start + ms(100));
        let sent = widget.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RemoteCommand::CameraSet { pose: pose_at_x(5.0), animate: true });
    }

    #[test]
    fn test_remote_update_during_suppression_is_dropped() {
        let start = Instant::now();
        let (mut session, widget) = idling(start);
        session.notify_external_change(Some(pose_at_x(5.0)), start);
        assert_eq!(session.remote_suppression(), Suppression::Active);

        session.on_remote_camera_update(&PartialPose::from(pose_at_x(7.0)), start + ms(100));
        session.advance(start + ms(200));
        assert_eq!(session.bound_camera(), BoundCamera::manual(pose_at_x(5.0)));
        assert_eq!(session.live_camera(), BoundCamera::manual(pose_at_x(5.0)));

        // The completion holds suppression one more window
        ack(&mut session, &widget, start + ms(300));
        session.advance(start + ms(700));
        assert_eq!(session.remote_suppression(), Suppression::Active);
        session.advance(start + ms(800));
        assert_eq!(session.remote_suppression(), Suppression::Inactive);
    }

    #[test]
    fn test_remote_update_propagates_after_quiet_period() {
        let start = Instant::now();
        let (mut session, widget) = idling(start);
        let writes = Rc::new(RefCell::new(Vec::new()));
        let sink = writes.clone();
        session.subscribe(move |bound| sink.borrow_mut().push(*bound));

        session.notify_external_change(Some(pose_at_x(5.0)), start);
        ack(&mut session, &widget, start);
        session.advance(start + ms(600));
        widget.take();

        // A burst of updates coalesces into one write
        for (i, offset) in [600, 700, 800].into_iter().enumerate() {
            let update = PartialPose::from(pose_at_x(6.0 + i as f64));
            session.on_remote_camera_update(&update, start + ms(offset));
        }
        session.advance(start + ms(1200));
        assert!(writes.borrow().is_empty());
        assert_eq!(session.live_camera(), BoundCamera::manual(pose_at_x(8.0)));

        session.advance(start + ms(1300));
        assert_eq!(*writes.borrow(), vec![BoundCamera::manual(pose_at_x(8.0))]);
        assert_eq!(session.bound_camera(), BoundCamera::manual(pose_at_x(8.0)));

        // The owner's echo does not go back to the widget
        session.notify_external_change(Some(pose_at_x(8.0)), start + ms(1310));
        assert!(widget.take().is_empty());
    }

    #[test]
    fn test_remote_update_ignored_in_auto_mode() {
        let start = Instant::now();
        let (mut session, _widget) = idling(start);
        session.advance(start + ms(1000));
        session.on_remote_camera_update(&PartialPose::from(pose_at_x(3.0)), start + ms(1000));
        session.advance(start + ms(2000));
        assert!(session.is_auto_mode());
        assert!(session.is_animating());
    }

    #[test]
    fn test_double_toggle_returns_to_auto() {
        let start = Instant::now();
        let (mut session, widget) = idling(start);

        session.toggle_mode(start + ms(5));
        assert!(session.is_manual_mode());
        session.toggle_mode(start + ms(10));
        assert!(session.is_auto_mode());
        assert!(!session.is_animating());

        let sent = widget.take();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, RemoteCommand::CameraSet { pose: pose_at_x(5.0), animate: true });
        assert_eq!(sent[1].0, RemoteCommand::CameraSet { pose: pose_at_x(0.0), animate: true });

        // Only the return to auto is still awaited
        assert_eq!(session.pending_replies(), 1);
        session.on_reply(sent[0].1.unwrap(), Value::Null, start + ms(50));
        assert!(!session.is_animating());
        session.on_reply(sent[1].1.unwrap(), Value::Null, start + ms(60));
        assert!(session.is_animating());
        assert_eq!(session.pending_replies(), 0);
    }

    #[test]
    fn test_start_idle_skipped_if_manual_again() {
        let start = Instant::now();
        let (mut session, widget) = session(None);
        session.on_remote_event(RemoteEvent::HumanReady, start);
        ack(&mut session, &widget, start);
        let return_to_a = widget.last_reply_id().unwrap();

        session.toggle_mode(start + ms(5));
        session.on_reply(return_to_a, Value::Null, start + ms(10));
        assert!(!session.is_animating());
    }

    #[test]
    fn test_hide_and_show() {
        let start = Instant::now();
        let widget = RecordingWidget::default();
        let backend = RecordingBackend::default();
        let cue = backend.cue.clone();
        let mut session = Session::new(rig(Some(pose_at_x(42.0))), SyncTimings::default(), Box::new(widget.clone()))
            .with_sound("loop.ogg", Box::new(backend));

        session.on_remote_event(RemoteEvent::HumanReady, start);
        ack(&mut session, &widget, start);
        ack(&mut session, &widget, start);
        assert!(session.is_animating());
        session.toggle_mode(start + ms(10));
        let manual_set = widget.last_reply_id().unwrap();
        widget.take();

        session.set_hidden(true, start + ms(20));
        assert!(!session.is_animating());
        assert!(session.is_auto_mode());
        assert!(session.live_camera().is_auto());
        assert_eq!(cue.calls(), vec!["loop", "play", "pause", "pause"]);

        // Late completion while hidden does not restart anything
        session.on_reply(manual_set, Value::Null, start + ms(30));
        session.advance(start + ms(100));
        assert!(widget.take().is_empty());

        session.set_hidden(false, start + ms(200));
        assert_eq!(widget.camera_sets(), vec![pose_at_x(42.0)]);
        ack(&mut session, &widget, start + ms(210));
        ack(&mut session, &widget, start + ms(220));
        assert!(session.is_animating());
        assert_eq!(cue.calls().last(), Some(&"play"));
    }

    #[test]
    fn test_show_resumes_from_fresh_cycle() {
        let start = Instant::now();
        let (mut session, widget) = idling(start);

        // Run a quarter cycle, half way to pose_b
        let mut now = start;
        while now < start + Duration::from_secs(5) {
            now += ms(30);
            session.advance(now);
        }
        let before_hide = *widget.camera_sets().last().unwrap();
        assert!(before_hide.position.x > 4.0);
        widget.take();

        session.set_hidden(true, now);
        session.set_hidden(false, now + ms(100));
        let sent = widget.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RemoteCommand::CameraSet { pose: pose_at_x(0.0), animate: false });

        session.on_reply(sent[0].1.unwrap(), Value::Null, now + ms(110));
        let sent = widget.take();
        assert_eq!(sent[0].0, RemoteCommand::CameraSet { pose: pose_at_x(0.0), animate: true });
        session.on_reply(sent[0].1.unwrap(), Value::Null, now + ms(120));
        assert!(session.is_animating());

        session.advance(now + ms(150));
        let frames = widget.camera_sets();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].position.x < 0.01);
    }

    #[test]
    fn test_completion_from_before_hide_is_ignored() {
        let start = Instant::now();
        let (mut session, widget) = session(None);
        session.on_remote_event(RemoteEvent::HumanReady, start);
        ack(&mut session, &widget, start);
        let stale_start_idle = widget.last_reply_id().unwrap();

        session.set_hidden(true, start + ms(10));
        assert_eq!(session.pending_replies(), 0);
        session.set_hidden(false, start + ms(20));
        let reveal = widget.last_reply_id().unwrap();
        widget.take();

        session.on_reply(stale_start_idle, Value::Null, start + ms(30));
        assert!(!session.is_animating());
        assert!(widget.take().is_empty());

        // Reveal completes, then the return to pose_a
        session.on_reply(reveal, Value::Null, start + ms(40));
        let sent = widget.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, RemoteCommand::CameraSet { pose: pose_at_x(0.0), animate: true });
        assert!(!session.is_animating());
        session.on_reply(sent[0].1.unwrap(), Value::Null, start + ms(50));
        assert!(session.is_animating());
    }

    #[test]
    fn test_lost_completions_do_not_accumulate() {
        let start = Instant::now();
        let (mut session, _widget) = idling(start);

        let mut now = start;
        for i in 0..1000 {
            session.notify_external_change(Some(pose_at_x(f64::from(i % 2) + 5.0)), now);
            now += ms(900);
            session.advance(now);
            assert!(session.pending_replies() <= 1);
        }
        assert_eq!(session.remote_suppression(), Suppression::Inactive);
    }

    #[test]
    fn test_hidden_session_waits_for_show() {
        let start = Instant::now();
        let (session, widget) = session(None);
        let mut session = session.with_hidden(true);
        session.on_remote_event(RemoteEvent::HumanReady, start);
        assert!(session.is_ready());
        assert!(widget.take().is_empty());

        session.notify_external_change(Some(pose_at_x(5.0)), start);
        assert!(widget.take().is_empty());

        session.set_hidden(false, start + ms(10));
        assert_eq!(widget.camera_sets().len(), 1);
        ack(&mut session, &widget, start + ms(20));
        let sent = widget.take();
        assert_eq!(sent.last().unwrap().0, RemoteCommand::CameraSet { pose: pose_at_x(5.0), animate: true });
        assert!(!session.is_animating());
    }

    #[test]
    fn test_lost_completion_self_heals() {
        let start = Instant::now();
        let (mut session, _widget) = idling(start);
        session.notify_external_change(Some(pose_at_x(5.0)), start);

        // No completion ever arrives
        session.advance(start + ms(500));
        assert_eq!(session.remote_suppression(), Suppression::Inactive);

        session.on_remote_camera_update(&PartialPose::from(pose_at_x(9.0)), start + ms(600));
        session.advance(start + ms(1100));
        assert_eq!(session.bound_camera(), BoundCamera::manual(pose_at_x(9.0)));
    }

    #[test]
    fn test_updates_before_ready_are_suppressed() {
        let start = Instant::now();
        let (session, _widget) = session(None);
        let mut session = session.with_bound(BoundCamera::manual(pose_at_x(5.0)));
        assert_eq!(session.remote_suppression(), Suppression::UntilReady);

        session.on_remote_camera_update(&PartialPose::from(pose_at_x(9.0)), start);
        session.advance(start + ms(1000));
        assert_eq!(session.bound_camera(), BoundCamera::manual(pose_at_x(5.0)));
    }

    #[test]
    fn test_tour_chapter_selected_before_ready() {
        let start = Instant::now();
        let (session, widget) = session(None);
        let mut session = session.with_tour_chapter(2);

        session.on_remote_event(RemoteEvent::HumanReady, start);
        assert!(!session.is_ready());
        let sent = widget.take();
        assert_eq!(sent[0].0, RemoteCommand::TimelineInfo);

        let info = serde_json::json!({"chapters": ["intro", "heart", "lungs"]});
        session.on_reply(sent[0].1.unwrap(), info, start + ms(10));
        assert!(session.is_ready());
        let sent = widget.take();
        assert_eq!(sent[0].0, RemoteCommand::TimelineSet { chapter_id: serde_json::json!("heart") });
        assert_eq!(sent[1].0, RemoteCommand::CameraSet { pose: pose_at_x(0.0), animate: false });
    }

    #[test]
    fn test_audio_failure_is_not_fatal() {
        let start = Instant::now();
        let widget = RecordingWidget::default();
        let backend = RecordingBackend { fail: true, ..RecordingBackend::default() };
        let mut session = Session::new(rig(None), SyncTimings::default(), Box::new(widget.clone()))
            .with_sound("missing.ogg", Box::new(backend));

        session.on_remote_event(RemoteEvent::HumanReady, start);
        ack(&mut session, &widget, start);
        ack(&mut session, &widget, start);
        assert!(session.is_animating());
    }

    #[test]
    fn test_unknown_reply_ignored() {
        let start = Instant::now();
        let (mut session, widget) = idling(start);
        session.on_reply(RequestId(999), Value::Null, start);
        assert!(session.is_animating());
        assert!(widget.take().is_empty());
    }

    #[test]
    fn test_teardown_releases_everything() {
        let start = Instant::now();
        let widget = RecordingWidget::default();
        let backend = RecordingBackend::default();
        let cue = backend.cue.clone();
        let mut session = Session::new(rig(None), SyncTimings::default(), Box::new(widget.clone()))
            .with_sound("loop.ogg", Box::new(backend));
        session.on_remote_event(RemoteEvent::HumanReady, start);
        ack(&mut session, &widget, start);
        ack(&mut session, &widget, start);

        session.teardown();
        assert!(*widget.destroyed.lock());
        assert_eq!(cue.calls().last(), Some(&"destroy"));
    }

    #[test]
    fn test_from_scene_requires_poses() {
        let scene = SceneConfig::default();
        let result = Session::from_scene(&scene, Box::new(RecordingWidget::default()));
        assert!(matches!(result, Err(ConfigError::MissingCamera(_))));
    }
}
