// SPDX-License-Identifier: MIT OR Apache-2.0
//! Async driver for a single session.
//!
//! The driver owns the [`Session`] and processes events strictly in arrival
//! order. Between events it sleeps until the session's next timer deadline
//! and then advances it. Everything runs on one task, so the session never
//! sees concurrent calls.

use crate::error::HostError;
use anatomy_sync::{BoundCamera, RemoteEvent, RequestId, Session};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant};

/// Events fed to the driver
#[derive(Debug, Clone)]
pub enum DriverEvent {
    /// Widget event
    Remote(RemoteEvent),
    /// Completion of a command
    Reply {
        /// Command id
        id: RequestId,
        /// Completion payload
        payload: Value,
    },
    /// Owner replaced the bound camera
    SetCamera(BoundCamera),
    /// Owner flipped the mode
    ToggleMode,
    /// Owner changed visibility
    SetHidden(bool),
    /// Tear the session down
    Shutdown,
}

/// Snapshot of session state for observers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStatus {
    /// Widget announced readiness
    pub ready: bool,
    /// Widget is shown
    pub visible: bool,
    /// Bound camera holds a pose
    pub manual: bool,
    /// Idle animation running
    pub animating: bool,
    /// Commands awaiting completion
    pub pending_replies: usize,
}

impl DriverStatus {
    fn capture(session: &Session) -> Self {
        Self {
            ready: session.is_ready(),
            visible: session.is_visible(),
            manual: session.is_manual_mode(),
            animating: session.is_animating(),
            pending_replies: session.pending_replies(),
        }
    }
}

/// Cloneable handle for feeding a running driver
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<DriverEvent>,
    camera: watch::Receiver<BoundCamera>,
    status: Arc<RwLock<DriverStatus>>,
}

impl SessionHandle {
    /// Queue an event
    pub fn send(&self, event: DriverEvent) -> Result<(), HostError> {
        self.events.send(event).map_err(|_| HostError::DriverClosed)
    }

    /// Replace the bound camera
    pub fn set_camera(&self, bound: BoundCamera) -> Result<(), HostError> {
        self.send(DriverEvent::SetCamera(bound))
    }

    /// Flip manual/automatic mode
    pub fn toggle_mode(&self) -> Result<(), HostError> {
        self.send(DriverEvent::ToggleMode)
    }

    /// Show or hide the widget
    pub fn set_hidden(&self, hidden: bool) -> Result<(), HostError> {
        self.send(DriverEvent::SetHidden(hidden))
    }

    /// Tear the session down
    pub fn shutdown(&self) -> Result<(), HostError> {
        self.send(DriverEvent::Shutdown)
    }

    /// Bound-camera writes made by the session
    pub fn watch_camera(&self) -> watch::Receiver<BoundCamera> {
        self.camera.clone()
    }

    /// Latest state snapshot
    pub fn status(&self) -> DriverStatus {
        *self.status.read()
    }
}

/// Runs a session until shutdown
pub struct SessionDriver {
    session: Session,
    events: mpsc::UnboundedReceiver<DriverEvent>,
    status: Arc<RwLock<DriverStatus>>,
}

impl SessionDriver {
    /// Wrap a session and create its handle
    pub fn new(mut session: Session) -> (Self, SessionHandle) {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (camera_tx, camera) = watch::channel(session.bound_camera());
        session.subscribe(move |bound| {
            camera_tx.send_replace(*bound);
        });

        let status = Arc::new(RwLock::new(DriverStatus::capture(&session)));
        let handle = SessionHandle {
            events: events_tx,
            camera,
            status: status.clone(),
        };
        (Self { session, events, status }, handle)
    }

    /// Process events and timers until shutdown or until every handle is gone
    pub async fn run(self) {
        let Self {
            mut session,
            mut events,
            status,
        } = self;
        tracing::info!(session = %session.id(), "Driver started");

        loop {
            let deadline = session.next_deadline();
            let sleep = async move {
                match deadline {
                    Some(at) => time::sleep_until(Instant::from_std(at)).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                event = events.recv() => match event {
                    Some(DriverEvent::Shutdown) | None => break,
                    Some(event) => dispatch(&mut session, event),
                },
                () = sleep => session.advance(Instant::now().into_std()),
            }

            *status.write() = DriverStatus::capture(&session);
        }

        session.teardown();
        tracing::info!("Driver stopped");
    }
}

fn dispatch(session: &mut Session, event: DriverEvent) {
    let now = Instant::now().into_std();
    match event {
        DriverEvent::Remote(event) => session.on_remote_event(event, now),
        DriverEvent::Reply { id, payload } => session.on_reply(id, payload, now),
        DriverEvent::SetCamera(bound) => session.notify_external_change(bound, now),
        DriverEvent::ToggleMode => session.toggle_mode(now),
        DriverEvent::SetHidden(hidden) => session.set_hidden(hidden, now),
        DriverEvent::Shutdown => {}
    }
}
