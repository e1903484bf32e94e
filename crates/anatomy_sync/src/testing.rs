// SPDX-License-Identifier: MIT OR Apache-2.0
//! Recording doubles for the widget and audio contracts.

use crate::audio::{AudioBackend, AudioCue, AudioError};
use crate::pose::{CameraPose, Vector3};
use crate::remote::{RemoteCommand, RemoteWidget, RequestId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every command sent to the widget
#[derive(Clone, Default)]
pub struct RecordingWidget {
    pub sent: Arc<Mutex<Vec<(RemoteCommand, Option<RequestId>)>>>,
    pub destroyed: Arc<Mutex<bool>>,
}

impl RecordingWidget {
    pub fn take(&self) -> Vec<(RemoteCommand, Option<RequestId>)> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn camera_sets(&self) -> Vec<CameraPose> {
        self.sent
            .lock()
            .iter()
            .filter_map(|(command, _)| command.camera_pose().copied())
            .collect()
    }

    pub fn last_reply_id(&self) -> Option<RequestId> {
        self.sent.lock().iter().rev().find_map(|(_, id)| *id)
    }
}

impl RemoteWidget for RecordingWidget {
    fn send(&mut self, command: RemoteCommand, reply: Option<RequestId>) {
        self.sent.lock().push((command, reply));
    }

    fn destroy(&mut self) {
        *self.destroyed.lock() = true;
    }
}

/// Records audio calls in order
#[derive(Clone, Default)]
pub struct RecordingCue {
    pub calls: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingCue {
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().clone()
    }
}

impl AudioCue for RecordingCue {
    fn play(&mut self) {
        self.calls.lock().push("play");
    }

    fn pause(&mut self) {
        self.calls.lock().push("pause");
    }

    fn stop(&mut self) {
        self.calls.lock().push("stop");
    }

    fn destroy(&mut self) {
        self.calls.lock().push("destroy");
    }

    fn set_loop(&mut self, looping: bool) {
        self.calls.lock().push(if looping { "loop" } else { "once" });
    }
}

/// Hands out a shared [`RecordingCue`]
#[derive(Clone, Default)]
pub struct RecordingBackend {
    pub cue: RecordingCue,
    pub fail: bool,
}

impl AudioBackend for RecordingBackend {
    fn load(&mut self, source: &str) -> Result<Box<dyn AudioCue>, AudioError> {
        if self.fail {
            return Err(AudioError::NotFound(source.to_string()));
        }
        Ok(Box::new(self.cue.clone()))
    }
}

pub fn pose_at_x(x: f64) -> CameraPose {
    CameraPose::new(
        Vector3::new(x, 0.0, 0.0),
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
    )
}
