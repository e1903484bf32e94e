// SPDX-License-Identifier: MIT OR Apache-2.0
//! Remote widget contract.
//!
//! The widget is an opaque, message-driven endpoint. Commands are
//! fire-and-forget; a command sent with a [`RequestId`] is answered later by
//! a completion that the host feeds back through
//! [`Session::on_reply`](crate::Session::on_reply). Completions may never
//! arrive.

use crate::pose::{CameraPose, PartialPose};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Correlation id for a command expecting a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Get the raw ID value
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Commands understood by the widget
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCommand {
    /// Move the camera, optionally with the widget's own smooth transition
    CameraSet {
        /// Target pose
        pose: CameraPose,
        /// Let the widget animate the move
        animate: bool,
    },
    /// Ask for the tour timeline
    TimelineInfo,
    /// Jump to a tour chapter
    TimelineSet {
        /// Chapter identifier as reported by `timeline.info`
        chapter_id: Value,
    },
}

impl RemoteCommand {
    /// Wire command name
    pub fn name(&self) -> &'static str {
        match self {
            Self::CameraSet { .. } => "camera.set",
            Self::TimelineInfo => "timeline.info",
            Self::TimelineSet { .. } => "timeline.set",
        }
    }

    /// Wire payload
    pub fn payload(&self) -> Value {
        match self {
            Self::CameraSet { pose, animate } => {
                let mut payload = json!({
                    "position": pose.position,
                    "target": pose.target,
                    "up": pose.up,
                });
                if *animate {
                    payload["animate"] = Value::Bool(true);
                }
                payload
            }
            Self::TimelineInfo => Value::Null,
            Self::TimelineSet { chapter_id } => json!({ "chapterId": chapter_id }),
        }
    }

    /// The pose carried by a `camera.set`
    pub fn camera_pose(&self) -> Option<&CameraPose> {
        match self {
            Self::CameraSet { pose, .. } => Some(pose),
            _ => None,
        }
    }
}

/// Events emitted by the widget
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// The widget's live camera moved
    CameraUpdated(PartialPose),
    /// The scene finished loading
    HumanReady,
}

impl RemoteEvent {
    /// Decode an event by wire name. Unknown events yield `None`.
    pub fn decode(name: &str, payload: Value) -> Option<Result<Self, serde_json::Error>> {
        match name {
            "camera.updated" => Some(serde_json::from_value(payload).map(Self::CameraUpdated)),
            "human.ready" => Some(Ok(Self::HumanReady)),
            _ => None,
        }
    }
}

/// Tour timeline as reported by `timeline.info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Chapter identifiers in tour order
    #[serde(default)]
    pub chapters: Vec<Value>,
}

impl Timeline {
    /// Chapter id for a 1-based chapter number
    pub fn chapter(&self, number: usize) -> Option<&Value> {
        number.checked_sub(1).and_then(|index| self.chapters.get(index))
    }
}

/// Handle to the embedded widget
pub trait RemoteWidget {
    /// Send a command. When `reply` is set, the host reports its completion
    /// back to the session under that id.
    fn send(&mut self, command: RemoteCommand, reply: Option<RequestId>);

    /// Release the widget's message channel
    fn destroy(&mut self);
}
