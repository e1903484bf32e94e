// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON-lines wire format between the host and the widget page.
//!
//! Outbound, one command per line:
//! `{"id": 3, "command": "camera.set", "payload": {...}}`
//!
//! Inbound, one message per line, one of:
//! - widget events: `{"event": "camera.updated", "payload": {...}}`
//! - completions: `{"reply": 3, "payload": ...}`
//! - owner controls: `{"control": "toggle"}`

use anatomy_sync::{BoundCamera, RemoteCommand, RemoteEvent, RequestId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire format errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Line was not valid JSON or had the wrong shape
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    /// Unknown owner control
    #[error("Unknown control: {0}")]
    UnknownControl(String),
}

/// Outbound command line
#[derive(Debug, Serialize)]
struct CommandMessage<'a> {
    id: Option<u64>,
    command: &'a str,
    payload: Value,
}

/// Outbound binding notification line
#[derive(Debug, Serialize)]
struct BindingMessage<'a> {
    binding: &'a BoundCamera,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InboundMessage {
    Event {
        event: String,
        #[serde(default)]
        payload: Value,
    },
    Reply {
        reply: u64,
        #[serde(default)]
        payload: Value,
    },
    Control {
        control: String,
        #[serde(default)]
        payload: Value,
    },
}

/// Owner-side controls
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    /// Flip manual/automatic mode
    Toggle,
    /// Hide the widget
    Hide,
    /// Show the widget
    Show,
    /// Replace the bound camera
    SetCamera(BoundCamera),
    /// End the session
    Shutdown,
}

/// A decoded inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Widget event
    Remote(RemoteEvent),
    /// Completion of a command
    Reply {
        /// Command id
        id: RequestId,
        /// Completion payload
        payload: Value,
    },
    /// Owner control
    Control(Control),
}

/// Encode a widget command
pub fn encode_command(command: &RemoteCommand, reply: Option<RequestId>) -> Result<String, ProtocolError> {
    let message = CommandMessage {
        id: reply.map(|id| id.value()),
        command: command.name(),
        payload: command.payload(),
    };
    Ok(serde_json::to_string(&message)?)
}

/// Encode a bound-camera notification for the owner
pub fn encode_binding(binding: &BoundCamera) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&BindingMessage { binding })?)
}

/// Decode one inbound line.
///
/// Blank lines and unknown widget events yield `Ok(None)`.
pub fn decode_line(line: &str) -> Result<Option<Inbound>, ProtocolError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<InboundMessage>(line)? {
        InboundMessage::Event { event, payload } => match RemoteEvent::decode(&event, payload) {
            Some(decoded) => Ok(Some(Inbound::Remote(decoded?))),
            None => {
                tracing::trace!(event, "Unhandled widget event");
                Ok(None)
            }
        },
        InboundMessage::Reply { reply, payload } => Ok(Some(Inbound::Reply {
            id: RequestId(reply),
            payload,
        })),
        InboundMessage::Control { control, payload } => {
            let control = match control.as_str() {
                "toggle" => Control::Toggle,
                "hide" => Control::Hide,
                "show" => Control::Show,
                "set_camera" => Control::SetCamera(serde_json::from_value(payload)?),
                "shutdown" => Control::Shutdown,
                _ => return Err(ProtocolError::UnknownControl(control)),
            };
            Ok(Some(Inbound::Control(control)))
        }
    }
}
