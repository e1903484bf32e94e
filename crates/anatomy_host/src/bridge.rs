// SPDX-License-Identifier: MIT OR Apache-2.0
//! Message bridge between a session and the widget page.
//!
//! Commands are encoded and queued to a writer task, so `send` never
//! blocks the session. Inbound lines are decoded by a reader task and
//! forwarded to the driver.

use crate::driver::{DriverEvent, SessionHandle};
use crate::protocol::{self, Control, Inbound};
use anatomy_sync::{RemoteCommand, RemoteWidget, RequestId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Widget handle backed by a line channel
pub struct ChannelWidget {
    /// `None` once destroyed
    lines: Option<mpsc::UnboundedSender<String>>,
}

impl ChannelWidget {
    /// Create a widget handle writing to `lines`
    pub fn new(lines: mpsc::UnboundedSender<String>) -> Self {
        Self { lines: Some(lines) }
    }
}

impl RemoteWidget for ChannelWidget {
    fn send(&mut self, command: RemoteCommand, reply: Option<RequestId>) {
        let Some(lines) = &self.lines else {
            tracing::trace!(command = command.name(), "Widget destroyed; command dropped");
            return;
        };

        match protocol::encode_command(&command, reply) {
            Ok(line) => {
                // Fire-and-forget; a closed writer behaves like a lost message
                let _ = lines.send(line);
            }
            Err(e) => tracing::warn!("Failed to encode {}: {}", command.name(), e),
        }
    }

    fn destroy(&mut self) {
        if self.lines.take().is_some() {
            tracing::debug!("Widget channel released");
        }
    }
}

/// Write queued lines until every sender is gone
pub async fn pump_outbound<W>(mut lines: mpsc::UnboundedReceiver<String>, mut writer: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

/// Read inbound lines and forward them to the driver.
///
/// End of input shuts the session down.
pub async fn pump_inbound<R>(reader: R, handle: SessionHandle) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let inbound = match protocol::decode_line(&line) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!("Skipping line: {}", e);
                continue;
            }
        };

        if handle.send(to_driver_event(inbound)).is_err() {
            // Driver already gone
            return Ok(());
        }
    }

    tracing::info!("Widget channel closed");
    let _ = handle.shutdown();
    Ok(())
}

fn to_driver_event(inbound: Inbound) -> DriverEvent {
    match inbound {
        Inbound::Remote(event) => DriverEvent::Remote(event),
        Inbound::Reply { id, payload } => DriverEvent::Reply { id, payload },
        Inbound::Control(Control::Toggle) => DriverEvent::ToggleMode,
        Inbound::Control(Control::Hide) => DriverEvent::SetHidden(true),
        Inbound::Control(Control::Show) => DriverEvent::SetHidden(false),
        Inbound::Control(Control::SetCamera(bound)) => DriverEvent::SetCamera(bound),
        Inbound::Control(Control::Shutdown) => DriverEvent::Shutdown,
    }
}
