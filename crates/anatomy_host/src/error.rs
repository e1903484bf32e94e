// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host errors.

use anatomy_sync::ConfigError;
use thiserror::Error;

/// Errors that stop the host
#[derive(Debug, Error)]
pub enum HostError {
    /// Scene configuration is unusable
    #[error("Scene error: {0}")]
    Config(#[from] ConfigError),

    /// Runtime or stdio failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The session driver has stopped
    #[error("Session driver closed")]
    DriverClosed,
}
