// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio cue contract.
//!
//! Playback itself belongs to the host. The session only decides when the
//! cue plays, pauses, and is released.

use thiserror::Error;

/// Audio errors
#[derive(Debug, Error)]
pub enum AudioError {
    /// No output device
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    /// The source could not be found
    #[error("Audio source not found: {0}")]
    NotFound(String),

    /// The source could not be decoded
    #[error("Failed to decode audio source {source_name}: {reason}")]
    Decode {
        /// Source that failed
        source_name: String,
        /// Decoder message
        reason: String,
    },
}

/// A loaded, controllable sound
pub trait AudioCue {
    /// Start or resume playback
    fn play(&mut self);

    /// Pause, keeping the position
    fn pause(&mut self);

    /// Stop and rewind
    fn stop(&mut self);

    /// Release the underlying resources
    fn destroy(&mut self);

    /// Restart automatically when the end is reached
    fn set_loop(&mut self, looping: bool);
}

/// Loads audio cues by source locator
pub trait AudioBackend {
    /// Load a cue. The returned cue is paused.
    fn load(&mut self, source: &str) -> Result<Box<dyn AudioCue>, AudioError>;
}
