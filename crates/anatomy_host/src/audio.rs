// SPDX-License-Identifier: MIT OR Apache-2.0
//! Audio cue playback for the host.
//!
//! This module provides:
//! - Source path resolution against the scene's directory
//! - A rodio-backed cue (when the "audio" feature is enabled)
//!
//! When the "audio" feature is not enabled, a stub implementation is provided
//! that logs a warning once but does not play audio.

use std::path::{Path, PathBuf};

/// Resolve a cue locator to an existing file
fn resolve_source(assets_path: Option<&Path>, source: &str) -> Option<PathBuf> {
    if source.is_empty() {
        return None;
    }

    let source_path = PathBuf::from(source);

    // If it's an absolute path, use it directly
    if source_path.is_absolute() {
        return source_path.exists().then_some(source_path);
    }

    // Try relative to the scene directory
    if let Some(assets) = assets_path {
        let full_path = assets.join(&source_path);
        if full_path.exists() {
            return Some(full_path);
        }
    }

    // Try as-is
    source_path.exists().then_some(source_path)
}

// ============================================================================
// Audio Implementation (with rodio)
// ============================================================================

#[cfg(feature = "audio")]
mod engine {
    use super::*;
    use anatomy_sync::{AudioBackend, AudioCue, AudioError};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use std::fs::File;
    use std::io::BufReader;

    /// A cue bound to one sink
    struct SinkCue {
        stream_handle: OutputStreamHandle,
        sink: Option<Sink>,
        path: PathBuf,
        looping: bool,
    }

    impl SinkCue {
        /// Queue the clip if the sink ran dry or was stopped
        fn ensure_queued(&mut self) {
            if self.sink.as_ref().is_some_and(|sink| !sink.empty()) {
                return;
            }

            let file = match File::open(&self.path) {
                Ok(f) => f,
                Err(e) => {
                    tracing::warn!("Failed to open audio file {:?}: {}", self.path, e);
                    return;
                }
            };
            let source = match Decoder::new(BufReader::new(file)) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Failed to decode audio file {:?}: {}", self.path, e);
                    return;
                }
            };
            let sink = match Sink::try_new(&self.stream_handle) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Failed to create audio sink: {}", e);
                    return;
                }
            };

            sink.pause();
            if self.looping {
                sink.append(source.repeat_infinite());
            } else {
                sink.append(source);
            }
            self.sink = Some(sink);
        }
    }

    impl AudioCue for SinkCue {
        fn play(&mut self) {
            self.ensure_queued();
            if let Some(sink) = &self.sink {
                sink.play();
            }
        }

        fn pause(&mut self) {
            if let Some(sink) = &self.sink {
                sink.pause();
            }
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn destroy(&mut self) {
            self.stop();
            tracing::debug!("Released audio cue {:?}", self.path);
        }

        fn set_loop(&mut self, looping: bool) {
            if self.looping != looping {
                self.looping = looping;
                // Re-queue with the new looping mode on next play
                self.stop();
            }
        }
    }

    /// Audio backend owning the output stream
    pub struct HostAudio {
        /// Output stream (must be kept alive)
        _stream: Option<OutputStream>,
        /// Stream handle for creating sinks
        stream_handle: Option<OutputStreamHandle>,
        /// Directory for relative sources
        assets_path: Option<PathBuf>,
    }

    impl HostAudio {
        pub fn new(assets_path: Option<PathBuf>) -> Self {
            let (stream, stream_handle) = match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    tracing::info!("Audio output initialized");
                    (Some(stream), Some(handle))
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize audio: {}. Audio will be disabled.", e);
                    (None, None)
                }
            };

            Self {
                _stream: stream,
                stream_handle,
                assets_path,
            }
        }
    }

    impl AudioBackend for HostAudio {
        fn load(&mut self, source: &str) -> Result<Box<dyn AudioCue>, AudioError> {
            let stream_handle = self
                .stream_handle
                .clone()
                .ok_or_else(|| AudioError::Unavailable("no output device".to_string()))?;
            let path = resolve_source(self.assets_path.as_deref(), source)
                .ok_or_else(|| AudioError::NotFound(source.to_string()))?;

            // Validate the clip up front so a bad file surfaces at load time
            let file = File::open(&path).map_err(|_| AudioError::NotFound(source.to_string()))?;
            Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
                source_name: source.to_string(),
                reason: e.to_string(),
            })?;

            tracing::info!("Loaded audio cue {:?}", path);
            Ok(Box::new(SinkCue {
                stream_handle,
                sink: None,
                path,
                looping: false,
            }))
        }
    }
}

// ============================================================================
// Stub Audio Implementation (without rodio)
// ============================================================================

#[cfg(not(feature = "audio"))]
mod engine {
    use super::*;
    use anatomy_sync::{AudioBackend, AudioCue, AudioError};

    /// Cue that only tracks its state
    struct SilentCue {
        path: PathBuf,
        playing: bool,
    }

    impl AudioCue for SilentCue {
        fn play(&mut self) {
            if !self.playing {
                tracing::trace!("Silent cue {:?} playing", self.path);
            }
            self.playing = true;
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn stop(&mut self) {
            self.playing = false;
        }

        fn destroy(&mut self) {
            self.playing = false;
        }

        fn set_loop(&mut self, _looping: bool) {}
    }

    /// Audio backend stub (no audio support)
    pub struct HostAudio {
        /// Directory for relative sources
        assets_path: Option<PathBuf>,
        /// Log warning once
        warned: bool,
    }

    impl HostAudio {
        pub fn new(assets_path: Option<PathBuf>) -> Self {
            tracing::info!("Audio: stub implementation (audio feature not enabled)");
            Self {
                assets_path,
                warned: false,
            }
        }

        fn warn_once(&mut self) {
            if !self.warned {
                tracing::warn!("Audio playback not available: compile with --features audio");
                self.warned = true;
            }
        }
    }

    impl AudioBackend for HostAudio {
        fn load(&mut self, source: &str) -> Result<Box<dyn AudioCue>, AudioError> {
            let path = resolve_source(self.assets_path.as_deref(), source)
                .ok_or_else(|| AudioError::NotFound(source.to_string()))?;
            self.warn_once();
            Ok(Box::new(SilentCue { path, playing: false }))
        }
    }
}

// Re-export HostAudio from the appropriate module
pub use engine::HostAudio;
