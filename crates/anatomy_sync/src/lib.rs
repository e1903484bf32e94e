// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera synchronization for embedded anatomy widgets.
//!
//! This crate keeps a locally bound camera and a remote widget's live
//! camera in step:
//! - Two-way binding with echo suppression
//! - Idle animation oscillating between two poses
//! - Visibility and readiness gating
//! - A looping audio cue that follows the animation
//!
//! ## Architecture
//!
//! The core is sans-IO. A [`Session`] never reads a clock and never touches
//! a socket: every entry point takes the current [`std::time::Instant`], and
//! every side effect goes through the [`RemoteWidget`] and [`AudioCue`]
//! traits. A host drives it by feeding events and calling
//! [`Session::advance`] whenever [`Session::next_deadline`] elapses.

pub mod audio;
pub mod config;
pub mod idle;
pub mod pose;
pub mod remote;
pub mod session;
pub mod sync;
pub mod timer;

#[cfg(test)]
mod testing;

pub use audio::{AudioBackend, AudioCue, AudioError};
pub use config::{CameraRig, ConfigError, SceneConfig, SyncTimings, WidgetConfig};
pub use idle::IdleAnimationDriver;
pub use pose::{ease_cycle, BoundCamera, CameraPose, PartialPose, Vector3};
pub use remote::{RemoteCommand, RemoteEvent, RemoteWidget, RequestId, Timeline};
pub use session::{Session, SessionId};
pub use sync::{CameraSyncController, Suppression};
pub use timer::{TimerKind, TimerQueue};
