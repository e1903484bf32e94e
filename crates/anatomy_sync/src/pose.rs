// SPDX-License-Identifier: MIT OR Apache-2.0
//! Camera poses and interpolation.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A point or direction in the widget's coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vector3 {
    /// Create a new vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Linear interpolation, `a * (1 - t) + b * t` per component
    pub fn lerp(a: Self, b: Self, t: f64) -> Self {
        let from = 1.0 - t;
        Self {
            x: a.x * from + b.x * t,
            y: a.y * from + b.y * t,
            z: a.z * from + b.z * t,
        }
    }
}

/// A complete camera view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Eye position
    #[serde(alias = "eye")]
    pub position: Vector3,
    /// Look-at target
    #[serde(alias = "look")]
    pub target: Vector3,
    /// Up direction
    pub up: Vector3,
}

impl CameraPose {
    /// Create a new pose
    pub const fn new(position: Vector3, target: Vector3, up: Vector3) -> Self {
        Self { position, target, up }
    }

    /// Interpolate position, target and up independently
    pub fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            position: Vector3::lerp(a.position, b.position, t),
            target: Vector3::lerp(a.target, b.target, t),
            up: Vector3::lerp(a.up, b.up, t),
        }
    }
}

/// Raised-cosine oscillation over one cycle.
///
/// Maps elapsed cycle fraction `x` to `0 -> 1 -> 0`, slow near the
/// endpoints and fast in the middle. Periodic with period 1.
pub fn ease_cycle(x: f64) -> f64 {
    ((PI * (2.0 * x + 1.0)).cos() + 1.0) / 2.0
}

/// Camera payload reported by the widget's `camera.updated` event.
///
/// Any field may be missing; extra fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PartialPose {
    /// Eye position
    #[serde(default, alias = "eye")]
    pub position: Option<Vector3>,
    /// Look-at target
    #[serde(default, alias = "look")]
    pub target: Option<Vector3>,
    /// Up direction
    #[serde(default)]
    pub up: Option<Vector3>,
}

impl PartialPose {
    /// The full pose, if every component was reported
    pub fn complete(&self) -> Option<CameraPose> {
        Some(CameraPose {
            position: self.position?,
            target: self.target?,
            up: self.up?,
        })
    }
}

impl From<CameraPose> for PartialPose {
    fn from(pose: CameraPose) -> Self {
        Self {
            position: Some(pose.position),
            target: Some(pose.target),
            up: Some(pose.up),
        }
    }
}

/// Externally owned camera binding.
///
/// Empty means automatic mode (the idle animation owns the camera);
/// a pose means manual mode.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundCamera(Option<CameraPose>);

impl BoundCamera {
    /// Automatic mode
    pub const fn auto() -> Self {
        Self(None)
    }

    /// Manual mode at the given pose
    pub const fn manual(pose: CameraPose) -> Self {
        Self(Some(pose))
    }

    /// Whether an external owner controls the camera
    pub fn is_manual(&self) -> bool {
        self.0.is_some()
    }

    /// Whether the idle animation controls the camera
    pub fn is_auto(&self) -> bool {
        self.0.is_none()
    }

    /// The bound pose, if any
    pub fn pose(&self) -> Option<&CameraPose> {
        self.0.as_ref()
    }
}

impl From<Option<CameraPose>> for BoundCamera {
    fn from(pose: Option<CameraPose>) -> Self {
        Self(pose)
    }
}
