// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene configuration.
//!
//! This module manages the read-only inputs of a session:
//! - Camera poses (idle endpoints, manual-mode center, initial pose)
//! - Widget location and URL parameters
//! - Audio cue, poster and reveal delay
//! - Timing constants for ticks, debounce and echo suppression
//!
//! Scene files are RON by default; `.json` files are read as JSON.

use crate::pose::CameraPose;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default widget endpoint
pub const DEFAULT_WIDGET_URL: &str = "https://human.biodigital.com/widget/";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the scene file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The scene file could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required camera pose is absent
    #[error("Missing camera details ({0}). Please set camera or cam_a/cam_b/cam_center")]
    MissingCamera(String),

    /// No scene locator was given
    #[error("Missing scene locator")]
    MissingScene,
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Single-pose or pose-list shorthand for the `camera` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CameraShorthand {
    /// One pose used for every missing slot
    Single(CameraPose),
    /// Idle endpoints in order; the first also stands in for the center
    Sequence(Vec<CameraPose>),
}

/// Timing constants, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncTimings {
    /// Idle animation tick period
    pub tick_ms: u64,
    /// Duration of one full A -> B -> A cycle
    pub cycle_ms: u64,
    /// Echo suppression window
    pub suppression_ms: u64,
    /// Quiet period before a remote camera update is propagated
    pub debounce_ms: u64,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            tick_ms: 30,
            cycle_ms: 20_000,
            suppression_ms: 500,
            debounce_ms: 500,
        }
    }
}

impl SyncTimings {
    /// Idle animation tick period
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// One full animation cycle
    pub fn cycle(&self) -> Duration {
        Duration::from_millis(self.cycle_ms.max(1))
    }

    /// Echo suppression window
    pub fn suppression(&self) -> Duration {
        Duration::from_millis(self.suppression_ms)
    }

    /// Remote update debounce
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Widget URL parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Widget endpoint
    pub base_url: String,
    /// Developer key (`dk` parameter)
    pub developer_key: Option<String>,
    /// Background gradient (`bgstd` parameter)
    pub background: String,
    /// Show the widget's own navigation UI
    pub show_navigation: bool,
    /// Image display mode
    pub image_display: String,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WIDGET_URL.to_string(),
            developer_key: None,
            background: "255,255,255,255,255,255".to_string(),
            show_navigation: false,
            image_display: "fallback".to_string(),
        }
    }
}

/// Scene description loaded from disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Widget scene locator, e.g. `be=19Ws`
    pub scene: String,
    /// Idle animation start pose
    #[serde(alias = "camA")]
    pub cam_a: Option<CameraPose>,
    /// Idle animation far pose
    #[serde(alias = "camB")]
    pub cam_b: Option<CameraPose>,
    /// Pose entered when switching to manual mode
    #[serde(alias = "camCenter", alias = "interact")]
    pub cam_center: Option<CameraPose>,
    /// Pose applied when the scene is revealed
    #[serde(alias = "camInit", alias = "init")]
    pub cam_init: Option<CameraPose>,
    /// Shorthand filling any missing pose
    pub camera: Option<CameraShorthand>,
    /// Looping audio cue
    pub sound: Option<String>,
    /// Poster image shown while loading
    pub poster: Option<String>,
    /// Start hidden
    pub hidden: bool,
    /// Artificial wait before the widget is built
    #[serde(alias = "delay")]
    pub delay_ms: u64,
    /// 1-based tour chapter to select before revealing
    #[serde(alias = "tourChapter")]
    pub tour_chapter: Option<usize>,
    /// Widget URL parameters
    pub widget: WidgetConfig,
    /// Timing constants
    pub timings: SyncTimings,
}

/// Validated camera poses for a session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraRig {
    /// Idle animation start pose
    pub pose_a: CameraPose,
    /// Idle animation far pose
    pub pose_b: CameraPose,
    /// Manual-mode entry pose
    pub pose_center: CameraPose,
    /// Pose applied when the gate opens
    pub pose_init: Option<CameraPose>,
}

impl SceneConfig {
    /// Load a scene file (RON, or JSON for `.json`)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_ron(&content)
        }
    }

    /// Parse a RON scene description
    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a JSON scene description
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Resolve the camera poses, applying the `camera` shorthand
    pub fn rig(&self) -> Result<CameraRig> {
        let (mut cam_a, mut cam_b, mut cam_center) = (self.cam_a, self.cam_b, self.cam_center);

        match &self.camera {
            Some(CameraShorthand::Single(pose)) => {
                cam_a = cam_a.or(Some(*pose));
                cam_b = cam_b.or(Some(*pose));
                cam_center = cam_center.or(Some(*pose));
            }
            Some(CameraShorthand::Sequence(poses)) => {
                let first = poses.first().copied();
                cam_a = cam_a.or(first);
                cam_b = cam_b.or(poses.get(1).copied()).or(first);
                cam_center = cam_center.or(first);
            }
            None => {}
        }

        let mut missing = Vec::new();
        if cam_a.is_none() {
            missing.push("cam_a");
        }
        if cam_b.is_none() {
            missing.push("cam_b");
        }
        if cam_center.is_none() {
            missing.push("cam_center");
        }

        match (cam_a, cam_b, cam_center) {
            (Some(pose_a), Some(pose_b), Some(pose_center)) => Ok(CameraRig {
                pose_a,
                pose_b,
                pose_center,
                pose_init: self.cam_init,
            }),
            _ => Err(ConfigError::MissingCamera(missing.join(", "))),
        }
    }

    /// Widget iframe URL for this scene
    pub fn widget_url(&self) -> Result<String> {
        if self.scene.is_empty() {
            return Err(ConfigError::MissingScene);
        }

        let widget = &self.widget;
        let mut url = format!("{}?{}", widget.base_url, self.scene);
        if let Some(key) = &widget.developer_key {
            url.push_str("&dk=");
            url.push_str(key);
        }
        url.push_str("&bgstd=");
        url.push_str(&widget.background);
        url.push_str(if widget.show_navigation { "&ui-nav=true" } else { "&ui-nav=false" });
        url.push_str("&imageDisplay=");
        url.push_str(&widget.image_display);
        Ok(url)
    }

    /// CSS background for the loading poster
    pub fn poster_style(&self) -> String {
        match &self.poster {
            Some(poster) => format!("url('{poster}')"),
            None => "none".to_string(),
        }
    }

    /// Reveal delay
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
