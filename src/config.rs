use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use crate::classifier::ActionLabel;
use crate::error::Error;
use crate::pose::LandmarkIndex;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub landmarks: LandmarkConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub avatar: AvatarConfig,
    /// Predictions below this confidence keep the previous label
    #[serde(default)]
    pub min_confidence: f32,
    /// Scheduler stats log period (0 = off)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

fn default_stats_interval_secs() -> u64 { 10 }

/// One day
pub const MAX_STATS_INTERVAL_SECS: u64 = 86_400;

impl Default for Config {
    fn default() -> Self {
        Self {
            landmarks: LandmarkConfig::default(),
            window: WindowConfig::default(),
            model: ModelConfig::default(),
            avatar: AvatarConfig::default(),
            min_confidence: 0.0,
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LandmarkConfig {
    /// Landmarks per set (K)
    #[serde(default = "default_landmark_count")]
    pub count: usize,
    /// Origin = midpoint of these two landmarks
    #[serde(default = "default_left_reference")]
    pub left_reference: usize,
    #[serde(default = "default_right_reference")]
    pub right_reference: usize,
    /// Emit z as a third feature per landmark
    #[serde(default)]
    pub include_z: bool,
    /// Reference landmarks below this visibility count as missing
    #[serde(default)]
    pub min_reference_visibility: f32,
}

fn default_landmark_count() -> usize { LandmarkIndex::COUNT }
fn default_left_reference() -> usize { LandmarkIndex::LeftHip as usize }
fn default_right_reference() -> usize { LandmarkIndex::RightHip as usize }

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            count: default_landmark_count(),
            left_reference: default_left_reference(),
            right_reference: default_right_reference(),
            include_z: false,
            min_reference_visibility: 0.0,
        }
    }
}

impl LandmarkConfig {
    /// Feature vector length (F)
    pub fn feature_len(&self) -> usize {
        self.count * if self.include_z { 3 } else { 2 }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    /// Frames per classified window (N)
    #[serde(default = "default_window_size")]
    pub size: usize,
}

fn default_window_size() -> usize { 5 }

impl Default for WindowConfig {
    fn default() -> Self {
        Self { size: default_window_size() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Defaults to the model's first input
    #[serde(default)]
    pub input_name: Option<String>,
    /// Defaults to the first f32 output
    #[serde(default)]
    pub output_name: Option<String>,
    /// Output index → label, in training order
    #[serde(default = "default_labels")]
    pub labels: Vec<ActionLabel>,
}

fn default_model_path() -> String { "models/action_model.onnx".to_string() }
fn default_labels() -> Vec<ActionLabel> { ActionLabel::ALL.to_vec() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            input_name: None,
            output_name: None,
            labels: default_labels(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AvatarConfig {
    #[serde(default = "default_scene_width")]
    pub scene_width: f32,
    #[serde(default = "default_avatar_width")]
    pub width: f32,
    #[serde(default = "default_avatar_height")]
    pub height: f32,
    #[serde(default = "default_crouch_height")]
    pub crouch_height: f32,
    #[serde(default = "default_ground_y")]
    pub ground_y: f32,
    #[serde(default = "default_start_x")]
    pub start_x: f32,
    /// Horizontal move per tick
    #[serde(default = "default_move_step")]
    pub move_step: f32,
    /// Initial vy on jump (negative = up)
    #[serde(default = "default_jump_velocity")]
    pub jump_velocity: f32,
    /// Added to vy every tick
    #[serde(default = "default_gravity")]
    pub gravity: f32,
    #[serde(default = "default_tick_hz")]
    pub tick_hz: f32,
}

fn default_scene_width() -> f32 { 640.0 }
fn default_avatar_width() -> f32 { 50.0 }
fn default_avatar_height() -> f32 { 50.0 }
fn default_crouch_height() -> f32 { 30.0 }
fn default_ground_y() -> f32 { 200.0 }
fn default_start_x() -> f32 { 150.0 }
fn default_move_step() -> f32 { 5.0 }
fn default_jump_velocity() -> f32 { -15.0 }
fn default_gravity() -> f32 { 1.0 }
fn default_tick_hz() -> f32 { 30.0 }

/// Accepted avatar tick rates, Hz
pub const TICK_HZ_RANGE: RangeInclusive<f32> = 1.0..=1000.0;

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            scene_width: default_scene_width(),
            width: default_avatar_width(),
            height: default_avatar_height(),
            crouch_height: default_crouch_height(),
            ground_y: default_ground_y(),
            start_x: default_start_x(),
            move_step: default_move_step(),
            jump_velocity: default_jump_velocity(),
            gravity: default_gravity(),
            tick_hz: default_tick_hz(),
        }
    }
}

impl AvatarConfig {
    /// Time between avatar ticks. Only meaningful once `tick_hz` has been validated.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz))
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Missing file → defaults. A file that exists but is broken is still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let lm = &self.landmarks;
        if lm.count == 0 {
            return Err(Error::Config("landmarks.count must be > 0".into()));
        }
        if lm.left_reference >= lm.count || lm.right_reference >= lm.count {
            return Err(Error::Config(format!(
                "reference landmarks ({}, {}) out of range for count {}",
                lm.left_reference, lm.right_reference, lm.count
            )));
        }
        if lm.left_reference == lm.right_reference {
            return Err(Error::Config("reference landmarks must differ".into()));
        }
        if self.window.size == 0 {
            return Err(Error::Config("window.size must be > 0".into()));
        }

        let labels = &self.model.labels;
        if labels.is_empty() {
            return Err(Error::Config("model.labels must not be empty".into()));
        }
        let unique: HashSet<_> = labels.iter().collect();
        if unique.len() != labels.len() {
            return Err(Error::Config("model.labels contains duplicates".into()));
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::Config(format!(
                "min_confidence {} outside [0, 1]",
                self.min_confidence
            )));
        }

        if self.stats_interval_secs > MAX_STATS_INTERVAL_SECS {
            return Err(Error::Config(format!(
                "stats_interval_secs {} exceeds {}",
                self.stats_interval_secs, MAX_STATS_INTERVAL_SECS
            )));
        }

        let av = &self.avatar;
        let fields = [
            ("scene_width", av.scene_width),
            ("width", av.width),
            ("height", av.height),
            ("crouch_height", av.crouch_height),
            ("ground_y", av.ground_y),
            ("start_x", av.start_x),
            ("move_step", av.move_step),
            ("jump_velocity", av.jump_velocity),
            ("gravity", av.gravity),
            ("tick_hz", av.tick_hz),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::Config(format!("avatar.{} must be finite, got {}", name, value)));
        }
        if !TICK_HZ_RANGE.contains(&av.tick_hz) {
            return Err(Error::Config(format!(
                "avatar.tick_hz {} outside {}..={}",
                av.tick_hz,
                TICK_HZ_RANGE.start(),
                TICK_HZ_RANGE.end()
            )));
        }
        if av.scene_width <= av.width {
            return Err(Error::Config("avatar.scene_width must exceed avatar.width".into()));
        }
        if av.move_step < 0.0 {
            return Err(Error::Config("avatar.move_step must be >= 0".into()));
        }
        if av.gravity <= 0.0 {
            return Err(Error::Config("avatar.gravity must be > 0".into()));
        }
        if av.jump_velocity >= 0.0 {
            return Err(Error::Config("avatar.jump_velocity must be negative".into()));
        }
        if av.ground_y < 0.0 {
            return Err(Error::Config("avatar.ground_y must be >= 0".into()));
        }
        Ok(())
    }
}
