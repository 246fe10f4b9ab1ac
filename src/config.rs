//! Configuration - JSON settings and job definitions
//!
//! Top-level keys `font_path` and `project_folder` are global settings; every
//! other key holding a JSON object is a named job. Jobs keep file order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::color::HexColor;
use crate::placement::Anchor;
use crate::{DEFAULT_BLUR_RADIUS, DEFAULT_COLOR, DEFAULT_FONT_PATH, DEFAULT_FONT_SIZE, DEFAULT_OUTLINE_WIDTH};

const KEY_FONT_PATH: &str = "font_path";
const KEY_PROJECT_FOLDER: &str = "project_folder";

/// Job blurred unless its config says `"blur": false`.
pub const BLURRED_BY_DEFAULT_JOB: &str = "nsfw";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config root must be a JSON object")]
    NotAnObject,

    #[error("Setting '{key}' must be {expected}")]
    InvalidSetting { key: String, expected: &'static str },

    #[error("Job '{job}': {source}")]
    InvalidJob {
        job: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Job '{job}': required field '{field}' is empty")]
    MissingField { job: String, field: &'static str },

    #[error("Job '{job}': invalid '{field}': {reason}")]
    InvalidValue {
        job: String,
        field: &'static str,
        reason: String,
    },
}

/// Settings for a single job, as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub input_image: PathBuf,
    pub output_image: PathBuf,
    pub text: String,
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    #[serde(default = "default_color")]
    pub color: HexColor,
    #[serde(default)]
    pub position: Anchor,
    /// Vertical margin in pixels; a tenth of the image height when unset.
    #[serde(default)]
    pub margin: Option<u32>,
    #[serde(default = "default_outline_width")]
    pub outline_width: u32,
    #[serde(default)]
    pub outline_color: Option<HexColor>,
    /// Unset means blurred only for the `nsfw` job; see [`Job::blurs`].
    #[serde(default)]
    pub blur: Option<bool>,
    #[serde(default = "default_blur_radius")]
    pub blur_radius: f32,
    /// Overrides the global font for this job only.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool { true }
fn default_font_size() -> u32 { DEFAULT_FONT_SIZE }
fn default_outline_width() -> u32 { DEFAULT_OUTLINE_WIDTH }
fn default_blur_radius() -> f32 { DEFAULT_BLUR_RADIUS }

fn default_color() -> HexColor {
    DEFAULT_COLOR.parse().unwrap_or(HexColor::WHITE)
}

impl JobSpec {
    pub fn new(input_image: impl Into<PathBuf>, output_image: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            input_image: input_image.into(),
            output_image: output_image.into(),
            text: text.into(),
            font_size: default_font_size(),
            color: default_color(),
            position: Anchor::default(),
            margin: None,
            outline_width: default_outline_width(),
            outline_color: None,
            blur: None,
            blur_radius: default_blur_radius(),
            font_path: None,
            enabled: true,
        }
    }

    /// Outline color, falling back to the contrast of the fill.
    pub fn outline(&self) -> HexColor {
        self.outline_color.unwrap_or_else(|| self.color.contrasting())
    }

    pub fn validate(&self, job: &str) -> Result<(), ConfigError> {
        let missing = |field| ConfigError::MissingField { job: job.to_string(), field };

        if self.input_image.as_os_str().is_empty() {
            return Err(missing("input_image"));
        }
        if self.output_image.as_os_str().is_empty() {
            return Err(missing("output_image"));
        }
        if self.text.trim().is_empty() {
            return Err(missing("text"));
        }
        if self.font_size == 0 {
            return Err(ConfigError::InvalidValue {
                job: job.to_string(),
                field: "font_size",
                reason: "must be greater than zero".into(),
            });
        }
        if let Some(margin) = self.margin.filter(|m| i32::try_from(*m).is_err()) {
            return Err(ConfigError::InvalidValue {
                job: job.to_string(),
                field: "margin",
                reason: format!("{} is larger than {}", margin, i32::MAX),
            });
        }
        if !self.blur_radius.is_finite() || self.blur_radius < 0.0 {
            return Err(ConfigError::InvalidValue {
                job: job.to_string(),
                field: "blur_radius",
                reason: format!("must be a non-negative number, got {}", self.blur_radius),
            });
        }
        Ok(())
    }
}

/// A named job from the config file.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub spec: JobSpec,
}

impl Job {
    pub fn blurs(&self) -> bool {
        self.spec.blur.unwrap_or(self.name == BLURRED_BY_DEFAULT_JOB)
    }
}

/// Validated configuration for one run.
#[derive(Debug, Clone, Default)]
pub struct OverlayConfig {
    pub project_folder: Option<PathBuf>,
    pub font_path: Option<PathBuf>,
    pub jobs: Vec<Job>,
}

impl OverlayConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read { path: path.to_path_buf(), source: e },
        })?;
        let config = Self::from_json_str(&content)?;
        tracing::debug!(path = %path.display(), jobs = config.jobs.len(), "config loaded");
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(root) => Self::from_map(root),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    fn from_map(root: Map<String, Value>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (key, value) in root {
            match key.as_str() {
                KEY_FONT_PATH => config.font_path = path_setting(&key, value)?,
                KEY_PROJECT_FOLDER => config.project_folder = path_setting(&key, value)?.map(|p| expand_home(&p)),
                _ if value.is_object() => {
                    if value.get("enabled") == Some(&Value::Bool(false)) {
                        tracing::debug!(job = %key, "job disabled, skipping");
                        continue;
                    }
                    let spec: JobSpec = serde_json::from_value(value)
                        .map_err(|source| ConfigError::InvalidJob { job: key.clone(), source })?;
                    spec.validate(&key)?;
                    config.jobs.push(Job { name: key.clone(), spec });
                }
                _ => tracing::warn!(key = %key, "ignoring top-level setting that is not a job object"),
            }
        }

        Ok(config)
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Resolve a job path against the project folder.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let path = expand_home(path);
        match &self.project_folder {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }

    /// Font for a job: job override, then global setting, then the built-in default.
    pub fn font_for(&self, spec: &JobSpec) -> PathBuf {
        let font = spec
            .font_path
            .as_deref()
            .or(self.font_path.as_deref())
            .unwrap_or_else(|| Path::new(DEFAULT_FONT_PATH));
        expand_home(font)
    }
}

fn path_setting(key: &str, value: Value) -> Result<Option<PathBuf>, ConfigError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(PathBuf::from(s))),
        _ => Err(ConfigError::InvalidSetting {
            key: key.to_string(),
            expected: "a path string",
        }),
    }
}

/// Expand a leading `~` to `$HOME`.
fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
