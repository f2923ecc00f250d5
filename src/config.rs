use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::osc::AddressStyle;

pub const DEFAULT_CONFIG_PATH: &str = "pose2osc.toml";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub osc: OscConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Device(i32),
    File(PathBuf),
}

impl std::fmt::Display for VideoSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VideoSource::Device(index) => write!(f, "camera {}", index),
            VideoSource::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// Device index, used when `file` is unset
    #[serde(default)]
    pub index: i32,
    /// Play a video file instead of a device
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Restart the file at end-of-stream instead of stopping
    #[serde(default)]
    pub loop_playback: bool,
    /// Requested capture size; the device may pick something else
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            file: None,
            loop_playback: false,
            width: None,
            height: None,
        }
    }
}

impl CameraConfig {
    pub fn source(&self) -> VideoSource {
        match &self.file {
            Some(path) => VideoSource::File(path.clone()),
            None => VideoSource::Device(self.index),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
    /// Square input edge length in pixels
    #[serde(default = "default_input_size")]
    pub input_size: i32,
    #[serde(default = "default_threads")]
    pub threads: usize,
    /// Tensor names; unset means positional (input 0, outputs 0 and 1)
    #[serde(default)]
    pub input_name: Option<String>,
    #[serde(default)]
    pub heatmap_output: Option<String>,
    #[serde(default)]
    pub offset_output: Option<String>,
}

fn default_model_path() -> PathBuf { PathBuf::from("models/posenet_mobilenet_v1_100_257x257.onnx") }
fn default_input_size() -> i32 { 257 }
fn default_threads() -> usize { 4 }

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            input_size: default_input_size(),
            threads: default_threads(),
            input_name: None,
            heatmap_output: None,
            offset_output: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OscConfig {
    /// Receiver "host:port"
    #[serde(default = "default_osc_target")]
    pub target: String,
    #[serde(default)]
    pub address_style: AddressStyle,
}

fn default_osc_target() -> String { "127.0.0.1:5005".to_string() }

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            target: default_osc_target(),
            address_style: AddressStyle::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreviewConfig {
    #[serde(default = "default_preview_enabled")]
    pub enabled: bool,
    #[serde(default = "default_preview_title")]
    pub title: String,
}

fn default_preview_enabled() -> bool { true }
fn default_preview_title() -> String { "pose2osc".to_string() }

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: default_preview_enabled(),
            title: default_preview_title(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Defaults when the file does not exist; a file that exists must parse.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match fs::metadata(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("{} not found, using defaults", path.display());
                Ok(Self::default())
            }
            _ => Self::load(path),
        }
    }
}
