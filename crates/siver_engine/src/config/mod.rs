//! Configuration system

pub use serde::{Serialize, Deserialize};

use crate::render::render_queue::QueueBands;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str_with_format(&contents, path)
    }

    /// Parse configuration text, choosing the format from `path`'s extension
    fn from_str_with_format(contents: &str, path: &str) -> Result<Self, ConfigError> {
        if path.ends_with(".toml") {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Serialize configuration, choosing the format from `path`'s extension
    fn to_string_with_format(&self, path: &str) -> Result<String, ConfigError> {
        if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = self.to_string_with_format(path)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Canvas configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,
    /// Canvas width in pixels
    pub width: u32,
    /// Canvas height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Siver".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Render pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Width of the intermediate ping-pong targets
    pub intermediate_width: u32,
    /// Height of the intermediate ping-pong targets
    pub intermediate_height: u32,
    /// MSAA sample count of the intermediate targets (1 disables MSAA)
    pub msaa_samples: u32,
    /// Generate mipmaps of intermediate targets after each pass
    pub generate_mipmaps: bool,
    /// Render-queue band constants used for classification
    pub queue_bands: QueueBands,
    /// Maximum vertices per batched draw call
    pub batch_max_vertices: usize,
    /// Initial element capacity reserved in each render queue
    pub initial_queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            intermediate_width: 2048,
            intermediate_height: 2048,
            msaa_samples: 1,
            generate_mipmaps: false,
            queue_bands: QueueBands::default(),
            batch_max_vertices: 4096,
            initial_queue_capacity: 128,
        }
    }
}

impl Config for PipelineConfig {}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Canvas settings
    pub window: WindowConfig,
    /// Settings applied to every camera's pipeline
    pub pipeline: PipelineConfig,
    /// Stop the run loop after this many frames
    pub max_frames: Option<u64>,
}

impl Config for EngineConfig {}
