//! Application configuration.
//!
//! Loads settings from config.json at startup. Provides surface geometry,
//! preprocessing constants, model location and benchmark parameters.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use crate::preprocess::{PreprocessConfig, MODEL_INPUT_SIDE};

/// Largest accepted margin around the digit before downscaling.
pub const MAX_PADDING: u32 = 1000;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Where the classifier model comes from and how it is called.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX file (relative paths resolve against the executable
    /// directory) or an http(s) URL to download it from
    #[serde(default = "default_model_source")]
    pub source: String,
    /// Name of the model's input tensor
    #[serde(default = "default_input_name")]
    pub input_name: String,
    /// Name of the model's score output
    #[serde(default = "default_output_name")]
    pub output_name: String,
    /// Intra-op thread count for the runtime (runtime default if unset)
    #[serde(default)]
    pub intra_threads: Option<usize>,
}

fn default_model_source() -> String {
    "mnist_cnn.onnx".to_string()
}

fn default_input_name() -> String {
    "input".to_string()
}

fn default_output_name() -> String {
    "output".to_string()
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            source: default_model_source(),
            input_name: default_input_name(),
            output_name: default_output_name(),
            intra_threads: None,
        }
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ink surface width in pixels
    #[serde(default = "default_canvas_size")]
    pub canvas_width: u32,
    /// Ink surface height in pixels
    #[serde(default = "default_canvas_size")]
    pub canvas_height: u32,
    /// Stroke width for pointer drawing
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
    /// Margin added around the digit's longest side before downscaling
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Side length of the square classifier input
    #[serde(default = "default_tensor_side")]
    pub tensor_side: u32,
    /// Classifier model settings
    #[serde(default)]
    pub model: ModelConfig,
    /// Append successful predictions to output/predictions.csv
    #[serde(default = "default_history_enabled")]
    pub history_enabled: bool,
    /// Untimed classifications before the benchmark starts measuring
    #[serde(default = "default_benchmark_warmup_runs")]
    pub benchmark_warmup_runs: u32,
    /// Timed classifications in the benchmark
    #[serde(default = "default_benchmark_runs")]
    pub benchmark_runs: u32,
}

fn default_canvas_size() -> u32 {
    280
}

fn default_stroke_width() -> f32 {
    20.0
}

fn default_padding() -> u32 {
    40
}

fn default_tensor_side() -> u32 {
    MODEL_INPUT_SIDE
}

fn default_history_enabled() -> bool {
    true
}

fn default_benchmark_warmup_runs() -> u32 {
    10
}

fn default_benchmark_runs() -> u32 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            canvas_width: default_canvas_size(),
            canvas_height: default_canvas_size(),
            stroke_width: default_stroke_width(),
            padding: default_padding(),
            tensor_side: default_tensor_side(),
            model: ModelConfig::default(),
            history_enabled: default_history_enabled(),
            benchmark_warmup_runs: default_benchmark_warmup_runs(),
            benchmark_runs: default_benchmark_runs(),
        }
    }
}

impl AppConfig {
    /// Replaces preprocessing values the model cannot accept.
    ///
    /// The tensor side is fixed by the model's input shape; padding is capped
    /// at `MAX_PADDING`.
    fn sanitized(mut self) -> Self {
        if self.tensor_side != MODEL_INPUT_SIDE {
            crate::log(&format!(
                "tensor_side {} does not match the model input, using {}",
                self.tensor_side, MODEL_INPUT_SIDE
            ));
            self.tensor_side = MODEL_INPUT_SIDE;
        }
        if self.padding > MAX_PADDING {
            crate::log(&format!(
                "padding {} is too large, using {}",
                self.padding, MAX_PADDING
            ));
            self.padding = MAX_PADDING;
        }
        self
    }

    /// Preprocessing parameters derived from this config.
    pub fn preprocess(&self) -> PreprocessConfig {
        PreprocessConfig {
            padding: self.padding,
            side: self.tensor_side,
        }
    }
}

/// Loads configuration from the given file or returns defaults.
pub fn load_config_from(config_path: &Path) -> AppConfig {
    let contents = match fs::read_to_string(config_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            crate::log(&format!(
                "No config at {}, using defaults",
                config_path.display()
            ));
            return AppConfig::default();
        }
        Err(e) => {
            crate::log(&format!(
                "Failed to read {}: {}. Using defaults.",
                config_path.display(),
                e
            ));
            return AppConfig::default();
        }
    };

    match serde_json::from_str::<AppConfig>(&contents) {
        Ok(config) => {
            crate::log(&format!("Config loaded from {}", config_path.display()));
            config.sanitized()
        }
        Err(e) => {
            crate::log(&format!(
                "Invalid config in {}: {}. Using defaults.",
                config_path.display(),
                e
            ));
            AppConfig::default()
        }
    }
}

/// Initializes the global configuration from `<exe_dir>/config.json`.
/// Call once at startup.
pub fn init_config() {
    let path = crate::paths::get_exe_dir().join("config.json");
    let _ = CONFIG.set(load_config_from(&path));
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
