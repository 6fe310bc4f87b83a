//! Plot configuration
//!
//! A [`PlotConfig`] describes a plot: plot-wide settings plus the curves and
//! reference lines attached to it. It can be stored as TOML (the default) or
//! JSON, chosen by file extension.
//!
//! # Default Location
//!
//! - **Linux**: `~/.local/share/dev.pvtrend/plot.toml`
//! - **macOS**: `~/Library/Application Support/dev.pvtrend/plot.toml`
//! - **Windows**: `%APPDATA%\dev.pvtrend\plot.toml`
//!
//! # Example
//!
//! ```ignore
//! use pvtrend::config::PlotConfig;
//!
//! let config = PlotConfig::load_or_default("plot.toml").normalized();
//! let plot = pvtrend::TimePlot::from_config(&config);
//! ```

use crate::buffer::{clamp_capacity, DEFAULT_CAPACITY};
use crate::error::{PlotError, Result, ResultExt};
use crate::item::Marker;
use crate::label::LabelFormat;
use crate::scheduler::{
    normalize_rate, normalize_time_span, DEFAULT_REDRAW_RATE_HZ, DEFAULT_TIME_SPAN_SECS,
};
use crate::series::SeriesDescriptor;
use crate::types::{AppMode, UpdateMode};
use crate::worker::DEFAULT_MAX_RENDER_POINTS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.pvtrend";

/// Default config filename
pub const CONFIG_FILE: &str = "plot.toml";

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        PlotError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .map_err(PlotError::from)
            .with_context(|| format!("Failed to create app data directory {:?}", dir))?;
    }

    Ok(dir)
}

/// Get the path to the default config file
pub fn default_config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// On-disk encoding, picked from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Toml,
    Json,
}

impl Format {
    fn of(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Toml,
        }
    }
}

/// Settings for one plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Buffer capacity applied to every curve; clamped to the minimum
    #[serde(default = "default_buffer_size")]
    pub buffer_size: i64,

    #[serde(default)]
    pub update_mode: UpdateMode,

    /// Redraw timer rate in Hz; FixedRate curves are flushed at this rate too
    #[serde(default = "default_redraw_rate")]
    pub redraw_rate_hz: f64,

    /// Width of the x window, in seconds, that follows the newest sample
    #[serde(default = "default_time_span")]
    pub time_span: f64,

    /// Scroll the x axis with the newest sample on each redraw
    #[serde(default = "default_auto_scroll")]
    pub auto_scroll: bool,

    /// Show per-curve cursor labels
    #[serde(default)]
    pub crosshair: bool,

    /// Prepare redraw frames on a background thread
    #[serde(default)]
    pub offload_processing: bool,

    /// Per-curve point budget for background decimation (0 = off)
    #[serde(default = "default_max_render_points")]
    pub max_render_points: usize,

    #[serde(default)]
    pub app_mode: AppMode,

    #[serde(default)]
    pub label: LabelFormat,

    #[serde(default)]
    pub curves: Vec<SeriesDescriptor>,

    #[serde(default)]
    pub markers: Vec<Marker>,
}

fn default_buffer_size() -> i64 {
    DEFAULT_CAPACITY as i64
}

fn default_redraw_rate() -> f64 {
    DEFAULT_REDRAW_RATE_HZ
}

fn default_time_span() -> f64 {
    DEFAULT_TIME_SPAN_SECS
}

fn default_auto_scroll() -> bool {
    true
}

fn default_max_render_points() -> usize {
    DEFAULT_MAX_RENDER_POINTS
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            update_mode: UpdateMode::default(),
            redraw_rate_hz: default_redraw_rate(),
            time_span: default_time_span(),
            auto_scroll: default_auto_scroll(),
            crosshair: false,
            offload_processing: false,
            max_render_points: default_max_render_points(),
            app_mode: AppMode::default(),
            label: LabelFormat::default(),
            curves: Vec::new(),
            markers: Vec::new(),
        }
    }
}

impl PlotConfig {
    /// Clamp out-of-range values the way the plot would apply them
    pub fn normalized(mut self) -> Self {
        self.buffer_size = clamp_capacity(self.buffer_size) as i64;
        self.redraw_rate_hz = normalize_rate(self.redraw_rate_hz);
        self.time_span = normalize_time_span(self.time_span);
        self.label = self.label.validated();
        for curve in &mut self.curves {
            curve.buffer_size = clamp_capacity(curve.buffer_size) as i64;
            if !(curve.bar_width.is_finite() && curve.bar_width > 0.0) {
                curve.bar_width = 1.0;
            }
        }
        self
    }

    /// Add a curve for `address`, inheriting the plot-wide buffer and mode
    pub fn add_curve(&mut self, address: impl Into<String>) -> &mut SeriesDescriptor {
        self.curves.push(SeriesDescriptor {
            buffer_size: self.buffer_size,
            update_mode: self.update_mode,
            ..SeriesDescriptor::for_channel(address)
        });
        let last = self.curves.len() - 1;
        &mut self.curves[last]
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(PlotError::from)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        let parsed: Result<Self> = match Format::of(path) {
            Format::Toml => toml::from_str(&content).map_err(PlotError::from),
            Format::Json => serde_json::from_str(&content).map_err(PlotError::from),
        };
        parsed.with_context(|| format!("Failed to parse config file {:?}", path))
    }

    /// Load a config file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Using default plot config: {}", e);
                Self::default()
            }
        }
    }

    /// Save the config, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(PlotError::from)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = match Format::of(path) {
            Format::Toml => toml::to_string_pretty(self)?,
            Format::Json => serde_json::to_string_pretty(self)?,
        };

        std::fs::write(path, content)
            .map_err(PlotError::from)
            .with_context(|| format!("Failed to write config file {:?}", path))?;
        tracing::info!("Saved plot config to {:?}", path);
        Ok(())
    }
}
