//! # pvtrend: live time-series plot core
//!
//! Buffering and redraw scheduling for strip-chart style plots of process
//! variables. Samples arrive asynchronously from channel sources, are kept in
//! fixed-capacity right-aligned buffers, and are pushed to a rendering surface
//! at a bounded rate only when something changed. The x axis scrolls with the
//! newest sample over a configurable time span. A cursor label engine maps
//! screen positions back to the nearest sample of each curve.
//!
//! ## Architecture
//!
//! - **Buffer**: [`SampleBuffer`], a shifting two-row (time, value) buffer
//! - **Series**: [`SeriesState`], channel metadata wrapped around a buffer
//! - **Scheduler**: [`RedrawScheduler`], the dirty-flag redraw timer
//! - **Labels**: [`LabelEngine`], nearest-sample cursor text
//! - **Plot**: [`TimePlot`], owner of all of the above on the UI thread
//! - **Communication**: [`ChannelBridge`] marshals updates from producer
//!   threads; [`FrameWorker`] prepares redraw frames off-thread
//!
//! The crate never draws. Rendering goes through the [`RenderSurface`] trait.
//!
//! ## Example
//!
//! ```ignore
//! use pvtrend::{ChannelBridge, PlotConfig, TimePlot};
//!
//! let config = PlotConfig::load_or_default("plot.toml");
//! let mut plot = TimePlot::from_config(&config);
//! let id = plot.add_channel("ca://SR:CURRENT");
//!
//! let bridge = ChannelBridge::new();
//! let sender = bridge.sender();
//! std::thread::spawn(move || sender.on_value(id, 401.2));
//!
//! // UI loop
//! bridge.drain_into(&mut plot);
//! plot.poll(std::time::Instant::now(), pvtrend::types::now_secs(), &mut surface);
//! ```

pub mod buffer;
pub mod channel;
pub mod config;
pub mod error;
pub mod item;
pub mod label;
pub mod plot;
pub mod scheduler;
pub mod series;
pub mod surface;
pub mod types;
pub mod worker;

// Re-export commonly used types
pub use buffer::SampleBuffer;
pub use channel::{ChannelBridge, ChannelEvent, ChannelSender, ChannelUpdate};
pub use config::PlotConfig;
pub use error::{PlotError, Result};
pub use item::{Marker, PlotItem};
pub use label::LabelEngine;
pub use plot::TimePlot;
pub use scheduler::{RedrawReport, RedrawScheduler};
pub use series::{AlarmAware, ConnectionAware, SeriesDescriptor, SeriesState};
pub use surface::RenderSurface;
pub use types::{AppMode, ChannelValue, PlotStyle, SeriesId, Severity, UpdateMode};
pub use worker::FrameWorker;
