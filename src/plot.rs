//! The time plot
//!
//! [`TimePlot`] owns everything attached to one plot: its series and
//! reference lines, the redraw scheduler, the cursor labels and the optional
//! background frame worker. All of it lives on the UI thread. Channel
//! sources reach it either directly through the `receive_*` entry points or
//! through a [`ChannelBridge`](crate::channel::ChannelBridge).
//!
//! The host drives the plot with two calls:
//!
//! - [`TimePlot::tick`] from its redraw timer (or [`TimePlot::poll`] once per
//!   event-loop iteration, which fires `tick` at the configured rate)
//! - [`TimePlot::update_label`] on cursor moves
//!
//! With auto-scroll on (the default) every redraw pass first moves the
//! surface's x axis to the last `time_span` seconds before the newest sample.

use crate::buffer::DEFAULT_CAPACITY;
use crate::channel::{ChannelEvent, ChannelUpdate};
use crate::config::PlotConfig;
use crate::error::Result;
use crate::item::{series_of, series_of_mut, Marker, PlotItem};
use crate::label::{LabelEngine, LabelHandle};
use crate::scheduler::{
    normalize_time_span, RedrawReport, RedrawScheduler, SeriesFrame, DEFAULT_TIME_SPAN_SECS,
};
use crate::series::SeriesState;
use crate::surface::RenderSurface;
use crate::types::{remove_protocol, AppMode, ChannelValue, SeriesId, UpdateMode};
use crate::worker::{FrameWorker, DEFAULT_MAX_RENDER_POINTS};
use std::time::Instant;

pub struct TimePlot {
    items: Vec<PlotItem>,
    scheduler: RedrawScheduler,
    labels: LabelEngine,
    worker: FrameWorker,
    buffer_size: i64,
    update_mode: UpdateMode,
    time_span: f64,
    auto_scroll: bool,
    /// X window to apply with the in-flight background pass
    pending_range: Option<(f64, f64)>,
    offload: bool,
    max_render_points: usize,
    app_mode: AppMode,
}

impl Default for TimePlot {
    fn default() -> Self {
        Self::new()
    }
}

impl TimePlot {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            scheduler: RedrawScheduler::default(),
            labels: LabelEngine::default(),
            worker: FrameWorker::new(),
            buffer_size: DEFAULT_CAPACITY as i64,
            update_mode: UpdateMode::OnArrival,
            time_span: DEFAULT_TIME_SPAN_SECS,
            auto_scroll: true,
            pending_range: None,
            offload: false,
            max_render_points: DEFAULT_MAX_RENDER_POINTS,
            app_mode: AppMode::Normal,
        }
    }

    /// Build a plot, its curves and markers from a config
    pub fn from_config(config: &PlotConfig) -> Self {
        let config = config.clone().normalized();
        let mut plot = Self {
            scheduler: RedrawScheduler::new(config.redraw_rate_hz),
            labels: LabelEngine::new(config.label.clone()),
            buffer_size: config.buffer_size,
            update_mode: config.update_mode,
            time_span: config.time_span,
            auto_scroll: config.auto_scroll,
            offload: config.offload_processing,
            max_render_points: config.max_render_points,
            app_mode: config.app_mode,
            ..Self::new()
        };
        for curve in &config.curves {
            plot.add_series(SeriesState::from_descriptor(curve));
        }
        for marker in &config.markers {
            plot.add_marker(marker.clone());
        }
        if config.crosshair {
            plot.enable_crosshair(true);
        }
        tracing::info!(
            "Plot created with {} curves at {} Hz",
            config.curves.len(),
            plot.scheduler.rate_hz()
        );
        plot
    }

    /// Describe the plot and its current curves
    pub fn to_config(&self) -> PlotConfig {
        PlotConfig {
            buffer_size: self.buffer_size,
            update_mode: self.update_mode,
            redraw_rate_hz: self.scheduler.rate_hz(),
            time_span: self.time_span,
            auto_scroll: self.auto_scroll,
            crosshair: self.labels.is_enabled(),
            offload_processing: self.offload,
            max_render_points: self.max_render_points,
            app_mode: self.app_mode,
            label: self.labels.format().clone(),
            curves: series_of(&self.items).map(SeriesState::descriptor).collect(),
            markers: self
                .items
                .iter()
                .filter_map(|item| match item {
                    PlotItem::Marker(marker) => Some(marker.clone()),
                    PlotItem::Series(_) => None,
                })
                .collect(),
        }
    }

    // ==================== Items ====================

    /// Add a curve for a channel using the plot-wide buffer size and mode
    pub fn add_channel(&mut self, address: impl Into<String>) -> SeriesId {
        let series = SeriesState::for_channel(address)
            .with_capacity(self.buffer_size)
            .with_update_mode(self.update_mode);
        self.add_series(series)
    }

    pub fn add_series(&mut self, series: SeriesState) -> SeriesId {
        let id = series.id();
        tracing::debug!("Adding series {} ({})", id, series.name());
        self.items.push(PlotItem::Series(series));
        self.invalidate_labels();
        self.scheduler.mark_dirty();
        id
    }

    pub fn add_marker(&mut self, marker: Marker) {
        self.items.push(PlotItem::Marker(marker));
    }

    pub fn remove_series(&mut self, id: SeriesId) -> Option<SeriesState> {
        let index = self
            .items
            .iter()
            .position(|item| item.as_series().is_some_and(|s| s.id() == id))?;
        let removed = match self.items.remove(index) {
            PlotItem::Series(series) => series,
            PlotItem::Marker(_) => return None,
        };
        tracing::debug!("Removed series {} ({})", id, removed.name());
        self.invalidate_labels();
        self.scheduler.mark_dirty();
        Some(removed)
    }

    /// Remove every series; markers stay
    pub fn clear_series(&mut self) {
        self.items.retain(|item| matches!(item, PlotItem::Marker(_)));
        self.invalidate_labels();
        self.scheduler.mark_dirty();
    }

    /// Find a series by address, with or without its protocol prefix
    pub fn find_series(&self, address: &str) -> Option<SeriesId> {
        let bare = remove_protocol(address);
        series_of(&self.items)
            .find(|s| {
                s.address()
                    .is_some_and(|a| a == address || remove_protocol(a) == bare)
            })
            .map(SeriesState::id)
    }

    pub fn series(&self, id: SeriesId) -> Option<&SeriesState> {
        series_of(&self.items).find(|s| s.id() == id)
    }

    pub fn series_mut(&mut self, id: SeriesId) -> Option<&mut SeriesState> {
        series_of_mut(&mut self.items).find(|s| s.id() == id)
    }

    pub fn series_ids(&self) -> Vec<SeriesId> {
        series_of(&self.items).map(SeriesState::id).collect()
    }

    pub fn items(&self) -> &[PlotItem] {
        &self.items
    }

    pub fn tooltip(&self, id: SeriesId) -> Option<String> {
        self.series(id).map(|s| s.tooltip(self.app_mode))
    }

    fn invalidate_labels(&mut self) {
        if self.labels.is_enabled() {
            self.labels.clear_labels();
        }
    }

    // ==================== Channel entry points ====================

    /// Feed a channel value to a series
    ///
    /// Returns true when the buffer changed. Values that are not numeric are
    /// dropped.
    pub fn receive_value(&mut self, id: SeriesId, value: ChannelValue, now: f64) -> bool {
        let Some(series) = self.series_mut(id) else {
            tracing::debug!("Value for unknown series {} dropped", id);
            return false;
        };
        let Some(number) = value.as_f64() else {
            tracing::debug!("Non-numeric value {:?} for series {} dropped", value, id);
            return false;
        };
        let appended = series.on_value_arrival(number, now);
        if appended {
            self.scheduler.mark_dirty();
        }
        appended
    }

    pub fn connection_changed(&mut self, id: SeriesId, connected: bool) {
        if let Some(series) = self.series_mut(id) {
            series.set_connection_state(connected);
        }
    }

    pub fn severity_changed(&mut self, id: SeriesId, code: i64) {
        if let Some(series) = self.series_mut(id) {
            series.set_severity(code);
        }
    }

    /// Apply a marshaled channel update
    pub fn apply(&mut self, update: ChannelUpdate) {
        match update.event {
            ChannelEvent::Value { value, time } => {
                self.receive_value(update.series, value, time);
            }
            ChannelEvent::Connection(connected) => self.connection_changed(update.series, connected),
            ChannelEvent::Severity(code) => self.severity_changed(update.series, code),
            ChannelEvent::WriteAccess(_) => {}
        }
    }

    // ==================== Settings ====================

    pub fn update_mode(&self) -> UpdateMode {
        self.update_mode
    }

    /// Switch every series, and series added later, to `mode`
    pub fn set_update_mode(&mut self, mode: UpdateMode) {
        self.update_mode = mode;
        for series in series_of_mut(&mut self.items) {
            series.set_update_mode(mode);
        }
        tracing::debug!("Update mode set to {}", mode);
    }

    pub fn buffer_size(&self) -> usize {
        crate::buffer::clamp_capacity(self.buffer_size)
    }

    /// Resize every buffer; returns the effective capacity
    pub fn set_buffer_size(&mut self, requested: i64) -> usize {
        let capacity = crate::buffer::clamp_capacity(requested);
        self.buffer_size = capacity as i64;
        for series in series_of_mut(&mut self.items) {
            series.set_capacity(self.buffer_size);
        }
        self.scheduler.mark_dirty();
        capacity
    }

    pub fn reset_buffer_size(&mut self) -> usize {
        self.set_buffer_size(DEFAULT_CAPACITY as i64)
    }

    pub fn redraw_rate_hz(&self) -> f64 {
        self.scheduler.rate_hz()
    }

    pub fn set_redraw_rate_hz(&mut self, rate_hz: f64) -> f64 {
        self.scheduler.set_rate_hz(rate_hz)
    }

    /// Width of the auto-scrolled x window in seconds
    pub fn time_span(&self) -> f64 {
        self.time_span
    }

    /// Set the auto-scroll window width; returns the effective span
    pub fn set_time_span(&mut self, secs: f64) -> f64 {
        self.time_span = normalize_time_span(secs);
        self.scheduler.mark_dirty();
        self.time_span
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Follow the newest sample, or leave the x axis to the surface
    pub fn set_auto_scroll(&mut self, enabled: bool) {
        self.auto_scroll = enabled;
        self.scheduler.mark_dirty();
    }

    /// `[newest - time_span, newest]` over every series with samples
    pub fn x_window(&self) -> Option<(f64, f64)> {
        let newest = series_of(&self.items)
            .filter(|s| !s.buffer().is_empty())
            .map(|s| s.buffer().max_time())
            .filter(|t| t.is_finite())
            .reduce(f64::max)?;
        Some((newest - self.time_span, newest))
    }

    /// Hand redraw preparation to a background thread
    pub fn set_offload_processing(&mut self, enabled: bool, max_render_points: usize) {
        self.offload = enabled;
        self.max_render_points = max_render_points;
    }

    /// Replace the background frame worker
    ///
    /// A pass still in flight on the old worker is dropped.
    pub fn set_frame_worker(&mut self, worker: FrameWorker) {
        self.worker = worker;
        self.pending_range = None;
    }

    pub fn app_mode(&self) -> AppMode {
        self.app_mode
    }

    pub fn set_app_mode(&mut self, mode: AppMode) {
        self.app_mode = mode;
    }

    /// Drop every buffered sample
    pub fn clear_data(&mut self) {
        for series in series_of_mut(&mut self.items) {
            series.clear();
        }
        self.scheduler.mark_dirty();
    }

    pub fn scheduler(&self) -> &RedrawScheduler {
        &self.scheduler
    }

    pub fn worker(&self) -> &FrameWorker {
        &self.worker
    }

    pub fn start(&mut self) {
        self.scheduler.start();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    // ==================== Redraw ====================

    /// Redraw timer callback
    ///
    /// Flushes `FixedRate` series at `now`, then redraws if anything is
    /// dirty. With auto-scroll on, the surface is scrolled to
    /// [`x_window`](Self::x_window) and bars are sliced to it; otherwise the
    /// surface's own visible range is used. With offloading enabled the pass
    /// is prepared on the frame worker and its result is delivered on a
    /// later tick.
    pub fn tick(&mut self, now: f64, surface: &mut dyn RenderSurface) -> Option<RedrawReport> {
        let completed = self.collect_frames(surface);

        let mut flushed = false;
        for series in series_of_mut(&mut self.items) {
            flushed |= series.on_scheduler_tick(now);
        }
        if flushed {
            self.scheduler.mark_dirty();
        }
        if !self.scheduler.is_dirty() {
            return completed;
        }

        let scroll = if self.auto_scroll { self.x_window() } else { None };
        let visible = scroll.or_else(|| surface.visible_x_range());

        if !self.offload {
            if let Some(range) = scroll {
                scroll_to(surface, range);
            }
            let report = self.scheduler.redraw_within(&self.items, surface, visible);
            return merge(completed, report);
        }

        let items = &self.items;
        let submitted = self.worker.submit_with(
            || {
                series_of(items)
                    .filter_map(|s| SeriesFrame::capture(s, visible))
                    .collect()
            },
            self.max_render_points,
        );
        if submitted {
            self.scheduler.take_dirty();
            self.pending_range = scroll;
        }
        completed
    }

    /// Event-loop driver: calls [`tick`](Self::tick) when the redraw period
    /// has elapsed and the scheduler is running
    pub fn poll(
        &mut self,
        at: Instant,
        now: f64,
        surface: &mut dyn RenderSurface,
    ) -> Option<RedrawReport> {
        if !self.scheduler.due(at) {
            return None;
        }
        self.tick(now, surface)
    }

    /// Deliver a finished background pass, if there is one
    fn collect_frames(&mut self, surface: &mut dyn RenderSurface) -> Option<RedrawReport> {
        match self.worker.poll()? {
            Ok(frames) => Some(self.deliver_frames(&frames, surface)),
            Err(e) => {
                tracing::warn!("Background redraw lost: {}", e);
                self.pending_range = None;
                self.scheduler.mark_dirty();
                None
            }
        }
    }

    /// Block until the in-flight background pass (if any) is delivered
    pub fn flush_background(
        &mut self,
        timeout: std::time::Duration,
        surface: &mut dyn RenderSurface,
    ) -> Result<Option<RedrawReport>> {
        let Some(outcome) = self.worker.wait(timeout) else {
            return Ok(None);
        };
        match outcome {
            Ok(frames) => Ok(Some(self.deliver_frames(&frames, surface))),
            Err(e) => {
                self.pending_range = None;
                self.scheduler.mark_dirty();
                Err(e)
            }
        }
    }

    /// Frames for series removed since the pass was captured are dropped
    fn deliver_frames(
        &mut self,
        frames: &[SeriesFrame],
        surface: &mut dyn RenderSurface,
    ) -> RedrawReport {
        if let Some(range) = self.pending_range.take() {
            scroll_to(surface, range);
        }
        let mut report = RedrawReport::default();
        for frame in frames {
            if self.series(frame.series).is_some() {
                report.record(frame.series, frame.deliver(surface));
            }
        }
        report
    }

    // ==================== Cursor labels ====================

    pub fn enable_crosshair(&mut self, enabled: bool) {
        self.labels.enable(enabled);
    }

    pub fn crosshair_enabled(&self) -> bool {
        self.labels.is_enabled()
    }

    /// Move the cursor; labels are built on first use
    pub fn update_label(&mut self, x: f64, y: f64) {
        if !self.labels.is_enabled() {
            return;
        }
        if self.labels.needs_init() {
            self.labels.rebuild_labels(&self.items);
        }
        self.labels.update_label(x, y, &self.items);
    }

    pub fn label_text(&self, id: SeriesId) -> Option<&str> {
        self.labels.text(id)
    }

    pub fn label(&self, id: SeriesId) -> Option<&LabelHandle> {
        self.labels.label(id)
    }

    pub fn labels(&self) -> &LabelEngine {
        &self.labels
    }
}

fn scroll_to(surface: &mut dyn RenderSurface, (lo, hi): (f64, f64)) {
    if let Err(e) = surface.set_x_range(lo, hi) {
        tracing::warn!("Surface rejected x range [{}, {}]: {}", lo, hi, e);
    }
}

fn merge(first: Option<RedrawReport>, second: Option<RedrawReport>) -> Option<RedrawReport> {
    match (first, second) {
        (Some(mut a), Some(b)) => {
            a.delivered.extend(b.delivered);
            a.skipped.extend(b.skipped);
            a.failed.extend(b.failed);
            Some(a)
        }
        (a, b) => a.or(b),
    }
}
