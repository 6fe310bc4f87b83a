//! Dirty-flag redraw scheduling
//!
//! Sample arrival and rendering are decoupled. Arrivals only call
//! [`RedrawScheduler::mark_dirty`]; a periodic timer calls
//! [`RedrawScheduler::on_timer_tick`], which pushes every series to the
//! rendering surface in a single pass and clears the flag. A tick with
//! nothing dirty does no work at all.
//!
//! ```text
//! Idle --(sample)--> Dirty --(tick)--> redraw pass --> Idle
//! ```
//!
//! The scheduler does not own a thread or a timer. The host event loop
//! either calls `on_timer_tick` from its own timer, or polls
//! [`RedrawScheduler::due`] each iteration.

use crate::error::Result;
use crate::item::{series_of, PlotItem};
use crate::series::SeriesState;
use crate::surface::RenderSurface;
use crate::types::{PlotStyle, SeriesId};
use std::time::{Duration, Instant};

/// Redraw rate used when none (or a non-positive one) is configured
pub const DEFAULT_REDRAW_RATE_HZ: f64 = 30.0;

/// Width of the auto-scrolled x window when none is configured
pub const DEFAULT_TIME_SPAN_SECS: f64 = 60.0;

/// Replace non-positive or non-finite rates with the default
pub fn normalize_rate(rate_hz: f64) -> f64 {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        rate_hz
    } else {
        DEFAULT_REDRAW_RATE_HZ
    }
}

/// Replace non-positive or non-finite time spans with the default
pub fn normalize_time_span(secs: f64) -> f64 {
    if secs.is_finite() && secs > 0.0 {
        secs
    } else {
        DEFAULT_TIME_SPAN_SECS
    }
}

/// Owned copy of what one series sends to the surface in a pass
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesFrame {
    pub series: SeriesId,
    pub style: PlotStyle,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub bar_width: f64,
}

impl SeriesFrame {
    /// Snapshot a series; `None` when it has no samples
    ///
    /// Bar series are limited to `visible` when known. Line series always
    /// carry the full valid window.
    pub fn capture(series: &SeriesState, visible: Option<(f64, f64)>) -> Option<Self> {
        let buffer = series.buffer();
        if buffer.is_empty() {
            return None;
        }
        let (x, y) = match series.style() {
            PlotStyle::Line => (buffer.times().to_vec(), buffer.values().to_vec()),
            PlotStyle::Bar => {
                let (lo, hi) = visible.unwrap_or((f64::NEG_INFINITY, f64::INFINITY));
                buffer.window(lo, hi)
            }
        };
        Some(Self {
            series: series.id(),
            style: series.style(),
            x,
            y,
            bar_width: series.bar_width(),
        })
    }

    /// Push this frame to the surface
    pub fn deliver(&self, surface: &mut dyn RenderSurface) -> Result<()> {
        match self.style {
            PlotStyle::Line => surface.set_line_data(self.series, &self.x, &self.y),
            PlotStyle::Bar => surface.set_bar_data(self.series, &self.x, &self.y, self.bar_width),
        }
    }
}

/// Outcome of one redraw pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedrawReport {
    /// Series whose data reached the surface
    pub delivered: Vec<SeriesId>,
    /// Series skipped because they hold no samples
    pub skipped: Vec<SeriesId>,
    /// Series the surface rejected, with the error text
    pub failed: Vec<(SeriesId, String)>,
}

impl RedrawReport {
    /// Record a delivery result for one series
    pub fn record(&mut self, series: SeriesId, result: Result<()>) {
        match result {
            Ok(()) => self.delivered.push(series),
            Err(e) => {
                tracing::warn!("Redraw of series {} failed: {}", series, e);
                self.failed.push((series, e.to_string()));
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Periodic, dirty-gated redraw trigger
#[derive(Debug, Clone)]
pub struct RedrawScheduler {
    rate_hz: f64,
    period: Duration,
    dirty: bool,
    running: bool,
    last_fire: Option<Instant>,
    passes: u64,
}

impl Default for RedrawScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REDRAW_RATE_HZ)
    }
}

impl RedrawScheduler {
    /// Create a running scheduler at the given rate (normalized)
    pub fn new(rate_hz: f64) -> Self {
        let rate_hz = normalize_rate(rate_hz);
        Self {
            rate_hz,
            period: Duration::from_secs_f64(1.0 / rate_hz),
            dirty: false,
            running: true,
            last_fire: None,
            passes: 0,
        }
    }

    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Change the redraw rate; returns the effective rate
    pub fn set_rate_hz(&mut self, rate_hz: f64) -> f64 {
        let normalized = normalize_rate(rate_hz);
        if normalized != rate_hz {
            tracing::debug!("Redraw rate {} Hz replaced by {} Hz", rate_hz, normalized);
        }
        self.rate_hz = normalized;
        self.period = Duration::from_secs_f64(1.0 / normalized);
        normalized
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether it was set
    ///
    /// Used when a pass is handed off to the background worker.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    /// Resume ticking
    pub fn start(&mut self) {
        if !self.running {
            tracing::info!("Redraw scheduler started at {} Hz", self.rate_hz);
        }
        self.running = true;
        self.last_fire = None;
    }

    /// Halt ticking; buffered data and the dirty flag are kept
    pub fn stop(&mut self) {
        if self.running {
            tracing::info!("Redraw scheduler stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Number of redraw passes performed so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Whether the timer should fire at `now`; records the fire when it does
    pub fn due(&mut self, now: Instant) -> bool {
        if !self.running {
            return false;
        }
        let fire = match self.last_fire {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.period,
        };
        if fire {
            self.last_fire = Some(now);
        }
        fire
    }

    /// Timer callback: redraw every series if dirty
    ///
    /// Returns `None` when nothing was dirty. Bar series are sliced to the
    /// surface's visible range.
    pub fn on_timer_tick(
        &mut self,
        items: &[PlotItem],
        surface: &mut dyn RenderSurface,
    ) -> Option<RedrawReport> {
        if !self.dirty {
            return None;
        }
        let visible = surface.visible_x_range();
        self.redraw_within(items, surface, visible)
    }

    /// Redraw every series if dirty, slicing bar series to `visible`
    ///
    /// A surface error for one series is logged and recorded; the remaining
    /// series are still delivered and the dirty flag is cleared once at the
    /// end of the pass.
    pub fn redraw_within(
        &mut self,
        items: &[PlotItem],
        surface: &mut dyn RenderSurface,
        visible: Option<(f64, f64)>,
    ) -> Option<RedrawReport> {
        if !self.dirty {
            return None;
        }

        let mut report = RedrawReport::default();
        for series in series_of(items) {
            match SeriesFrame::capture(series, visible) {
                Some(frame) => report.record(frame.series, frame.deliver(surface)),
                None => report.skipped.push(series.id()),
            }
        }

        self.dirty = false;
        self.passes += 1;
        tracing::trace!(
            "Redraw pass {}: {} delivered, {} empty, {} failed",
            self.passes,
            report.delivered.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Some(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlotError;
    use crate::item::Marker;
    use crate::surface::MockRenderSurface;
    use mockall::predicate::*;

    fn line_series(samples: &[(f64, f64)]) -> SeriesState {
        let mut series = SeriesState::new();
        for &(t, v) in samples {
            series.on_value_arrival(v, t);
        }
        series
    }

    fn bar_series(samples: &[(f64, f64)]) -> SeriesState {
        let mut series = SeriesState::new().with_style(PlotStyle::Bar);
        for &(t, v) in samples {
            series.on_value_arrival(v, t);
        }
        series
    }

    #[test]
    fn test_rate_normalization() {
        assert_eq!(normalize_rate(0.0), DEFAULT_REDRAW_RATE_HZ);
        assert_eq!(normalize_rate(-2.0), DEFAULT_REDRAW_RATE_HZ);
        assert_eq!(normalize_rate(f64::NAN), DEFAULT_REDRAW_RATE_HZ);
        assert_eq!(normalize_rate(10.0), 10.0);

        let mut scheduler = RedrawScheduler::new(-1.0);
        assert_eq!(scheduler.rate_hz(), DEFAULT_REDRAW_RATE_HZ);
        assert_eq!(scheduler.set_rate_hz(4.0), 4.0);
        assert_eq!(scheduler.period(), Duration::from_millis(250));
    }

    #[test]
    fn test_tick_without_dirty_is_noop() {
        let items = vec![PlotItem::Series(line_series(&[(1.0, 1.0)]))];
        let mut surface = MockRenderSurface::new();
        surface.expect_visible_x_range().never();
        surface.expect_set_line_data().never();

        let mut scheduler = RedrawScheduler::default();
        assert!(scheduler.on_timer_tick(&items, &mut surface).is_none());
        assert_eq!(scheduler.passes(), 0);
    }

    #[test]
    fn test_two_ticks_redraw_once() {
        let items = vec![PlotItem::Series(line_series(&[(1.0, 10.0), (5.0, 15.0)]))];
        let mut surface = MockRenderSurface::new();
        surface.expect_visible_x_range().times(1).return_const(None::<(f64, f64)>);
        surface
            .expect_set_line_data()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut scheduler = RedrawScheduler::default();
        scheduler.mark_dirty();
        scheduler.mark_dirty();
        assert!(scheduler.on_timer_tick(&items, &mut surface).is_some());
        assert!(!scheduler.is_dirty());
        assert!(scheduler.on_timer_tick(&items, &mut surface).is_none());
        assert_eq!(scheduler.passes(), 1);
    }

    #[test]
    fn test_line_gets_full_window_and_bar_gets_visible_slice() {
        let line = line_series(&[(1.0, 10.0), (5.0, 15.0), (10.0, 12.0)]);
        let bar = bar_series(&[
            (0.5, 45.0),
            (1.0, 50.0),
            (1.5, 52.0),
            (2.0, 40.0),
            (10.0, 24.0),
            (11.0, 30.0),
        ]);
        let line_id = line.id();
        let bar_id = bar.id();
        let items = vec![
            PlotItem::Series(line),
            PlotItem::Marker(Marker::value_line(20.0)),
            PlotItem::Series(bar),
        ];

        let mut surface = MockRenderSurface::new();
        surface
            .expect_visible_x_range()
            .return_const(Some((1.0_f64, 10.0_f64)));
        surface
            .expect_set_line_data()
            .withf(move |id, x, y| {
                *id == line_id && *x == [1.0, 5.0, 10.0] && *y == [10.0, 15.0, 12.0]
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        surface
            .expect_set_bar_data()
            .withf(move |id, x, h, w| {
                *id == bar_id
                    && *x == [1.0, 1.5, 2.0, 10.0]
                    && *h == [50.0, 52.0, 40.0, 24.0]
                    && *w == 1.0
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut scheduler = RedrawScheduler::default();
        scheduler.mark_dirty();
        let report = scheduler.on_timer_tick(&items, &mut surface).unwrap();
        assert_eq!(report.delivered, vec![line_id, bar_id]);
        assert!(report.is_clean());
        assert!(!scheduler.is_dirty());
    }

    #[test]
    fn test_failure_is_isolated_per_series() {
        let first = line_series(&[(1.0, 1.0)]);
        let second = line_series(&[(2.0, 2.0)]);
        let empty = SeriesState::new();
        let first_id = first.id();
        let second_id = second.id();
        let empty_id = empty.id();
        let items = vec![
            PlotItem::Series(first),
            PlotItem::Series(empty),
            PlotItem::Series(second),
        ];

        let mut surface = MockRenderSurface::new();
        surface.expect_visible_x_range().return_const(None::<(f64, f64)>);
        surface
            .expect_set_line_data()
            .with(eq(first_id), always(), always())
            .times(1)
            .returning(|_, _, _| Err(PlotError::Render("curve removed".to_string())));
        surface
            .expect_set_line_data()
            .with(eq(second_id), always(), always())
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut scheduler = RedrawScheduler::default();
        scheduler.mark_dirty();
        let report = scheduler.on_timer_tick(&items, &mut surface).unwrap();

        assert_eq!(report.delivered, vec![second_id]);
        assert_eq!(report.skipped, vec![empty_id]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, first_id);
        assert!(!scheduler.is_dirty());
    }

    #[test]
    fn test_explicit_window_overrides_surface_range() {
        let bar = bar_series(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]);
        let bar_id = bar.id();
        let items = vec![PlotItem::Series(bar)];

        let mut surface = MockRenderSurface::new();
        surface.expect_visible_x_range().never();
        surface
            .expect_set_bar_data()
            .withf(move |id, x, h, _| *id == bar_id && *x == [2.0, 3.0] && *h == [2.0, 3.0])
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let mut scheduler = RedrawScheduler::default();
        assert!(scheduler
            .redraw_within(&items, &mut surface, Some((2.0, 3.5)))
            .is_none());
        scheduler.mark_dirty();
        let report = scheduler
            .redraw_within(&items, &mut surface, Some((2.0, 3.5)))
            .unwrap();
        assert_eq!(report.delivered, vec![bar_id]);
    }

    #[test]
    fn test_time_span_normalization() {
        assert_eq!(normalize_time_span(0.0), DEFAULT_TIME_SPAN_SECS);
        assert_eq!(normalize_time_span(f64::INFINITY), DEFAULT_TIME_SPAN_SECS);
        assert_eq!(normalize_time_span(5.0), 5.0);
    }

    #[test]
    fn test_due_respects_period_and_stop() {
        let mut scheduler = RedrawScheduler::new(10.0);
        let t0 = Instant::now();
        assert!(scheduler.due(t0));
        assert!(!scheduler.due(t0 + Duration::from_millis(50)));
        assert!(scheduler.due(t0 + Duration::from_millis(100)));

        scheduler.mark_dirty();
        scheduler.stop();
        assert!(!scheduler.is_running());
        assert!(!scheduler.due(t0 + Duration::from_secs(10)));
        assert!(scheduler.is_dirty());

        scheduler.start();
        assert!(scheduler.due(t0 + Duration::from_secs(11)));
    }

    #[test]
    fn test_frame_capture() {
        let bar = bar_series(&[(0.5, 1.0), (1.0, 2.0), (3.0, 3.0)]);
        let frame = SeriesFrame::capture(&bar, Some((0.9, 2.0))).unwrap();
        assert_eq!(frame.x, vec![1.0]);
        assert_eq!(frame.y, vec![2.0]);

        let unbounded = SeriesFrame::capture(&bar, None).unwrap();
        assert_eq!(unbounded.x.len(), 3);

        assert!(SeriesFrame::capture(&SeriesState::new(), None).is_none());
    }
}
