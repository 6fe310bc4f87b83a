//! Boundary to the rendering surface
//!
//! The plot core never draws. Once per dirty redraw pass it hands each
//! series' arrays to a [`RenderSurface`], which owns the actual curves and
//! bar items of whatever graphics toolkit is in use. With auto-scroll on it
//! also tells the surface which x window to show.

use crate::error::Result;
use crate::types::SeriesId;

/// Consumer of per-series plot data
#[cfg_attr(test, mockall::automock)]
pub trait RenderSurface {
    /// Replace the data of a line series
    fn set_line_data(&mut self, series: SeriesId, x: &[f64], y: &[f64]) -> Result<()>;

    /// Replace the bars of a bar series
    fn set_bar_data(&mut self, series: SeriesId, x: &[f64], height: &[f64], width: f64)
        -> Result<()>;

    /// Currently visible x-interval, if the surface has been laid out
    fn visible_x_range(&self) -> Option<(f64, f64)>;

    /// Scroll the x axis to `[lo, hi]`
    ///
    /// Called before each auto-scrolled redraw pass. Surfaces that manage
    /// their own view can keep the default.
    fn set_x_range(&mut self, _lo: f64, _hi: f64) -> Result<()> {
        Ok(())
    }
}
