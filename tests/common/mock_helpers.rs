//! Rendering surfaces for integration tests

use pvtrend::{PlotError, RenderSurface, Result, SeriesId};
use std::collections::{HashMap, HashSet};

/// One call made on a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Line {
        series: SeriesId,
        x: Vec<f64>,
        y: Vec<f64>,
    },
    Bar {
        series: SeriesId,
        x: Vec<f64>,
        height: Vec<f64>,
        width: f64,
    },
}

impl SurfaceCall {
    pub fn series(&self) -> SeriesId {
        match self {
            SurfaceCall::Line { series, .. } | SurfaceCall::Bar { series, .. } => *series,
        }
    }

    pub fn x(&self) -> &[f64] {
        match self {
            SurfaceCall::Line { x, .. } | SurfaceCall::Bar { x, .. } => x,
        }
    }
}

/// Surface that records every call and can be told to reject some series
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<SurfaceCall>,
    pub visible: Option<(f64, f64)>,
    /// Every x range the plot scrolled to, in order
    pub x_ranges: Vec<(f64, f64)>,
    pub failing: HashSet<SeriesId>,
}

impl RecordingSurface {
    pub fn with_visible(lo: f64, hi: f64) -> Self {
        Self {
            visible: Some((lo, hi)),
            ..Default::default()
        }
    }

    pub fn fail_for(mut self, series: SeriesId) -> Self {
        self.failing.insert(series);
        self
    }

    /// Most recent call per series
    pub fn latest(&self) -> HashMap<SeriesId, &SurfaceCall> {
        self.calls.iter().map(|c| (c.series(), c)).collect()
    }

    pub fn calls_for(&self, series: SeriesId) -> usize {
        self.calls.iter().filter(|c| c.series() == series).count()
    }

    fn check(&self, series: SeriesId) -> Result<()> {
        if self.failing.contains(&series) {
            Err(PlotError::Render(format!("surface rejected {}", series)))
        } else {
            Ok(())
        }
    }
}

impl RenderSurface for RecordingSurface {
    fn set_line_data(&mut self, series: SeriesId, x: &[f64], y: &[f64]) -> Result<()> {
        self.check(series)?;
        self.calls.push(SurfaceCall::Line {
            series,
            x: x.to_vec(),
            y: y.to_vec(),
        });
        Ok(())
    }

    fn set_bar_data(
        &mut self,
        series: SeriesId,
        x: &[f64],
        height: &[f64],
        width: f64,
    ) -> Result<()> {
        self.check(series)?;
        self.calls.push(SurfaceCall::Bar {
            series,
            x: x.to_vec(),
            height: height.to_vec(),
            width,
        });
        Ok(())
    }

    fn visible_x_range(&self) -> Option<(f64, f64)> {
        self.visible
    }

    fn set_x_range(&mut self, lo: f64, hi: f64) -> Result<()> {
        self.x_ranges.push((lo, hi));
        Ok(())
    }
}
