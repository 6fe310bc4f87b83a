//! Items attached to a plot
//!
//! A plot holds data series and non-series overlays (reference lines). Only
//! series take part in redraw passes and get cursor labels.

use crate::series::SeriesState;
use serde::{Deserialize, Serialize};

/// Orientation of a reference line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerAxis {
    /// Horizontal line at a fixed value
    Value,
    /// Vertical line at a fixed time
    Time,
}

/// A fixed reference line drawn over the data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub axis: MarkerAxis,
    pub position: f64,
    #[serde(default)]
    pub label: Option<String>,
}

impl Marker {
    pub fn value_line(position: f64) -> Self {
        Self {
            axis: MarkerAxis::Value,
            position,
            label: None,
        }
    }

    pub fn time_line(position: f64) -> Self {
        Self {
            axis: MarkerAxis::Time,
            position,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Anything attached to a plot
#[derive(Debug, Clone)]
pub enum PlotItem {
    Series(SeriesState),
    Marker(Marker),
}

impl PlotItem {
    pub fn as_series(&self) -> Option<&SeriesState> {
        match self {
            PlotItem::Series(series) => Some(series),
            PlotItem::Marker(_) => None,
        }
    }

    pub fn as_series_mut(&mut self) -> Option<&mut SeriesState> {
        match self {
            PlotItem::Series(series) => Some(series),
            PlotItem::Marker(_) => None,
        }
    }
}

/// Iterate the series among a list of plot items
pub fn series_of(items: &[PlotItem]) -> impl Iterator<Item = &SeriesState> {
    items.iter().filter_map(PlotItem::as_series)
}

/// Iterate the series among a list of plot items, mutably
pub fn series_of_mut(items: &mut [PlotItem]) -> impl Iterator<Item = &mut SeriesState> {
    items.iter_mut().filter_map(PlotItem::as_series_mut)
}
