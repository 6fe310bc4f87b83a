//! Test data builders for creating test objects

use pvtrend::{PlotStyle, SeriesState, UpdateMode};

/// Builder for series pre-filled with samples
pub struct SeriesBuilder {
    address: String,
    capacity: i64,
    mode: UpdateMode,
    style: PlotStyle,
    samples: Vec<(f64, f64)>,
    severity: Option<i64>,
}

impl SeriesBuilder {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            capacity: 100,
            mode: UpdateMode::OnArrival,
            style: PlotStyle::Line,
            samples: Vec::new(),
            severity: None,
        }
    }

    pub fn capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn mode(mut self, mode: UpdateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn bars(mut self) -> Self {
        self.style = PlotStyle::Bar;
        self
    }

    /// `(time, value)` pairs appended in order
    pub fn samples(mut self, samples: &[(f64, f64)]) -> Self {
        self.samples.extend_from_slice(samples);
        self
    }

    pub fn severity(mut self, code: i64) -> Self {
        self.severity = Some(code);
        self
    }

    pub fn build(self) -> SeriesState {
        let mut series = SeriesState::for_channel(self.address)
            .with_capacity(self.capacity)
            .with_style(self.style);
        for (t, v) in self.samples {
            series.on_value_arrival(v, t);
        }
        if let Some(code) = self.severity {
            series.set_severity(code);
        }
        series.with_update_mode(self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_builder() {
        let series = SeriesBuilder::new("ca://TEST")
            .capacity(200)
            .samples(&[(1.0, 2.0), (2.0, 3.0)])
            .mode(UpdateMode::FixedRate)
            .build();

        assert_eq!(series.name(), "TEST");
        assert_eq!(series.capacity(), 200);
        assert_eq!(series.buffer().len(), 2);
        assert_eq!(series.update_mode(), UpdateMode::FixedRate);
    }
}
