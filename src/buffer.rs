//! Fixed-capacity sample storage for one series
//!
//! A [`SampleBuffer`] holds two rows of `capacity` columns: row 0 is time,
//! row 1 is value. New samples always land in the last column and older
//! samples shift left, so the valid data is the contiguous, right-aligned
//! window `[capacity - len, capacity)` in arrival order. Columns before the
//! window are zero-filled.
//!
//! Nothing here validates input. Non-finite values and out-of-order
//! timestamps are stored exactly as given; the readers that need clean data
//! ([`SampleBuffer::window`], [`SampleBuffer::nearest`],
//! [`SampleBuffer::time_range`]) skip non-finite samples themselves.

/// Smallest capacity a buffer may have
pub const MINIMUM_CAPACITY: usize = 100;

/// Capacity used when none is configured
pub const DEFAULT_CAPACITY: usize = 6000;

/// Clamp a requested capacity to the allowed range
///
/// Zero and negative requests come from unset configuration fields and
/// resolve to [`MINIMUM_CAPACITY`].
pub fn clamp_capacity(requested: i64) -> usize {
    if requested < MINIMUM_CAPACITY as i64 {
        MINIMUM_CAPACITY
    } else {
        usize::try_from(requested).unwrap_or(usize::MAX)
    }
}

/// Two-row circular sample buffer with a contiguous "most recent N" view
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    times: Vec<f64>,
    values: Vec<f64>,
    capacity: usize,
    count: usize,
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY as i64)
    }
}

impl SampleBuffer {
    /// Create an empty buffer; `capacity` is clamped with [`clamp_capacity`]
    pub fn new(capacity: i64) -> Self {
        let capacity = clamp_capacity(capacity);
        Self {
            times: vec![0.0; capacity],
            values: vec![0.0; capacity],
            capacity,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid samples, never more than the capacity
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append a sample, evicting the oldest one when full
    #[inline]
    pub fn append(&mut self, time: f64, value: f64) {
        let cap = self.capacity;
        // Shift only the valid window; the zeroed prefix stays untouched.
        let from = if self.count == cap { 1 } else { cap - self.count };
        if from > 0 {
            self.times.copy_within(from..cap, from - 1);
            self.values.copy_within(from..cap, from - 1);
        }
        self.times[cap - 1] = time;
        self.values[cap - 1] = value;
        self.count = (self.count + 1).min(cap);
    }

    /// Change the capacity, keeping the most recent samples right-aligned
    ///
    /// Returns the effective capacity after clamping.
    pub fn set_capacity(&mut self, requested: i64) -> usize {
        let capacity = clamp_capacity(requested);
        if capacity == self.capacity {
            return capacity;
        }

        let keep = self.count.min(capacity);
        let mut times = vec![0.0; capacity];
        let mut values = vec![0.0; capacity];
        times[capacity - keep..].copy_from_slice(&self.times[self.capacity - keep..]);
        values[capacity - keep..].copy_from_slice(&self.values[self.capacity - keep..]);

        self.times = times;
        self.values = values;
        self.capacity = capacity;
        self.count = keep;
        capacity
    }

    /// Zero-fill and forget all samples
    pub fn reset(&mut self) {
        self.times.fill(0.0);
        self.values.fill(0.0);
        self.count = 0;
    }

    /// Time in the last column; the zero sentinel when nothing was written
    pub fn max_time(&self) -> f64 {
        self.times[self.capacity - 1]
    }

    /// Time of the oldest valid sample; the zero sentinel when empty
    pub fn min_time(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.times[self.capacity - self.count]
        }
    }

    /// Valid times in arrival order
    pub fn times(&self) -> &[f64] {
        &self.times[self.capacity - self.count..]
    }

    /// Valid values in arrival order
    pub fn values(&self) -> &[f64] {
        &self.values[self.capacity - self.count..]
    }

    /// The full time row, including the zeroed prefix
    pub fn time_row(&self) -> &[f64] {
        &self.times
    }

    /// The full value row, including the zeroed prefix
    pub fn value_row(&self) -> &[f64] {
        &self.values
    }

    /// Iterate valid `(time, value)` pairs in arrival order
    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times()
            .iter()
            .copied()
            .zip(self.values().iter().copied())
    }

    /// Most recent sample
    pub fn last(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            None
        } else {
            Some((self.max_time(), self.values[self.capacity - 1]))
        }
    }

    /// Samples whose time lies within `[x_min, x_max]`, finite values only
    pub fn window(&self, x_min: f64, x_max: f64) -> (Vec<f64>, Vec<f64>) {
        self.iter()
            .filter(|&(t, v)| t >= x_min && t <= x_max && v.is_finite())
            .unzip()
    }

    /// `(min, max)` over the times of finite samples
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.iter()
            .filter(|&(t, v)| t.is_finite() && v.is_finite())
            .fold(None, |acc, (t, _)| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            })
    }

    /// Finite sample whose time is closest to `x`; ties go to the earlier one
    pub fn nearest(&self, x: f64) -> Option<(f64, f64)> {
        let mut min_distance = f64::INFINITY;
        let mut nearest = None;

        for (t, v) in self.iter() {
            if !t.is_finite() || !v.is_finite() {
                continue;
            }
            let distance = (t - x).abs();
            if distance < min_distance {
                min_distance = distance;
                nearest = Some((t, v));
            }
        }

        nearest
    }
}
