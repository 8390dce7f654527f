use std::collections::VecDeque;

/// A trait for incremental indicators fed one close price at a time.
pub trait StreamingIndicator: std::fmt::Debug + Send + Sync {
    /// Update the indicator with the latest scalar value (e.g., close price).
    /// Returns `Some(value)` if the indicator is warm (enough data seen), otherwise `None`.
    fn update(&mut self, value: f64) -> Option<f64>;

    /// Reset the internal state to clear history (e.g., for a new price series).
    fn reset(&mut self);
}

// ================================================================================================
// Rolling Window Buffer
// ================================================================================================

/// Shared fixed-size window over the most recent values.
#[derive(Debug, Clone)]
struct RollingWindow {
    window_size: usize,
    buffer: VecDeque<f64>,
}

impl RollingWindow {
    fn new(window_size: usize) -> Self {
        Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size),
        }
    }

    /// Pushes a value, evicting the oldest once full. Returns `true` when warm.
    fn push(&mut self, value: f64) -> bool {
        self.buffer.push_back(value);
        if self.buffer.len() > self.window_size {
            self.buffer.pop_front();
        }
        self.buffer.len() >= self.window_size
    }

    fn mean(&self) -> f64 {
        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }

    /// Sample standard deviation (ddof = 1). Zero for a single-element window.
    fn std(&self) -> f64 {
        let n = self.buffer.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self.buffer.iter().map(|v| (v - mean).powi(2)).sum();
        (sum_sq / (n - 1) as f64).sqrt()
    }

    fn clear(&mut self) {
        self.buffer.clear();
    }
}

// ================================================================================================
// Bollinger Z-Score
// ================================================================================================

/// How many rolling standard deviations the latest close sits from the rolling mean.
///
/// A flat window (zero deviation) yields `0.0` rather than a division blow-up, matching the
/// convention that a flat market carries no band signal.
#[derive(Debug, Clone)]
pub struct StreamingBollingerZ {
    window: RollingWindow,
}

impl StreamingBollingerZ {
    pub fn new(window_size: usize) -> Self {
        Self {
            window: RollingWindow::new(window_size),
        }
    }
}

impl StreamingIndicator for StreamingBollingerZ {
    fn update(&mut self, value: f64) -> Option<f64> {
        if !self.window.push(value) {
            return None;
        }
        let std = self.window.std();
        if std == 0.0 {
            return Some(0.0);
        }
        Some((value - self.window.mean()) / std)
    }

    fn reset(&mut self) {
        self.window.clear();
    }
}

// ================================================================================================
// Momentum
// ================================================================================================

/// The difference between the latest close and the close `window_size` steps earlier.
/// Warm only once that earlier close exists, i.e. after `window_size + 1` values.
#[derive(Debug, Clone)]
pub struct StreamingMomentum {
    window_size: usize,
    buffer: VecDeque<f64>,
}

impl StreamingMomentum {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size + 1),
        }
    }
}

impl StreamingIndicator for StreamingMomentum {
    fn update(&mut self, value: f64) -> Option<f64> {
        self.buffer.push_back(value);
        if self.buffer.len() > self.window_size + 1 {
            self.buffer.pop_front();
        }
        if self.buffer.len() < self.window_size + 1 {
            return None;
        }
        Some(value - self.buffer[0])
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}
