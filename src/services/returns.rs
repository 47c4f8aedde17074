//! Bounded rolling window of log-returns for one instrument.

use std::collections::VecDeque;

/// Tracks consecutive log-returns of an observed price series.
///
/// The simulator consumes the most recent return as its market signal;
/// the sample stdev of the window is available alongside it.
#[derive(Debug)]
pub struct ReturnWindow {
    returns: VecDeque<f64>,
    last_price: Option<f64>,
    capacity: usize,
}

impl ReturnWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            returns: VecDeque::with_capacity(capacity),
            last_price: None,
            capacity,
        }
    }

    /// Record an observed price. Returns the log-return relative to the
    /// previous observation, if there was one. Non-positive prices are
    /// ignored.
    pub fn record(&mut self, price: f64) -> Option<f64> {
        if price <= 0.0 {
            return None;
        }

        let log_return = self.last_price.map(|prev| (price / prev).ln());
        self.last_price = Some(price);

        if let Some(r) = log_return {
            self.returns.push_back(r);
            while self.returns.len() > self.capacity {
                self.returns.pop_front();
            }
        }

        log_return
    }

    /// Most recent log-return in the window.
    pub fn latest(&self) -> Option<f64> {
        self.returns.back().copied()
    }

    /// Sample standard deviation of the window. Needs at least two returns.
    pub fn stdev(&self) -> Option<f64> {
        let n = self.returns.len();
        if n < 2 {
            return None;
        }

        let mean: f64 = self.returns.iter().sum::<f64>() / n as f64;
        let variance: f64 = self
            .returns
            .iter()
            .map(|r| (r - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;

        Some(variance.sqrt())
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}
