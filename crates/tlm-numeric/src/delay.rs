//! Fixed-step delay line.

use std::collections::VecDeque;

/// Ring buffer holding the last `step_delay` samples of a signal.
///
/// `value()` is the sample recorded `step_delay` updates ago, i.e. the value
/// that leaves the buffer on the next [`Delay::update`]. With a step delay of
/// zero the delay is a pass-through of the most recent sample.
///
/// Using a delay before [`Delay::initialize`] is a programmer error and panics.
#[derive(Debug, Clone)]
pub struct Delay {
    step_delay: usize,
    /// Oldest sample at the front, always `step_delay` long once initialized.
    buffer: VecDeque<f64>,
    newest: f64,
    initialized: bool,
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Delay {
    pub fn new(step_delay: usize) -> Self {
        Self {
            step_delay,
            buffer: VecDeque::with_capacity(step_delay),
            newest: 0.0,
            initialized: false,
        }
    }

    /// Change the number of steps a read lags behind. Requires re-initialization.
    pub fn set_step_delay(&mut self, step_delay: usize) {
        self.step_delay = step_delay;
        self.buffer = VecDeque::with_capacity(step_delay);
        self.initialized = false;
    }

    pub fn step_delay(&self) -> usize {
        self.step_delay
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Fill the whole history with `initial`.
    pub fn initialize(&mut self, initial: f64) {
        self.buffer.clear();
        self.buffer.extend(std::iter::repeat_n(initial, self.step_delay));
        self.newest = initial;
        self.initialized = true;
    }

    /// Overwrite the history of an initialized delay with `value`.
    pub fn initialize_values(&mut self, value: f64) {
        self.assert_initialized();
        self.initialize(value);
    }

    /// Record a new sample, evicting the oldest.
    pub fn update(&mut self, sample: f64) {
        self.assert_initialized();
        if self.step_delay > 0 {
            self.buffer.pop_front();
            self.buffer.push_back(sample);
        }
        self.newest = sample;
    }

    /// The delayed sample. Does not advance the buffer.
    pub fn value(&self) -> f64 {
        self.assert_initialized();
        self.buffer.front().copied().unwrap_or(self.newest)
    }

    /// Read the delayed sample as of before this call, then record `sample`.
    pub fn value_with(&mut self, sample: f64) -> f64 {
        let delayed = if self.step_delay == 0 {
            sample
        } else {
            self.value()
        };
        self.update(sample);
        delayed
    }

    /// The `k`-th most recent retained sample, `k = 1` being the newest.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero or larger than the retained history.
    pub fn value_idx(&self, k: usize) -> f64 {
        self.assert_initialized();
        let retained = self.step_delay.max(1);
        assert!(
            (1..=retained).contains(&k),
            "delay index {k} outside retained history 1..={retained}"
        );
        if self.step_delay == 0 {
            return self.newest;
        }
        self.buffer[self.step_delay - k]
    }

    fn assert_initialized(&self) {
        assert!(self.initialized, "Delay used before initialize()");
    }
}
