//! Spinner loop for status lines.
//!
//! Runs on the driver thread: every tick it repaints each unfinished unit
//! with the next spinner glyph, then sleeps. Rows are phase-shifted by their
//! index so neighbouring spinners don't move in lockstep.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::status::StatusUnit;
use crate::terminal::RenderError;

/// Braille spinner frames.
pub const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Default delay between frames.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Something the animator can drive.
pub trait Animated {
    fn is_finished(&self) -> bool;

    /// Show `glyph` as the current spinner frame.
    fn tick(&self, glyph: char) -> Result<(), RenderError>;
}

impl Animated for StatusUnit {
    fn is_finished(&self) -> bool {
        StatusUnit::is_finished(self)
    }

    fn tick(&self, glyph: char) -> Result<(), RenderError> {
        StatusUnit::tick(self, glyph)
    }
}

impl<T: Animated + ?Sized> Animated for Arc<T> {
    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }

    fn tick(&self, glyph: char) -> Result<(), RenderError> {
        (**self).tick(glyph)
    }
}

/// Fixed-interval spinner driver.
#[derive(Debug, Clone, Copy)]
pub struct Animator {
    interval: Duration,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl Animator {
    /// Animator sleeping `interval` between ticks.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Sleep between ticks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Glyph for the unit at `index` on tick number `tick`.
    pub fn frame(tick: usize, index: usize) -> char {
        SPINNER[(tick + index) % SPINNER.len()]
    }

    /// Animate until every unit reports finished. Returns the number of
    /// ticks painted.
    ///
    /// # Errors
    /// Stops at the first print error.
    pub fn run<U: Animated>(&self, units: &[U]) -> Result<usize, RenderError> {
        let mut tick = 0;
        while !units.iter().all(|unit| unit.is_finished()) {
            for (index, unit) in units.iter().enumerate() {
                if unit.is_finished() {
                    continue;
                }
                unit.tick(Self::frame(tick, index))?;
            }
            tick += 1;
            thread::sleep(self.interval);
        }
        Ok(tick)
    }
}
