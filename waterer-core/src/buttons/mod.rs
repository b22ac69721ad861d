//! Trailing-edge button handling for Start and Stop.
//!
//! A button fires on press-then-release, not on level. When a poll sees the
//! input pressed it waits for the settle delay; if the input has been released
//! by then the press counts. A press that is still held after the settle delay
//! arms the button, and the next poll that sees it released fires.

use crate::hardware::{ButtonInput, TickSource};

/// Settle delay between the press sample and the release sample.
pub const DEFAULT_SETTLE_UNITS: u32 = 50;

/// Press-then-release detector for a single input.
pub struct TrailingEdge<I> {
    input: I,
    settle_units: u32,
    armed: bool,
}

impl<I: ButtonInput> TrailingEdge<I> {
    /// Creates a new, disarmed detector.
    pub const fn new(input: I, settle_units: u32) -> Self {
        Self {
            input,
            settle_units,
            armed: false,
        }
    }

    /// Returns `true` once per completed press-and-release.
    pub fn poll<T: TickSource + ?Sized>(&mut self, ticks: &mut T) -> bool {
        if self.input.is_pressed() {
            ticks.delay(self.settle_units);
            if self.input.is_pressed() {
                self.armed = true;
                return false;
            }
            self.armed = false;
            return true;
        }

        if self.armed {
            self.armed = false;
            return true;
        }
        false
    }

    /// Drops any half-seen press, including one the input has latched.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.input.clear_latched();
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn set_settle_units(&mut self, settle_units: u32) {
        self.settle_units = settle_units;
    }
}

/// The Start and Stop buttons. They may be read through different input
/// types, e.g. a live pin for Start and a latched one for Stop.
pub struct ButtonMonitor<A, B> {
    start: TrailingEdge<A>,
    stop: TrailingEdge<B>,
}

impl<A: ButtonInput, B: ButtonInput> ButtonMonitor<A, B> {
    /// Creates a new monitor with both buttons disarmed.
    pub const fn new(start: A, stop: B, settle_units: u32) -> Self {
        Self {
            start: TrailingEdge::new(start, settle_units),
            stop: TrailingEdge::new(stop, settle_units),
        }
    }

    pub fn poll_start<T: TickSource + ?Sized>(&mut self, ticks: &mut T) -> bool {
        self.start.poll(ticks)
    }

    pub fn poll_stop<T: TickSource + ?Sized>(&mut self, ticks: &mut T) -> bool {
        self.stop.poll(ticks)
    }

    /// Forgets half-seen presses on both buttons.
    pub fn disarm(&mut self) {
        self.start.disarm();
        self.stop.disarm();
    }

    pub fn set_settle_units(&mut self, settle_units: u32) {
        self.start.set_settle_units(settle_units);
        self.stop.set_settle_units(settle_units);
    }

    pub fn start_mut(&mut self) -> &mut TrailingEdge<A> {
        &mut self.start
    }

    pub fn stop_mut(&mut self) -> &mut TrailingEdge<B> {
        &mut self.stop
    }
}
