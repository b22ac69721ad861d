//! Peripheral seams between the controller and the board.
//!
//! Firmware and the emulator provide concrete types for these traits. The
//! controller never touches pins directly; it only sees samples, button
//! levels, LED patterns, the valve level, and a blocking delay.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::selector::{LedPattern, SampleReading};

/// Blocking source of knob samples.
pub trait Sampler {
    /// Starts a conversion and waits for the result.
    fn read_analog(&mut self) -> SampleReading;
}

/// Fire-and-forget outputs: the LED bar and the valve relay.
pub trait OutputAdapter {
    fn set_leds(&mut self, pattern: LedPattern);

    fn set_valve(&mut self, open: bool);
}

/// A single push button, polled.
pub trait ButtonInput {
    /// Returns `true` while the button is held down.
    fn is_pressed(&mut self) -> bool;

    /// Forgets any press remembered between reads. Inputs that only report
    /// the live level have nothing to forget.
    fn clear_latched(&mut self) {}
}

/// Blocking delay measured in abstract units.
///
/// This is the only way time passes for the controller; there is no clock.
pub trait TickSource {
    fn delay(&mut self, units: u32);
}

impl<T: Sampler + ?Sized> Sampler for &mut T {
    fn read_analog(&mut self) -> SampleReading {
        (**self).read_analog()
    }
}

impl<T: OutputAdapter + ?Sized> OutputAdapter for &mut T {
    fn set_leds(&mut self, pattern: LedPattern) {
        (**self).set_leds(pattern);
    }

    fn set_valve(&mut self, open: bool) {
        (**self).set_valve(open);
    }
}

impl<T: ButtonInput + ?Sized> ButtonInput for &mut T {
    fn is_pressed(&mut self) -> bool {
        (**self).is_pressed()
    }

    fn clear_latched(&mut self) {
        (**self).clear_latched();
    }
}

impl<T: TickSource + ?Sized> TickSource for &mut T {
    fn delay(&mut self, units: u32) {
        (**self).delay(units);
    }
}

/// Tick source wrapper that keeps a running total of delayed units.
pub struct TickCounter<T> {
    inner: T,
    elapsed: u64,
}

impl<T: TickSource> TickCounter<T> {
    /// Creates a new counter starting at zero.
    pub const fn new(inner: T) -> Self {
        Self { inner, elapsed: 0 }
    }

    /// Units delayed since construction.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.elapsed
    }
}

impl<T: TickSource> TickSource for TickCounter<T> {
    fn delay(&mut self, units: u32) {
        self.inner.delay(units);
        self.elapsed = self.elapsed.saturating_add(u64::from(units));
    }
}

/// Press seen by a [`SampledTicks`] and not yet read back.
///
/// Only load and store are used, so the latch also works on cores without
/// compare-and-swap.
#[derive(Debug, Default)]
pub struct PressLatch {
    pressed: AtomicBool,
}

impl PressLatch {
    /// Creates a new, empty latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pressed: AtomicBool::new(false),
        }
    }

    pub fn record(&self) {
        self.pressed.store(true, Ordering::Relaxed);
    }

    /// Returns whether a press was recorded and empties the latch.
    pub fn take(&self) -> bool {
        let pressed = self.pressed.load(Ordering::Relaxed);
        if pressed {
            self.pressed.store(false, Ordering::Relaxed);
        }
        pressed
    }

    pub fn clear(&self) {
        self.pressed.store(false, Ordering::Relaxed);
    }
}

/// Tick source that cuts every delay into short slices and samples one
/// button after each slice.
///
/// A countdown tick can be far longer than a tap. Sampling inside the delay
/// means a press that starts and ends between two controller polls still
/// lands in the latch, where a [`LatchedButton`] reports it.
pub struct SampledTicks<'a, T, I> {
    inner: T,
    input: I,
    latch: &'a PressLatch,
    slice_units: u32,
}

impl<'a, T: TickSource, I: ButtonInput> SampledTicks<'a, T, I> {
    /// Creates a new sampler. A zero slice is treated as one unit.
    pub const fn new(inner: T, input: I, latch: &'a PressLatch, slice_units: u32) -> Self {
        Self {
            inner,
            input,
            latch,
            slice_units: if slice_units == 0 { 1 } else { slice_units },
        }
    }
}

impl<T: TickSource, I: ButtonInput> TickSource for SampledTicks<'_, T, I> {
    fn delay(&mut self, units: u32) {
        let mut remaining = units;
        while remaining > 0 {
            let slice = remaining.min(self.slice_units);
            self.inner.delay(slice);
            remaining -= slice;
            if self.input.is_pressed() {
                self.latch.record();
            }
        }
    }
}

/// Button view backed by a [`PressLatch`].
///
/// Reads report whether the sampling tick source saw the button down at any
/// slice since the previous read. The last slice of a delay ends when the
/// delay returns, so a button still held reads as pressed.
pub struct LatchedButton<'a> {
    latch: &'a PressLatch,
}

impl<'a> LatchedButton<'a> {
    /// Creates a new view of `latch`.
    pub const fn new(latch: &'a PressLatch) -> Self {
        Self { latch }
    }
}

impl ButtonInput for LatchedButton<'_> {
    fn is_pressed(&mut self) -> bool {
        self.latch.take()
    }

    fn clear_latched(&mut self) {
        self.latch.clear();
    }
}

/// Output adapter that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopOutputs;

impl OutputAdapter for NoopOutputs {
    fn set_leds(&mut self, _: LedPattern) {}

    fn set_valve(&mut self, _: bool) {}
}

/// Caches the last level written to each output and only forwards changes.
///
/// Closing an already closed valve is therefore a no-op at the relay.
pub struct Outputs<O> {
    adapter: O,
    leds: Option<LedPattern>,
    valve_open: Option<bool>,
}

impl<O: OutputAdapter> Outputs<O> {
    /// Wraps an adapter whose current levels are unknown.
    pub const fn new(adapter: O) -> Self {
        Self {
            adapter,
            leds: None,
            valve_open: None,
        }
    }

    /// Writes the LED pattern if it differs from the last one written.
    /// Returns `true` when the adapter was driven.
    pub fn set_leds(&mut self, pattern: LedPattern) -> bool {
        if self.leds == Some(pattern) {
            return false;
        }
        self.adapter.set_leds(pattern);
        self.leds = Some(pattern);
        true
    }

    /// Drives the valve if the requested level differs from the last one
    /// written. Returns `true` when the relay actually changed.
    pub fn set_valve(&mut self, open: bool) -> bool {
        if self.valve_open == Some(open) {
            return false;
        }
        self.adapter.set_valve(open);
        self.valve_open = Some(open);
        true
    }

    /// Closes the valve and blanks the bar regardless of cached state.
    pub fn force_safe(&mut self) {
        self.adapter.set_valve(false);
        self.valve_open = Some(false);
        self.adapter.set_leds(LedPattern::EMPTY);
        self.leds = Some(LedPattern::EMPTY);
    }

    #[must_use]
    pub fn leds(&self) -> Option<LedPattern> {
        self.leds
    }

    #[must_use]
    pub fn valve_open(&self) -> bool {
        self.valve_open.unwrap_or(false)
    }

    pub fn adapter(&self) -> &O {
        &self.adapter
    }
}

/// Scoped ownership of an open valve.
///
/// Creating the session opens the valve; dropping it closes the valve. Every
/// way out of a countdown, including an early return, goes through `Drop`.
pub struct ValveSession<'a, O: OutputAdapter> {
    outputs: &'a mut Outputs<O>,
}

impl<'a, O: OutputAdapter> ValveSession<'a, O> {
    pub fn open(outputs: &'a mut Outputs<O>) -> Self {
        outputs.set_valve(true);
        Self { outputs }
    }

    /// Updates the bar while the valve is held open.
    pub fn set_leds(&mut self, pattern: LedPattern) -> bool {
        self.outputs.set_leds(pattern)
    }
}

impl<O: OutputAdapter> Drop for ValveSession<'_, O> {
    fn drop(&mut self) {
        self.outputs.set_valve(false);
    }
}
