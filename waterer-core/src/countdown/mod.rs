//! Timed valve run with a draining LED bar.
//!
//! The engine opens the valve, then spends ticks from a `time_left` counter
//! while comparing it against a seven-entry [`BarSchedule`]. Each satisfied
//! check lights its segment and each failed check clears it, so the bar fills
//! on the first pass and drains as the run goes on. The run ends when the
//! counter reaches zero or the abort predicate fires; either way the valve is
//! closed by the [`ValveSession`] guard on the way out.

use core::fmt;

use crate::hardware::{OutputAdapter, Outputs, TickSource, ValveSession};
use crate::selector::{DurationClass, LedPattern};

pub mod tables;

pub use tables::{
    BAR_SEGMENTS, BarSchedule, Cadence, FIXED_SCHEDULES, fixed_schedule, proportional_schedule,
};

/// Which threshold set drives the bar.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BarGraphMode {
    /// Thresholds computed from the 7/8ths formula.
    #[default]
    Proportional,
    /// Literal per-duration tables.
    FixedTable,
}

impl BarGraphMode {
    /// Resolves the schedule used for `duration`.
    #[must_use]
    pub fn schedule(self, duration: DurationClass) -> BarSchedule {
        match self {
            BarGraphMode::Proportional => proportional_schedule(duration),
            BarGraphMode::FixedTable => fixed_schedule(duration),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            BarGraphMode::Proportional => "proportional",
            BarGraphMode::FixedTable => "fixed-table",
        }
    }
}

impl fmt::Display for BarGraphMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a countdown ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CountdownOutcome {
    Elapsed,
    Aborted,
}

impl fmt::Display for CountdownOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownOutcome::Elapsed => f.write_str("elapsed"),
            CountdownOutcome::Aborted => f.write_str("aborted"),
        }
    }
}

/// Summary of a finished countdown.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CountdownReport {
    pub duration: DurationClass,
    pub outcome: CountdownOutcome,
    /// Ticks spent, including the one that ended the run.
    pub ticks: u32,
    /// Counter value when the run ended.
    pub time_left: i32,
}

/// Runs countdowns with a fixed bar-graph mode and tick length.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CountdownEngine {
    mode: BarGraphMode,
    tick_units: u32,
}

impl CountdownEngine {
    /// Creates a new engine for one bar-graph mode and tick length.
    #[must_use]
    pub const fn new(mode: BarGraphMode, tick_units: u32) -> Self {
        Self { mode, tick_units }
    }

    #[must_use]
    pub const fn mode(&self) -> BarGraphMode {
        self.mode
    }

    #[must_use]
    pub const fn tick_units(&self) -> u32 {
        self.tick_units
    }

    /// Opens the valve and blocks until `duration` has elapsed or
    /// `should_abort` returns `true`.
    ///
    /// `should_abort` is polled once per tick, after the counter is checked,
    /// and receives the tick source so a debounce can wait for its input to
    /// settle.
    pub fn run<O, T, F>(
        &self,
        duration: DurationClass,
        outputs: &mut Outputs<O>,
        ticks: &mut T,
        should_abort: F,
    ) -> CountdownReport
    where
        O: OutputAdapter,
        T: TickSource,
        F: FnMut(&mut T) -> bool,
    {
        let schedule = self.mode.schedule(duration);
        let mut run = Run {
            session: ValveSession::open(outputs),
            ticks,
            should_abort,
            tick_units: self.tick_units,
            time_left: schedule.initial,
            spent: 0,
            bar: LedPattern::EMPTY,
        };

        let outcome = run.drive(&schedule);
        CountdownReport {
            duration,
            outcome,
            ticks: run.spent,
            time_left: run.time_left,
        }
    }
}

impl Default for CountdownEngine {
    fn default() -> Self {
        Self::new(BarGraphMode::default(), 1)
    }
}

/// State for one run. Dropping it closes the valve.
struct Run<'a, 'o, O: OutputAdapter, T, F> {
    session: ValveSession<'o, O>,
    ticks: &'a mut T,
    should_abort: F,
    tick_units: u32,
    time_left: i32,
    spent: u32,
    bar: LedPattern,
}

impl<O, T, F> Run<'_, '_, O, T, F>
where
    O: OutputAdapter,
    T: TickSource,
    F: FnMut(&mut T) -> bool,
{
    fn drive(&mut self, schedule: &BarSchedule) -> CountdownOutcome {
        loop {
            match schedule.cadence {
                Cadence::PerCheck => {
                    for (bit, threshold) in (0u8..).zip(schedule.thresholds) {
                        if let Some(outcome) = self.tick() {
                            return outcome;
                        }
                        self.check(bit, threshold);
                    }
                }
                Cadence::PerPass => {
                    if let Some(outcome) = self.tick() {
                        return outcome;
                    }
                    for (bit, threshold) in (0u8..).zip(schedule.thresholds) {
                        self.check(bit, threshold);
                    }
                }
            }
        }
    }

    fn tick(&mut self) -> Option<CountdownOutcome> {
        self.ticks.delay(self.tick_units);
        self.time_left -= 1;
        self.spent = self.spent.saturating_add(1);

        if self.time_left <= 0 {
            return Some(CountdownOutcome::Elapsed);
        }
        if (self.should_abort)(&mut *self.ticks) {
            return Some(CountdownOutcome::Aborted);
        }
        None
    }

    fn check(&mut self, bit: u8, threshold: i32) {
        self.bar = if self.time_left > threshold {
            self.bar.with_bit(bit)
        } else {
            self.bar.without_bit(bit)
        };
        self.session.set_leds(self.bar);
    }
}
