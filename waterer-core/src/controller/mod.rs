//! Two-state control loop: pick a duration, then water for it.
//!
//! While `Selecting`, every step samples the knob, shows the tier on the bar,
//! and polls Start. When Start fires the last classified duration is carried
//! into `Running`, where a single step runs the whole countdown and polls Stop
//! once per tick. Whichever way the countdown ends, the valve is closed and
//! the controller is back in `Selecting`. Both transitions are plain state
//! assignments inside [`Controller::step`]; the loop never re-enters itself.

use core::fmt;

use crate::buttons::ButtonMonitor;
use crate::config::{ConfigError, ControllerConfig, ScanEmission};
use crate::countdown::{CountdownEngine, CountdownOutcome, CountdownReport};
use crate::hardware::{ButtonInput, OutputAdapter, Outputs, Sampler, TickCounter, TickSource};
use crate::selector::{DurationClass, Selection, select, select_with};
use crate::telemetry::{ControllerEvent, TelemetrySink};

/// Controller lifecycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerState {
    Selecting,
    Running(DurationClass),
}

impl ControllerState {
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, ControllerState::Running(_))
    }
}

/// Errors reported by controller setup and reconfiguration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerError {
    /// Configuration can only change while selecting.
    Busy,
    Config(ConfigError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Busy => f.write_str("controller is running a countdown"),
            ControllerError::Config(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::Config(err)
    }
}

/// Hardware handles the controller is built from.
pub struct Peripherals<S, O, A, B, T> {
    pub sampler: S,
    pub outputs: O,
    pub start: A,
    pub stop: B,
    pub ticks: T,
}

/// The waterer's top-level loop.
pub struct Controller<S, O, A, B, T, E> {
    config: ControllerConfig,
    engine: CountdownEngine,
    sampler: S,
    outputs: Outputs<O>,
    buttons: ButtonMonitor<A, B>,
    ticks: TickCounter<T>,
    telemetry: E,
    state: ControllerState,
    last_selection: Option<Selection>,
    last_report: Option<CountdownReport>,
}

impl<S, O, A, B, T, E> Controller<S, O, A, B, T, E>
where
    S: Sampler,
    O: OutputAdapter,
    A: ButtonInput,
    B: ButtonInput,
    T: TickSource,
    E: TelemetrySink,
{
    /// Validates `config`, forces the valve closed and the bar blank, and
    /// starts out selecting.
    pub fn new(
        config: ControllerConfig,
        peripherals: Peripherals<S, O, A, B, T>,
        telemetry: E,
    ) -> Result<Self, ControllerError> {
        config.validate()?;

        let Peripherals {
            sampler,
            outputs,
            start,
            stop,
            ticks,
        } = peripherals;

        let mut controller = Self {
            config,
            engine: CountdownEngine::new(config.bar_graph, config.tick_units),
            sampler,
            outputs: Outputs::new(outputs),
            buttons: ButtonMonitor::new(start, stop, config.settle_units),
            ticks: TickCounter::new(ticks),
            telemetry,
            state: ControllerState::Selecting,
            last_selection: None,
            last_report: None,
        };
        controller.outputs.force_safe();
        controller.emit(ControllerEvent::Boot);
        Ok(controller)
    }

    /// Runs the loop forever.
    pub fn run(&mut self) -> ! {
        loop {
            self.step();
        }
    }

    /// Performs one selection iteration or one complete countdown and
    /// returns the state the controller is left in.
    pub fn step(&mut self) -> ControllerState {
        match self.state {
            ControllerState::Selecting => self.select_once(),
            ControllerState::Running(duration) => self.water(duration),
        }
        self.state
    }

    /// Replaces the configuration. Only allowed while selecting.
    pub fn reconfigure(&mut self, config: ControllerConfig) -> Result<(), ControllerError> {
        if self.state.is_running() {
            return Err(ControllerError::Busy);
        }
        config.validate()?;

        self.config = config;
        self.engine = CountdownEngine::new(config.bar_graph, config.tick_units);
        self.buttons.set_settle_units(config.settle_units);
        Ok(())
    }

    fn select_once(&mut self) {
        let sample = self.sampler.read_analog();
        let selection = match self.config.scan {
            ScanEmission::FinalOnly => select(sample),
            ScanEmission::Sequential => {
                let outputs = &mut self.outputs;
                select_with(sample, |pattern| {
                    outputs.set_leds(pattern);
                })
            }
        };
        self.outputs.set_leds(selection.pattern);

        let changed = self
            .last_selection
            .is_none_or(|previous| previous.duration != selection.duration);
        if changed {
            self.emit(ControllerEvent::SelectionChanged {
                sample,
                duration: selection.duration,
                pattern: selection.pattern,
            });
        }
        self.last_selection = Some(selection);

        if self.buttons.poll_start(&mut self.ticks) {
            self.emit(ControllerEvent::StartPressed(selection.duration));
            self.state = ControllerState::Running(selection.duration);
        }
    }

    fn water(&mut self, duration: DurationClass) {
        self.buttons.stop_mut().disarm();
        self.emit(ControllerEvent::ValveOpened(duration));

        let buttons = &mut self.buttons;
        let report = self.engine.run(
            duration,
            &mut self.outputs,
            &mut self.ticks,
            |ticks| buttons.poll_stop(ticks),
        );

        if report.outcome == CountdownOutcome::Aborted {
            self.emit(ControllerEvent::StopPressed);
        }
        // The countdown's guard has already closed the valve; this only
        // writes if something reopened it.
        self.outputs.set_valve(false);
        self.emit(ControllerEvent::CountdownFinished(report));
        self.emit(ControllerEvent::ValveClosed);

        self.last_report = Some(report);
        self.last_selection = None;
        self.buttons.start_mut().disarm();
        self.state = ControllerState::Selecting;
    }

    fn emit(&mut self, event: ControllerEvent) {
        self.telemetry.record(self.ticks.elapsed(), event);
    }

    #[must_use]
    pub const fn state(&self) -> ControllerState {
        self.state
    }

    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    #[must_use]
    pub const fn last_selection(&self) -> Option<Selection> {
        self.last_selection
    }

    #[must_use]
    pub const fn last_report(&self) -> Option<CountdownReport> {
        self.last_report
    }

    /// Delay units spent since boot.
    #[must_use]
    pub const fn elapsed(&self) -> u64 {
        self.ticks.elapsed()
    }

    pub fn outputs(&self) -> &Outputs<O> {
        &self.outputs
    }

    pub fn telemetry(&self) -> &E {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut E {
        &mut self.telemetry
    }
}
