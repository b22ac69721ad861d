use std::cell::RefCell;
use std::rc::Rc;

use waterer_core::config::{ControllerConfig, ScanEmission};
use waterer_core::controller::{Controller, ControllerError, ControllerState, Peripherals};
use waterer_core::countdown::{BarGraphMode, CountdownOutcome};
use waterer_core::hardware::{
    ButtonInput, LatchedButton, OutputAdapter, PressLatch, SampledTicks, Sampler, TickSource,
};
use waterer_core::selector::{DurationClass, LedPattern, SampleReading};
use waterer_core::telemetry::{ControllerEvent, TelemetryRecorder};

type BenchController = Controller<
    BenchKnob,
    BenchOutputs,
    BenchButton,
    BenchButton,
    BenchClock,
    TelemetryRecorder<256>,
>;

#[test]
fn start_tap_runs_the_selected_duration_to_completion() {
    let bench = Bench::shared(0x200);
    bench.borrow_mut().start.push(Press::new(0, 10));
    let mut controller = build(&bench, ControllerConfig::default());

    assert_eq!(
        controller.step(),
        ControllerState::Running(DurationClass::Min120)
    );
    assert_eq!(bench.borrow().now, 50, "start waits one settle delay");

    assert_eq!(controller.step(), ControllerState::Selecting);
    let report = controller.last_report().expect("countdown report");
    assert_eq!(report.outcome, CountdownOutcome::Elapsed);
    assert_eq!(report.ticks, 840);
    assert!(!bench.borrow().valve);
    assert_eq!(bench.borrow().now, 50 + 840);
}

#[test]
fn stop_tap_aborts_within_one_tick() {
    let bench = Bench::shared(0x180);
    bench.borrow_mut().start.push(Press::new(0, 10));
    // Countdown starts at t=50; tick three lands on t=53.
    bench.borrow_mut().stop.push(Press::new(53, 5));
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    assert_eq!(controller.step(), ControllerState::Selecting);

    let report = controller.last_report().expect("countdown report");
    assert_eq!(report.outcome, CountdownOutcome::Aborted);
    assert_eq!(report.ticks, 3);
    assert!(!bench.borrow().valve);
    assert_eq!(
        controller
            .telemetry()
            .count(|event| *event == ControllerEvent::StopPressed),
        1
    );
}

#[test]
fn held_stop_fires_on_release() {
    let bench = Bench::shared(0x3FF);
    bench.borrow_mut().start.push(Press::new(0, 10));
    bench.borrow_mut().stop.push(Press::new(52, 80));
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    controller.step();

    let report = controller.last_report().expect("countdown report");
    assert_eq!(report.outcome, CountdownOutcome::Aborted);
    assert!(bench.borrow().now >= 132, "stop fires only after release");
    assert!(!bench.borrow().valve);
}

#[test]
fn valve_toggles_exactly_once_each_way_per_run() {
    let bench = Bench::shared(0x100);
    bench.borrow_mut().start.push(Press::new(0, 10));
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    controller.step();

    let valve_writes: Vec<bool> = bench
        .borrow()
        .writes
        .iter()
        .filter_map(|w| match w {
            Output::Valve(open) => Some(*open),
            Output::Leds(_) => None,
        })
        .collect();
    // Boot forces the valve closed, then one open and one close.
    assert_eq!(valve_writes, vec![false, true, false]);
}

#[test]
fn valve_opens_before_the_bar_starts_counting() {
    let bench = Bench::shared(0x300);
    bench.borrow_mut().start.push(Press::new(0, 10));
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    let before_run = bench.borrow().writes.len();
    controller.step();

    let writes = bench.borrow().writes.clone();
    assert_eq!(writes[before_run], Output::Valve(true));
}

#[test]
fn reentry_restores_the_one_hot_selection() {
    let bench = Bench::shared(0x280);
    bench.borrow_mut().start.push(Press::new(0, 10));
    bench.borrow_mut().stop.push(Press::new(60, 5));
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    controller.step();
    assert_eq!(controller.state(), ControllerState::Selecting);

    controller.step();
    let leds = controller.outputs().leds().expect("bar written");
    assert!(leds.is_one_hot());
    assert_eq!(leds, LedPattern::one_hot(2));
    assert!(!controller.outputs().valve_open());
}

#[test]
fn knob_changes_are_tracked_while_selecting() {
    let bench = Bench::shared(0x000);
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    bench.borrow_mut().knob = 0x0FF;
    controller.step();
    bench.borrow_mut().knob = 0x100;
    controller.step();

    let selections: Vec<DurationClass> = controller
        .telemetry()
        .oldest_first()
        .filter_map(|record| match record.event {
            ControllerEvent::SelectionChanged { duration, .. } => Some(duration),
            _ => None,
        })
        .collect();
    assert_eq!(
        selections,
        vec![DurationClass::Off, DurationClass::Min60, DurationClass::Min80]
    );
    assert_eq!(controller.outputs().leds(), Some(LedPattern::one_hot(5)));
}

#[test]
fn sequential_scan_flickers_through_crossed_tiers() {
    let bench = Bench::shared(0x200);
    let config = ControllerConfig::default().with_scan(ScanEmission::Sequential);
    let mut controller = build(&bench, config);
    let boot_writes = bench.borrow().writes.len();

    controller.step();

    let bars: Vec<u8> = bench.borrow().writes[boot_writes..]
        .iter()
        .filter_map(|w| match w {
            Output::Leds(bits) => Some(*bits),
            Output::Valve(_) => None,
        })
        .collect();
    assert_eq!(bars, vec![1 << 7, 1 << 6, 1 << 5, 1 << 4, 1 << 3]);
}

#[test]
fn repeated_cycles_return_to_selecting_every_time() {
    let bench = Bench::shared(0x090);
    {
        let mut bench = bench.borrow_mut();
        for cycle in 0..200u64 {
            // Each cycle: start tap at the cycle origin, stop tap a few ticks in.
            let origin = cycle * 1_000;
            bench.start.push(Press::new(origin, 10));
            bench.stop.push(Press::new(origin + 53, 5));
        }
    }
    let mut controller = build(&bench, ControllerConfig::default());

    let mut completed = 0;
    for cycle in 0..200u64 {
        bench.borrow_mut().now = cycle * 1_000;
        assert_eq!(
            controller.step(),
            ControllerState::Running(DurationClass::Min60)
        );
        assert_eq!(controller.step(), ControllerState::Selecting);
        assert!(!bench.borrow().valve);
        completed += 1;
    }
    assert_eq!(completed, 200);
}

#[test]
fn fixed_table_mode_is_selectable() {
    let bench = Bench::shared(0x3FF);
    bench.borrow_mut().start.push(Press::new(0, 10));
    let config = ControllerConfig::default().with_bar_graph(BarGraphMode::FixedTable);
    let mut controller = build(&bench, config);

    controller.step();
    controller.step();

    let report = controller.last_report().expect("countdown report");
    assert_eq!(report.duration, DurationClass::Min180);
    assert_eq!(report.ticks, 1575);
}

#[test]
fn reconfigure_is_refused_mid_run() {
    let bench = Bench::shared(0x180);
    bench.borrow_mut().start.push(Press::new(0, 10));
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    assert_eq!(
        controller.reconfigure(ControllerConfig::default()),
        Err(ControllerError::Busy)
    );
}

#[test]
fn telemetry_narrates_a_full_cycle() {
    let bench = Bench::shared(0x200);
    bench.borrow_mut().start.push(Press::new(0, 10));
    let mut controller = build(&bench, ControllerConfig::default());

    controller.step();
    controller.step();

    let labels: Vec<&'static str> = controller
        .telemetry()
        .oldest_first()
        .map(|record| record.event.label())
        .collect();
    assert_eq!(
        labels,
        vec![
            "boot",
            "selection",
            "start",
            "valve-open",
            "countdown",
            "valve-closed"
        ]
    );
    let finished_at = controller
        .telemetry()
        .latest()
        .map(|record| record.at)
        .expect("latest record");
    assert_eq!(finished_at, 890);
}

#[test]
fn stop_tap_between_second_long_ticks_aborts() {
    let bench = Bench::shared(0x3FF);
    bench.borrow_mut().start.push(Press::new(0, 10));
    // Ticks end at t=1050, 2050, ...; the tap is released well before 2050.
    bench.borrow_mut().stop.push(Press::new(1_250, 300));
    let latch = PressLatch::new();
    let mut controller = Controller::new(
        ControllerConfig::default().with_tick_units(1_000),
        Peripherals {
            sampler: BenchKnob(bench.clone()),
            outputs: BenchOutputs(bench.clone()),
            start: bench_button(&bench, Which::Start),
            stop: LatchedButton::new(&latch),
            ticks: SampledTicks::new(
                BenchClock(bench.clone()),
                bench_button(&bench, Which::Stop),
                &latch,
                10,
            ),
        },
        TelemetryRecorder::<256>::new(),
    )
    .expect("bench config is valid");

    controller.step();
    assert_eq!(controller.step(), ControllerState::Selecting);

    let report = controller.last_report().expect("countdown report");
    assert_eq!(report.outcome, CountdownOutcome::Aborted);
    assert_eq!(report.ticks, 2);
    assert!(!bench.borrow().valve);
    assert_eq!(bench.borrow().now, 50 + 2_000 + 50);
}

#[test]
fn stop_pressed_while_selecting_does_not_abort_the_next_run() {
    let bench = Bench::shared(0x100);
    // Stop is down during the start settle delay and released before the run.
    bench.borrow_mut().start.push(Press::new(0, 10));
    bench.borrow_mut().stop.push(Press::new(0, 40));
    let latch = PressLatch::new();
    let mut controller = Controller::new(
        ControllerConfig::default().with_tick_units(1_000),
        Peripherals {
            sampler: BenchKnob(bench.clone()),
            outputs: BenchOutputs(bench.clone()),
            start: bench_button(&bench, Which::Start),
            stop: LatchedButton::new(&latch),
            ticks: SampledTicks::new(
                BenchClock(bench.clone()),
                bench_button(&bench, Which::Stop),
                &latch,
                10,
            ),
        },
        TelemetryRecorder::<256>::new(),
    )
    .expect("bench config is valid");

    controller.step();
    controller.step();

    let report = controller.last_report().expect("countdown report");
    assert_eq!(report.outcome, CountdownOutcome::Elapsed);
    assert_eq!(report.ticks, 560);
}

fn bench_button(bench: &Rc<RefCell<Bench>>, which: Which) -> BenchButton {
    BenchButton {
        bench: bench.clone(),
        which,
    }
}

fn build(bench: &Rc<RefCell<Bench>>, config: ControllerConfig) -> BenchController {
    Controller::new(
        config,
        Peripherals {
            sampler: BenchKnob(bench.clone()),
            outputs: BenchOutputs(bench.clone()),
            start: bench_button(bench, Which::Start),
            stop: bench_button(bench, Which::Stop),
            ticks: BenchClock(bench.clone()),
        },
        TelemetryRecorder::new(),
    )
    .expect("bench config is valid")
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Output {
    Leds(u8),
    Valve(bool),
}

#[derive(Copy, Clone, Debug)]
struct Press {
    at: u64,
    hold: u64,
}

impl Press {
    fn new(at: u64, hold: u64) -> Self {
        Self { at, hold }
    }

    fn covers(&self, now: u64) -> bool {
        now >= self.at && now < self.at + self.hold
    }
}

struct Bench {
    now: u64,
    knob: u16,
    valve: bool,
    writes: Vec<Output>,
    start: Vec<Press>,
    stop: Vec<Press>,
}

impl Bench {
    fn shared(knob: u16) -> Rc<RefCell<Bench>> {
        Rc::new(RefCell::new(Bench {
            now: 0,
            knob,
            valve: false,
            writes: Vec::new(),
            start: Vec::new(),
            stop: Vec::new(),
        }))
    }
}

struct BenchKnob(Rc<RefCell<Bench>>);

impl Sampler for BenchKnob {
    fn read_analog(&mut self) -> SampleReading {
        SampleReading::saturating(self.0.borrow().knob)
    }
}

struct BenchOutputs(Rc<RefCell<Bench>>);

impl OutputAdapter for BenchOutputs {
    fn set_leds(&mut self, pattern: LedPattern) {
        self.0.borrow_mut().writes.push(Output::Leds(pattern.bits()));
    }

    fn set_valve(&mut self, open: bool) {
        let mut bench = self.0.borrow_mut();
        bench.valve = open;
        bench.writes.push(Output::Valve(open));
    }
}

#[derive(Copy, Clone)]
enum Which {
    Start,
    Stop,
}

struct BenchButton {
    bench: Rc<RefCell<Bench>>,
    which: Which,
}

impl ButtonInput for BenchButton {
    fn is_pressed(&mut self) -> bool {
        let bench = self.bench.borrow();
        let presses = match self.which {
            Which::Start => &bench.start,
            Which::Stop => &bench.stop,
        };
        presses.iter().any(|press| press.covers(bench.now))
    }
}

struct BenchClock(Rc<RefCell<Bench>>);

impl TickSource for BenchClock {
    fn delay(&mut self, units: u32) {
        self.0.borrow_mut().now += u64::from(units);
    }
}
