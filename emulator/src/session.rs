use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::rc::Rc;

use crossterm::style::Stylize;
use waterer_core::config::ControllerConfig;
use waterer_core::controller::{Controller, ControllerState, Peripherals};
use waterer_core::countdown::{BarGraphMode, CountdownOutcome};
use waterer_core::hardware::{ButtonInput, OutputAdapter, Sampler, TickSource};
use waterer_core::selector::{LED_COUNT, LedPattern, SampleReading};
use waterer_core::telemetry::{ControllerEvent, TelemetrySink, TickStamp};

use crate::script::{self, Button, Command};

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("knob", "knob <0-1023>                     - turn the duration knob"),
    (
        "sample",
        "sample [count]                    - run controller steps (default 1)",
    ),
    (
        "press",
        "press <start|stop> [+offset] [hold <units>] - schedule a button press",
    ),
    (
        "start",
        "start                             - tap Start and water until the run ends",
    ),
    (
        "mode",
        "mode <proportional|table>         - choose the bar-graph thresholds",
    ),
    (
        "status",
        "status                            - show controller and output state",
    ),
    (
        "help",
        "help [topic]                      - show help for a command",
    ),
];

/// Safety limit for `sample`; a single step can already run a whole countdown.
const MAX_SAMPLE_STEPS: u32 = 10_000;

type EmuController = Controller<EmuKnob, EmuOutputs, EmuButton, EmuButton, EmuClock, EventLog>;

/// Console options shared by the REPL and the transcript recorder.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    /// Render the LED bar with terminal colors.
    pub color: bool,
    /// Mirror the session into this file.
    pub transcript: Option<String>,
}

/// Simulated board plus the controller driving it.
pub struct Session {
    world: Rc<RefCell<World>>,
    controller: EmuController,
    transcript: Option<TranscriptLogger>,
    color: bool,
}

impl Session {
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        let world = Rc::new(RefCell::new(World::default()));
        let peripherals = Peripherals {
            sampler: EmuKnob(world.clone()),
            outputs: EmuOutputs(world.clone()),
            start: EmuButton {
                world: world.clone(),
                button: Button::Start,
            },
            stop: EmuButton {
                world: world.clone(),
                button: Button::Stop,
            },
            ticks: EmuClock(world.clone()),
        };
        let controller = Controller::new(ControllerConfig::default(), peripherals, EventLog::default())
            .map_err(|err| io::Error::other(err.to_string()))?;

        let transcript = match options.transcript.as_deref() {
            Some(path) => Some(TranscriptLogger::new(Path::new(path))?),
            None => None,
        };

        let mut session = Self {
            world,
            controller,
            transcript,
            color: options.color,
        };
        let boot = session.drain_events();
        session.record_output(&boot)?;
        Ok(session)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.record_line(TranscriptRole::Host, trimmed)?;

        let lines = match script::parse(trimmed) {
            Ok(command) => self.execute(command),
            Err(err) => vec![format!("ERR syntax {err}")],
        };

        self.record_output(&lines)?;
        Ok(lines)
    }

    fn execute(&mut self, command: Command) -> Vec<String> {
        match command {
            Command::Knob(raw) => self.turn_knob(raw),
            Command::Sample(count) => self.sample(count),
            Command::Press {
                button,
                offset,
                hold,
            } => self.schedule_press(button, offset, hold),
            Command::Start => self.start(),
            Command::Mode(mode) => self.set_mode(mode),
            Command::Status => vec![self.status_line()],
            Command::Help(topic) => help(topic.as_deref()),
        }
    }

    fn turn_knob(&mut self, raw: u16) -> Vec<String> {
        match SampleReading::new(raw) {
            Ok(reading) => {
                self.world.borrow_mut().knob = reading;
                vec![format!("OK knob={}", reading.raw())]
            }
            Err(err) => vec![format!("ERR knob {err}")],
        }
    }

    fn sample(&mut self, count: u32) -> Vec<String> {
        if count == 0 || count > MAX_SAMPLE_STEPS {
            return vec![format!("ERR sample count must be 1..={MAX_SAMPLE_STEPS}")];
        }

        for _ in 0..count {
            self.controller.step();
        }
        let mut lines = self.drain_events();
        lines.push(self.status_line());
        lines
    }

    fn schedule_press(&mut self, button: Button, offset: u64, hold: u64) -> Vec<String> {
        if hold == 0 {
            return vec!["ERR press hold must be at least one unit".to_string()];
        }

        let mut world = self.world.borrow_mut();
        let at = world.now.saturating_add(offset);
        world.presses.push(ScheduledPress { button, at, hold });
        vec![format!("OK press {button} at=t{at} hold={hold}")]
    }

    /// Taps Start now and runs the controller until it is selecting again.
    fn start(&mut self) -> Vec<String> {
        if self.controller.state().is_running() {
            return vec!["ERR busy".to_string()];
        }

        {
            let mut world = self.world.borrow_mut();
            let at = world.now;
            world.presses.push(ScheduledPress {
                button: Button::Start,
                at,
                hold: script::DEFAULT_HOLD_UNITS,
            });
        }

        let ran = self.controller.step().is_running();
        if ran {
            self.controller.step();
        }

        let mut lines = self.drain_events();
        match self.controller.last_report() {
            Some(report) if ran => {
                let verdict = match report.outcome {
                    CountdownOutcome::Elapsed => "OK watered",
                    CountdownOutcome::Aborted => "OK stopped",
                };
                lines.push(format!(
                    "{verdict} duration={} ticks={} left={}",
                    report.duration, report.ticks, report.time_left
                ));
            }
            _ => lines.push("WARN start did not register".to_string()),
        }
        lines.push(self.status_line());
        lines
    }

    fn set_mode(&mut self, mode: BarGraphMode) -> Vec<String> {
        let config = self.controller.config().with_bar_graph(mode);
        match self.controller.reconfigure(config) {
            Ok(()) => vec![format!("OK mode={mode}")],
            Err(err) => vec![format!("ERR mode {err}")],
        }
    }

    fn status_line(&self) -> String {
        let world = self.world.borrow();
        let state = match self.controller.state() {
            ControllerState::Selecting => "selecting".to_string(),
            ControllerState::Running(duration) => format!("running({duration})"),
        };
        let selected = self
            .controller
            .last_selection()
            .map_or_else(|| "-".to_string(), |selection| selection.duration.to_string());

        format!(
            "state={state} knob={} selected={selected} bar={} valve={} mode={} t={}",
            world.knob.raw(),
            render_bar(world.leds, self.color),
            if world.valve_open { "open" } else { "closed" },
            self.controller.config().bar_graph,
            world.now,
        )
    }

    fn drain_events(&mut self) -> Vec<String> {
        self.controller
            .telemetry_mut()
            .pending
            .drain(..)
            .map(|(at, event)| format!("EVT t{at} {event}"))
            .collect()
    }

    fn record_line(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        let now = self.world.borrow().now;
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(now, role, line),
            None => Ok(()),
        }
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.record_line(TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }
}

fn help(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Bar as eight glyphs, bit 0 on the left.
pub fn render_bar(pattern: LedPattern, color: bool) -> String {
    let mut rendered = String::from("[");
    for bit in 0..LED_COUNT {
        let lit = pattern.is_set(bit);
        let glyph = if lit { "#" } else { "." };
        if !color {
            rendered.push_str(glyph);
        } else if !lit {
            rendered.push_str(&glyph.dark_grey().to_string());
        } else if bit == LED_COUNT - 1 {
            // The last LED marks the off position.
            rendered.push_str(&glyph.red().to_string());
        } else {
            rendered.push_str(&glyph.green().to_string());
        }
    }
    rendered.push(']');
    rendered
}

#[derive(Copy, Clone, Debug)]
struct ScheduledPress {
    button: Button,
    at: u64,
    hold: u64,
}

impl ScheduledPress {
    fn covers(&self, button: Button, now: u64) -> bool {
        self.button == button && now >= self.at && now - self.at < self.hold
    }
}

#[derive(Default)]
struct World {
    /// Delay units elapsed since boot.
    now: u64,
    knob: SampleReading,
    leds: LedPattern,
    valve_open: bool,
    presses: Vec<ScheduledPress>,
}

impl World {
    fn is_pressed(&mut self, button: Button) -> bool {
        let now = self.now;
        self.presses
            .retain(|press| press.at.saturating_add(press.hold) > now);
        self.presses.iter().any(|press| press.covers(button, now))
    }
}

struct EmuKnob(Rc<RefCell<World>>);

impl Sampler for EmuKnob {
    fn read_analog(&mut self) -> SampleReading {
        self.0.borrow().knob
    }
}

struct EmuOutputs(Rc<RefCell<World>>);

impl OutputAdapter for EmuOutputs {
    fn set_leds(&mut self, pattern: LedPattern) {
        self.0.borrow_mut().leds = pattern;
    }

    fn set_valve(&mut self, open: bool) {
        self.0.borrow_mut().valve_open = open;
    }
}

struct EmuButton {
    world: Rc<RefCell<World>>,
    button: Button,
}

impl ButtonInput for EmuButton {
    fn is_pressed(&mut self) -> bool {
        self.world.borrow_mut().is_pressed(self.button)
    }
}

struct EmuClock(Rc<RefCell<World>>);

impl TickSource for EmuClock {
    fn delay(&mut self, units: u32) {
        self.0.borrow_mut().now += u64::from(units);
    }
}

/// Buffers controller events until the session prints them.
#[derive(Default)]
struct EventLog {
    pending: Vec<(TickStamp, ControllerEvent)>,
}

impl TelemetrySink for EventLog {
    fn record(&mut self, at: TickStamp, event: ControllerEvent) {
        self.pending.push((at, event));
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Garden waterer emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are simulated delay units since boot"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, now: u64, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(self.writer, "[t{now:>7}] {} {line}", role.prefix())?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SessionOptions::default()).expect("session")
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).expect("command")
    }

    #[test]
    fn start_waters_for_the_selected_class() {
        let mut session = session();
        run(&mut session, "knob 300");
        let lines = run(&mut session, "start");

        assert!(
            lines
                .iter()
                .any(|line| line.starts_with("OK watered duration=80 ticks=560")),
            "{lines:?}"
        );
        assert!(lines.last().is_some_and(|line| line.contains("valve=closed")));
    }

    #[test]
    fn scheduled_stop_cuts_the_run_short() {
        let mut session = session();
        run(&mut session, "knob 1023");
        run(&mut session, "press stop +100");
        let lines = run(&mut session, "start");

        assert!(
            lines.iter().any(|line| line.starts_with("OK stopped duration=180")),
            "{lines:?}"
        );
    }

    #[test]
    fn out_of_range_knob_is_rejected() {
        let mut session = session();
        let lines = run(&mut session, "knob 1024");
        assert!(lines[0].starts_with("ERR knob"), "{lines:?}");
    }

    #[test]
    fn sample_reports_the_one_hot_bar() {
        let mut session = session();
        run(&mut session, "knob 640");
        let lines = run(&mut session, "sample");

        assert!(lines.iter().any(|line| line.starts_with("EVT t0 selection duration=140")));
        assert!(lines.last().is_some_and(|line| line.contains("bar=[..#.....]")));
    }

    #[test]
    fn mode_switch_is_reported() {
        let mut session = session();
        assert_eq!(run(&mut session, "mode table"), vec!["OK mode=fixed-table"]);
        let status = run(&mut session, "status");
        assert!(status[0].contains("mode=fixed-table"));
    }

    #[test]
    fn syntax_errors_are_reported_not_fatal() {
        let mut session = session();
        let lines = run(&mut session, "water now");
        assert!(lines[0].starts_with("ERR syntax"));
        assert_eq!(run(&mut session, "help mode").len(), 1);
    }

    #[test]
    fn plain_bar_rendering() {
        assert_eq!(render_bar(LedPattern::from_bits(0x81), false), "[#......#]");
        assert_eq!(render_bar(LedPattern::EMPTY, false), "[........]");
    }
}
