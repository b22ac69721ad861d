//! Controller event catalog shared by firmware and host targets.
//!
//! The controller reports what it does as typed [`ControllerEvent`]s through a
//! [`TelemetrySink`]. Firmware forwards them to the debug log, the emulator
//! prints them, and tests keep them in a [`TelemetryRecorder`] ring buffer.
//! Events can be packed into a compact numeric code for transports that only
//! carry integers.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::countdown::{CountdownOutcome, CountdownReport};
use crate::selector::{DurationClass, LedPattern, SampleReading};

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Elapsed delay units since boot.
pub type TickStamp = u64;

/// Everything the controller reports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControllerEvent {
    /// Outputs forced safe at power-up.
    Boot,
    /// The knob moved into a different tier.
    SelectionChanged {
        sample: SampleReading,
        duration: DurationClass,
        pattern: LedPattern,
    },
    /// Start fired while selecting.
    StartPressed(DurationClass),
    ValveOpened(DurationClass),
    /// Stop fired during a countdown.
    StopPressed,
    CountdownFinished(CountdownReport),
    ValveClosed,
}

impl fmt::Display for ControllerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerEvent::Boot => f.write_str("boot"),
            ControllerEvent::SelectionChanged {
                sample,
                duration,
                pattern,
            } => write!(
                f,
                "selection duration={duration} sample={} leds={pattern}",
                sample.raw()
            ),
            ControllerEvent::StartPressed(duration) => write!(f, "start duration={duration}"),
            ControllerEvent::ValveOpened(duration) => write!(f, "valve-open duration={duration}"),
            ControllerEvent::StopPressed => f.write_str("stop"),
            ControllerEvent::CountdownFinished(report) => write!(
                f,
                "countdown-{} duration={} ticks={} left={}",
                report.outcome, report.duration, report.ticks, report.time_left
            ),
            ControllerEvent::ValveClosed => f.write_str("valve-closed"),
        }
    }
}

impl ControllerEvent {
    const BOOT_CODE: u16 = 0x0001;
    const STOP_CODE: u16 = 0x0002;
    const VALVE_CLOSED_CODE: u16 = 0x0003;
    const SELECTION_BASE: u16 = 0x0010;
    const START_BASE: u16 = 0x0020;
    const VALVE_OPENED_BASE: u16 = 0x0030;
    const ELAPSED_BASE: u16 = 0x0040;
    const ABORTED_BASE: u16 = 0x0050;

    /// Packs the event kind and its duration class into a transport code.
    /// Payload details beyond the duration class are dropped.
    #[must_use]
    pub fn to_raw(self) -> u16 {
        match self {
            ControllerEvent::Boot => Self::BOOT_CODE,
            ControllerEvent::StopPressed => Self::STOP_CODE,
            ControllerEvent::ValveClosed => Self::VALVE_CLOSED_CODE,
            ControllerEvent::SelectionChanged { duration, .. } => {
                Self::SELECTION_BASE + duration_offset(duration)
            }
            ControllerEvent::StartPressed(duration) => Self::START_BASE + duration_offset(duration),
            ControllerEvent::ValveOpened(duration) => {
                Self::VALVE_OPENED_BASE + duration_offset(duration)
            }
            ControllerEvent::CountdownFinished(report) => {
                let base = match report.outcome {
                    CountdownOutcome::Elapsed => Self::ELAPSED_BASE,
                    CountdownOutcome::Aborted => Self::ABORTED_BASE,
                };
                base + duration_offset(report.duration)
            }
        }
    }

    /// Short label used by log transports.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            ControllerEvent::Boot => "boot",
            ControllerEvent::SelectionChanged { .. } => "selection",
            ControllerEvent::StartPressed(_) => "start",
            ControllerEvent::ValveOpened(_) => "valve-open",
            ControllerEvent::StopPressed => "stop",
            ControllerEvent::CountdownFinished(_) => "countdown",
            ControllerEvent::ValveClosed => "valve-closed",
        }
    }
}

fn duration_offset(duration: DurationClass) -> u16 {
    // Eight classes always fit in the low nibble.
    u16::try_from(duration.as_index()).unwrap_or(0)
}

/// Receiver for controller events.
pub trait TelemetrySink {
    fn record(&mut self, at: TickStamp, event: ControllerEvent);
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for &mut T {
    fn record(&mut self, at: TickStamp, event: ControllerEvent) {
        (**self).record(at, event);
    }
}

/// Sink that drops every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&mut self, _: TickStamp, _: ControllerEvent) {}
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub at: TickStamp,
    pub event: ControllerEvent,
}

/// Records controller events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Counts stored records matching `predicate`.
    pub fn count<P>(&self, mut predicate: P) -> usize
    where
        P: FnMut(&ControllerEvent) -> bool,
    {
        self.oldest_first()
            .filter(|record| predicate(&record.event))
            .count()
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> TelemetrySink for TelemetryRecorder<CAPACITY> {
    fn record(&mut self, at: TickStamp, event: ControllerEvent) {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TelemetryRecord { id, at, event });
    }
}
