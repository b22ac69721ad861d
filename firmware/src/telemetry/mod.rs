//! Controller event logging.
//!
//! Events go to defmt over RTT on the target and to stdout on the host. A
//! small ring of recent records is kept alongside so a debugger halt shows the
//! last few transitions without an attached log reader.

use waterer_core::telemetry::{ControllerEvent, TelemetryRecorder, TelemetrySink, TickStamp};

/// Records kept in RAM next to the log stream.
pub const RECENT_EVENTS: usize = 16;

/// Telemetry sink that mirrors every event to the debug log.
pub struct LogTelemetry {
    recent: TelemetryRecorder<RECENT_EVENTS>,
}

impl LogTelemetry {
    /// Creates a new sink with an empty recent-event ring.
    pub const fn new() -> Self {
        Self {
            recent: TelemetryRecorder::new(),
        }
    }

    pub fn recent(&self) -> &TelemetryRecorder<RECENT_EVENTS> {
        &self.recent
    }
}

impl Default for LogTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for LogTelemetry {
    fn record(&mut self, at: TickStamp, event: ControllerEvent) {
        self.recent.record(at, event);
        emit_log(at, &event);
    }
}

#[cfg(target_os = "none")]
fn emit_log(at: TickStamp, event: &ControllerEvent) {
    match event {
        ControllerEvent::StopPressed | ControllerEvent::ValveClosed => {
            defmt::warn!(
                "telemetry:{} t={}ms code={=u16:#x} {}",
                event.label(),
                at,
                event.to_raw(),
                defmt::Display2Format(event)
            );
        }
        _ => {
            defmt::info!(
                "telemetry:{} t={}ms code={=u16:#x} {}",
                event.label(),
                at,
                event.to_raw(),
                defmt::Display2Format(event)
            );
        }
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(at: TickStamp, event: &ControllerEvent) {
    println!(
        "telemetry:{} t={}ms code={:#x} {}",
        event.label(),
        at,
        event.to_raw(),
        event
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterer_core::selector::DurationClass;

    #[test]
    fn keeps_recent_events_while_logging() {
        let mut telemetry = LogTelemetry::new();
        telemetry.record(0, ControllerEvent::Boot);
        telemetry.record(50, ControllerEvent::StartPressed(DurationClass::Min60));

        assert_eq!(telemetry.recent().len(), 2);
        assert_eq!(
            telemetry.recent().latest().map(|record| record.event),
            Some(ControllerEvent::StartPressed(DurationClass::Min60))
        );
    }

    #[test]
    fn recent_ring_is_bounded() {
        let mut telemetry = LogTelemetry::new();
        for at in 0..40 {
            telemetry.record(at, ControllerEvent::StopPressed);
        }
        assert_eq!(telemetry.recent().len(), RECENT_EVENTS);
    }
}
