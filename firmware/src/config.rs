//! Build-time controller settings for the board.

use waterer_core::config::{ControllerConfig, ScanEmission};
use waterer_core::countdown::BarGraphMode;

/// Delay units per countdown tick. One unit is one millisecond, so a tick is
/// one second and a duration class counts seconds of watering.
pub const COUNTDOWN_TICK_UNITS: u32 = 1_000;

/// Button settle delay in milliseconds.
pub const SETTLE_UNITS: u32 = 50;

/// How often the Stop pin is sampled while the controller is blocked in a
/// delay, in milliseconds. Presses seen here are latched until the next poll.
pub const STOP_SAMPLE_UNITS: u32 = 10;

const _: () = assert!(STOP_SAMPLE_UNITS > 0 && STOP_SAMPLE_UNITS < SETTLE_UNITS);

/// Threshold source picked by the `fixed-table` cargo feature.
pub const BAR_GRAPH: BarGraphMode = if cfg!(feature = "fixed-table") {
    BarGraphMode::FixedTable
} else {
    BarGraphMode::Proportional
};

#[must_use]
pub const fn controller_config() -> ControllerConfig {
    ControllerConfig::new()
        .with_bar_graph(BAR_GRAPH)
        .with_tick_units(COUNTDOWN_TICK_UNITS)
        .with_settle_units(SETTLE_UNITS)
        .with_scan(ScanEmission::FinalOnly)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_config_is_valid() {
        let config = controller_config();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.tick_units, COUNTDOWN_TICK_UNITS);
        assert_eq!(config.bar_graph, BAR_GRAPH);
    }

}
