//! Controller configuration.

use core::fmt;

use crate::buttons::DEFAULT_SETTLE_UNITS;
use crate::countdown::BarGraphMode;

/// Delay units spent per countdown tick unless configured otherwise.
pub const DEFAULT_TICK_UNITS: u32 = 1;

/// How the selection scan shows crossed tiers on the bar.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ScanEmission {
    /// Only the final tier is written.
    #[default]
    FinalOnly,
    /// Every crossed tier is written in ascending order, so a live bar
    /// flickers up to the selected tier.
    Sequential,
}

/// Tunables for a [`Controller`](crate::controller::Controller).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControllerConfig {
    pub bar_graph: BarGraphMode,
    /// Delay units per countdown tick.
    pub tick_units: u32,
    /// Debounce settle delay, in delay units.
    pub settle_units: u32,
    pub scan: ScanEmission,
}

/// Rejected configuration values.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    ZeroTickUnits,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickUnits => f.write_str("countdown tick must last at least one unit"),
        }
    }
}

impl ControllerConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bar_graph: BarGraphMode::Proportional,
            tick_units: DEFAULT_TICK_UNITS,
            settle_units: DEFAULT_SETTLE_UNITS,
            scan: ScanEmission::FinalOnly,
        }
    }

    #[must_use]
    pub const fn with_bar_graph(mut self, bar_graph: BarGraphMode) -> Self {
        self.bar_graph = bar_graph;
        self
    }

    #[must_use]
    pub const fn with_tick_units(mut self, tick_units: u32) -> Self {
        self.tick_units = tick_units;
        self
    }

    #[must_use]
    pub const fn with_settle_units(mut self, settle_units: u32) -> Self {
        self.settle_units = settle_units;
        self
    }

    #[must_use]
    pub const fn with_scan(mut self, scan: ScanEmission) -> Self {
        self.scan = scan;
        self
    }

    /// Checks the values the controller cannot run with.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_units == 0 {
            return Err(ConfigError::ZeroTickUnits);
        }
        Ok(())
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::new()
    }
}
