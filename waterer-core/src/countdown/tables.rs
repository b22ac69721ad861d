//! Bar-graph threshold tables.
//!
//! The proportional schedule derives its thresholds from the 7/8ths formula
//! at run time. The fixed schedules are literal values that do not follow the
//! formula. They are placeholders calibrated near the 7/8ths boundaries, not
//! thresholds measured on a real bed; replace a row once field-tuned numbers
//! exist for that duration.

use crate::selector::DurationClass;

/// Number of bar segments driven by the countdown.
pub const BAR_SEGMENTS: usize = 7;

/// Multiplier applied to a duration so that one segment check costs one tick.
pub const PROPORTIONAL_MULTIPLIER: i32 = 7;

/// Numerator of the rescale applied to the longest fixed-table class.
pub const LONG_RESCALE_NUM: i32 = 70;
/// Denominator of the rescale applied to the longest fixed-table class.
pub const LONG_RESCALE_DEN: i32 = 8;

/// When the engine spends a tick relative to the threshold checks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cadence {
    /// One tick before every threshold check.
    PerCheck,
    /// One tick, then all seven checks.
    PerPass,
}

/// Everything the engine needs to run one countdown.
///
/// `thresholds[i]` drives LED bit `i`; the bit is lit while the remaining
/// time is strictly greater than the threshold.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BarSchedule {
    pub initial: i32,
    pub thresholds: [i32; BAR_SEGMENTS],
    pub cadence: Cadence,
}

impl BarSchedule {
    /// A schedule that ends on its first tick.
    pub const EMPTY: BarSchedule = BarSchedule {
        initial: 0,
        thresholds: [0; BAR_SEGMENTS],
        cadence: Cadence::PerCheck,
    };

    #[must_use]
    pub const fn new(initial: i32, thresholds: [i32; BAR_SEGMENTS], cadence: Cadence) -> Self {
        Self {
            initial,
            thresholds,
            cadence,
        }
    }
}

/// Thresholds for the formula-driven bar: `initial * k / 8` for k = 7..1,
/// using integer division.
#[must_use]
pub fn proportional_schedule(duration: DurationClass) -> BarSchedule {
    let scaled = i32::from(duration.units()) * PROPORTIONAL_MULTIPLIER;
    if scaled == 0 {
        return BarSchedule::EMPTY;
    }

    let mut thresholds = [0; BAR_SEGMENTS];
    let mut k = 7;
    for slot in &mut thresholds {
        *slot = scaled * k / 8;
        k -= 1;
    }
    BarSchedule::new(scaled, thresholds, Cadence::PerCheck)
}

/// Literal tables keyed by duration class.
pub const FIXED_SCHEDULES: [BarSchedule; 8] = [
    BarSchedule::EMPTY,
    BarSchedule::new(420, [365, 315, 260, 210, 155, 105, 50], Cadence::PerPass),
    BarSchedule::new(560, [495, 425, 350, 280, 210, 140, 65], Cadence::PerPass),
    BarSchedule::new(700, [610, 525, 435, 350, 260, 175, 85], Cadence::PerPass),
    BarSchedule::new(840, [735, 630, 525, 420, 315, 210, 100], Cadence::PerPass),
    BarSchedule::new(980, [855, 735, 610, 490, 365, 245, 120], Cadence::PerPass),
    BarSchedule::new(1120, [980, 840, 700, 560, 420, 280, 135], Cadence::PerPass),
    BarSchedule::new(
        180 * LONG_RESCALE_NUM / LONG_RESCALE_DEN,
        [1380, 1180, 985, 790, 590, 395, 195],
        Cadence::PerCheck,
    ),
];

/// Looks up the literal table for a duration class.
#[must_use]
pub const fn fixed_schedule(duration: DurationClass) -> BarSchedule {
    FIXED_SCHEDULES[duration.as_index()]
}
