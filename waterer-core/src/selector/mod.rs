//! Knob quantization shared by firmware and host targets.
//!
//! A 10-bit potentiometer sample is compared against eight ascending
//! thresholds. Every comparison is evaluated, in order, and the last one the
//! sample exceeds decides both the duration class and the one-hot LED shown
//! on the bar. Lower tiers light higher LED bits: the first tier lights bit 7
//! and the top tier lights bit 0.

use core::{convert::TryFrom, fmt};

/// Largest value a 10-bit converter can produce.
pub const SAMPLE_MAX: u16 = 0x3FF;

/// Number of LED segments on the bar.
pub const LED_COUNT: u8 = 8;

/// A single 10-bit knob reading.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct SampleReading(u16);

/// Error returned when a raw conversion does not fit in 10 bits.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleError {
    OutOfRange(u16),
}

impl fmt::Display for SampleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::OutOfRange(raw) => {
                write!(f, "sample {raw} exceeds the 10-bit range (max {SAMPLE_MAX})")
            }
        }
    }
}

impl SampleReading {
    /// Wraps a raw reading, rejecting anything above [`SAMPLE_MAX`].
    pub const fn new(raw: u16) -> Result<Self, SampleError> {
        if raw > SAMPLE_MAX {
            Err(SampleError::OutOfRange(raw))
        } else {
            Ok(Self(raw))
        }
    }

    /// Wraps a raw reading, clamping it into the 10-bit range.
    #[must_use]
    pub const fn saturating(raw: u16) -> Self {
        if raw > SAMPLE_MAX {
            Self(SAMPLE_MAX)
        } else {
            Self(raw)
        }
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for SampleReading {
    type Error = SampleError;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

/// One of the eight selectable watering lengths.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum DurationClass {
    Off,
    Min60,
    Min80,
    Min100,
    Min120,
    Min140,
    Min160,
    Min180,
}

/// Error returned when a number does not name a duration class.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct InvalidDuration(pub u16);

impl fmt::Display for InvalidDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is not a duration class (expected 0, 60, 80, ..., 180)",
            self.0
        )
    }
}

impl DurationClass {
    /// Every class in ascending order.
    pub const ALL: [DurationClass; 8] = [
        DurationClass::Off,
        DurationClass::Min60,
        DurationClass::Min80,
        DurationClass::Min100,
        DurationClass::Min120,
        DurationClass::Min140,
        DurationClass::Min160,
        DurationClass::Min180,
    ];

    /// Length of the class in abstract time units.
    #[must_use]
    pub const fn units(self) -> u16 {
        match self {
            DurationClass::Off => 0,
            DurationClass::Min60 => 60,
            DurationClass::Min80 => 80,
            DurationClass::Min100 => 100,
            DurationClass::Min120 => 120,
            DurationClass::Min140 => 140,
            DurationClass::Min160 => 160,
            DurationClass::Min180 => 180,
        }
    }

    /// Position of the class in [`DurationClass::ALL`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            DurationClass::Off => 0,
            DurationClass::Min60 => 1,
            DurationClass::Min80 => 2,
            DurationClass::Min100 => 3,
            DurationClass::Min120 => 4,
            DurationClass::Min140 => 5,
            DurationClass::Min160 => 6,
            DurationClass::Min180 => 7,
        }
    }
}

impl TryFrom<u16> for DurationClass {
    type Error = InvalidDuration;

    fn try_from(units: u16) -> Result<Self, Self::Error> {
        DurationClass::ALL
            .iter()
            .copied()
            .find(|class| class.units() == units)
            .ok_or(InvalidDuration(units))
    }
}

impl fmt::Display for DurationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.units())
    }
}

/// Eight-bit mask shifted out to the LED bar.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct LedPattern(u8);

impl LedPattern {
    pub const EMPTY: LedPattern = LedPattern(0);

    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Pattern with exactly `bit` lit. Bits past the bar wrap into range.
    #[must_use]
    pub const fn one_hot(bit: u8) -> Self {
        Self(1 << (bit % LED_COUNT))
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn with_bit(self, bit: u8) -> Self {
        Self(self.0 | (1 << (bit % LED_COUNT)))
    }

    #[must_use]
    pub const fn without_bit(self, bit: u8) -> Self {
        Self(self.0 & !(1 << (bit % LED_COUNT)))
    }

    #[must_use]
    pub const fn is_set(self, bit: u8) -> bool {
        self.0 & (1 << (bit % LED_COUNT)) != 0
    }

    #[must_use]
    pub const fn is_one_hot(self) -> bool {
        self.0.count_ones() == 1
    }
}

impl fmt::Display for LedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08b}", self.0)
    }
}

/// A knob tier: the sample must exceed `floor` to select `duration`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Tier {
    pub floor: u16,
    pub duration: DurationClass,
    pub led_bit: u8,
}

impl Tier {
    const fn new(floor: u16, duration: DurationClass, led_bit: u8) -> Self {
        Self {
            floor,
            duration,
            led_bit,
        }
    }

    #[must_use]
    pub const fn pattern(&self) -> LedPattern {
        LedPattern::one_hot(self.led_bit)
    }
}

/// Knob tiers in ascending threshold order.
pub const TIERS: [Tier; 8] = [
    Tier::new(0x000, DurationClass::Off, 7),
    Tier::new(0x07F, DurationClass::Min60, 6),
    Tier::new(0x0FF, DurationClass::Min80, 5),
    Tier::new(0x17F, DurationClass::Min100, 4),
    Tier::new(0x1FF, DurationClass::Min120, 3),
    Tier::new(0x27F, DurationClass::Min140, 2),
    Tier::new(0x2FF, DurationClass::Min160, 1),
    Tier::new(0x37F, DurationClass::Min180, 0),
];

/// Outcome of classifying one knob sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    pub sample: SampleReading,
    pub duration: DurationClass,
    pub pattern: LedPattern,
}

/// Classifies a sample, reporting the pattern of every tier it crosses in
/// ascending order. The last pattern reported is the one returned.
///
/// A sample of exactly zero crosses no tier and lands on the lowest one.
pub fn select_with<F>(sample: SampleReading, mut on_crossed: F) -> Selection
where
    F: FnMut(LedPattern),
{
    let lowest = &TIERS[0];
    let mut selection = Selection {
        sample,
        duration: lowest.duration,
        pattern: lowest.pattern(),
    };

    for tier in &TIERS {
        if sample.raw() > tier.floor {
            selection.duration = tier.duration;
            selection.pattern = tier.pattern();
            on_crossed(selection.pattern);
        }
    }

    selection
}

/// Classifies a sample without reporting intermediate tiers.
#[must_use]
pub fn select(sample: SampleReading) -> Selection {
    select_with(sample, |_| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(raw: u16) -> SampleReading {
        SampleReading::new(raw).expect("sample in range")
    }

    #[test]
    fn highest_exceeded_threshold_wins() {
        assert_eq!(select(sample(0x180)).duration, DurationClass::Min100);
        assert_eq!(select(sample(0x200)).duration, DurationClass::Min120);
        assert_eq!(select(sample(0x050)).duration, DurationClass::Off);
        assert_eq!(select(sample(0x3FF)).duration, DurationClass::Min180);
    }

    #[test]
    fn thresholds_are_strictly_greater_than() {
        assert_eq!(select(sample(0x07F)).duration, DurationClass::Off);
        assert_eq!(select(sample(0x080)).duration, DurationClass::Min60);
        assert_eq!(select(sample(0x37F)).duration, DurationClass::Min160);
        assert_eq!(select(sample(0x380)).duration, DurationClass::Min180);
    }

    #[test]
    fn zero_sample_lands_on_lowest_tier() {
        let selection = select(sample(0));
        assert_eq!(selection.duration, DurationClass::Off);
        assert_eq!(selection.pattern, LedPattern::one_hot(7));
    }

    #[test]
    fn every_sample_yields_a_single_lit_segment() {
        for raw in 0..=SAMPLE_MAX {
            let selection = select(sample(raw));
            assert!(selection.pattern.is_one_hot(), "raw={raw}");
            let expected = TIERS
                .iter()
                .rev()
                .find(|tier| raw > tier.floor)
                .unwrap_or(&TIERS[0]);
            assert_eq!(selection.duration, expected.duration, "raw={raw}");
        }
    }

    #[test]
    fn crossed_tiers_are_reported_in_order() {
        let mut seen = heapless::Vec::<LedPattern, 8>::new();
        let selection = select_with(sample(0x200), |pattern| {
            seen.push(pattern).expect("at most eight tiers");
        });

        assert_eq!(selection.duration, DurationClass::Min120);
        let bits: heapless::Vec<u8, 8> = seen.iter().map(|p| p.bits()).collect();
        assert_eq!(
            bits.as_slice(),
            &[1 << 7, 1 << 6, 1 << 5, 1 << 4, 1 << 3]
        );
        assert_eq!(seen.last().copied(), Some(selection.pattern));
    }

    #[test]
    fn sample_constructor_rejects_eleven_bit_values() {
        assert_eq!(SampleReading::new(1024), Err(SampleError::OutOfRange(1024)));
        assert_eq!(SampleReading::saturating(4095).raw(), SAMPLE_MAX);
    }

    #[test]
    fn duration_classes_round_trip_through_units() {
        for class in DurationClass::ALL {
            assert_eq!(DurationClass::try_from(class.units()), Ok(class));
        }
        assert_eq!(DurationClass::try_from(90), Err(InvalidDuration(90)));
    }
}
