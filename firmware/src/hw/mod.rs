//! Board adapters that implement the `waterer-core` hardware traits.
//!
//! Pin map (STM32G0):
//!
//! | Signal | Pin | Direction |
//! |--------|-----|-----------|
//! | POT    | PA1 | analog in |
//! | RLY    | PA2 | out, high = valve open |
//! | DATA   | PA3 | out |
//! | CLOCK  | PA4 | out |
//! | LATCH  | PA5 | out |
//! | STOP   | PA6 | in, pull-down, high = pressed |
//! | START  | PA7 | in, pull-down, high = pressed |
//!
//! Pin errors cannot be surfaced through the controller traits, so the
//! adapters log them and carry on.

use embedded_hal::digital::{InputPin, OutputPin};
use waterer_core::hardware::{ButtonInput, OutputAdapter};
use waterer_core::selector::LedPattern;

pub mod shift_register;

#[cfg(target_os = "none")]
pub mod analog;
#[cfg(target_os = "none")]
pub mod ticks;

use shift_register::ShiftRegister;

/// Push button wired between the pin and VCC with a pull-down.
pub struct ActiveHighButton<P> {
    pin: P,
    label: &'static str,
}

impl<P: InputPin> ActiveHighButton<P> {
    pub const fn new(pin: P, label: &'static str) -> Self {
        Self { pin, label }
    }
}

impl<P: InputPin> ButtonInput for ActiveHighButton<P> {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_high().unwrap_or_else(|_| {
            log_pin_error(self.label);
            false
        })
    }
}

/// Relay coil driver; high energises the relay and opens the valve.
pub struct RelayValve<P> {
    pin: P,
}

impl<P: OutputPin> RelayValve<P> {
    pub const fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn set(&mut self, open: bool) {
        let result = if open {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            log_pin_error("relay");
        }
    }
}

/// LED bar plus valve relay.
pub struct BoardOutputs<D, C, L, R> {
    bar: ShiftRegister<D, C, L>,
    relay: RelayValve<R>,
}

impl<D, C, L, R> BoardOutputs<D, C, L, R>
where
    D: OutputPin,
    C: OutputPin,
    L: OutputPin,
    R: OutputPin,
{
    pub const fn new(bar: ShiftRegister<D, C, L>, relay: RelayValve<R>) -> Self {
        Self { bar, relay }
    }
}

impl<D, C, L, R> OutputAdapter for BoardOutputs<D, C, L, R>
where
    D: OutputPin,
    C: OutputPin,
    L: OutputPin,
    R: OutputPin,
{
    fn set_leds(&mut self, pattern: LedPattern) {
        if self.bar.write(pattern.bits()).is_err() {
            log_pin_error("led-bar");
        }
    }

    fn set_valve(&mut self, open: bool) {
        self.relay.set(open);
    }
}

#[cfg(target_os = "none")]
fn log_pin_error(line: &'static str) {
    defmt::warn!("hw: {} pin error", line);
}

#[cfg(not(target_os = "none"))]
fn log_pin_error(line: &'static str) {
    println!("hw: {line} pin error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    struct Level(bool);

    impl ErrorType for Level {
        type Error = Infallible;
    }

    impl InputPin for Level {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0)
        }
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct BrokenPin;

    impl embedded_hal::digital::Error for BrokenPin {
        fn kind(&self) -> embedded_hal::digital::ErrorKind {
            embedded_hal::digital::ErrorKind::Other
        }
    }

    impl ErrorType for BrokenPin {
        type Error = BrokenPin;
    }

    impl InputPin for BrokenPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Err(BrokenPin)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Err(BrokenPin)
        }
    }

    #[derive(Default)]
    struct Latched(bool);

    impl ErrorType for Latched {
        type Error = Infallible;
    }

    impl OutputPin for Latched {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0 = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0 = true;
            Ok(())
        }
    }

    #[test]
    fn buttons_read_active_high() {
        assert!(ActiveHighButton::new(Level(true), "start").is_pressed());
        assert!(!ActiveHighButton::new(Level(false), "stop").is_pressed());
    }

    #[test]
    fn unreadable_button_counts_as_released() {
        assert!(!ActiveHighButton::new(BrokenPin, "start").is_pressed());
    }

    #[test]
    fn relay_follows_valve_level() {
        let mut outputs = BoardOutputs::new(
            ShiftRegister::new(Latched::default(), Latched::default(), Latched::default()),
            RelayValve::new(Latched::default()),
        );

        outputs.set_valve(true);
        assert!(outputs.relay.pin.0);
        outputs.set_valve(false);
        assert!(!outputs.relay.pin.0);
    }
}
