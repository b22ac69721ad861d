//! Bit-banged 74HC595 driver for the eight-LED bar.
//!
//! Bits are shifted least-significant first, so the byte `0x01` lights the
//! segment wired to the register's last output. The latch is held low while
//! shifting and pulsed high once all eight bits are clocked in, so the bar
//! never shows a half-shifted pattern.

use embedded_hal::digital::OutputPin;

/// Error from whichever shift-register line failed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShiftError<D, C, L> {
    Data(D),
    Clock(C),
    Latch(L),
}

pub struct ShiftRegister<D, C, L> {
    data: D,
    clock: C,
    latch: L,
}

impl<D, C, L> ShiftRegister<D, C, L>
where
    D: OutputPin,
    C: OutputPin,
    L: OutputPin,
{
    pub const fn new(data: D, clock: C, latch: L) -> Self {
        Self { data, clock, latch }
    }

    /// Shifts `byte` out and latches it onto the outputs.
    pub fn write(&mut self, byte: u8) -> Result<(), ShiftError<D::Error, C::Error, L::Error>> {
        self.latch.set_low().map_err(ShiftError::Latch)?;

        for bit in 0..8 {
            if byte & (1 << bit) == 0 {
                self.data.set_low().map_err(ShiftError::Data)?;
            } else {
                self.data.set_high().map_err(ShiftError::Data)?;
            }
            self.clock.set_high().map_err(ShiftError::Clock)?;
            self.clock.set_low().map_err(ShiftError::Clock)?;
        }

        self.latch.set_high().map_err(ShiftError::Latch)?;
        self.latch.set_low().map_err(ShiftError::Latch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    enum Line {
        Data,
        Clock,
        Latch,
    }

    type Trace = Rc<RefCell<Vec<(Line, bool)>>>;

    struct Pin {
        line: Line,
        trace: Trace,
    }

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.trace.borrow_mut().push((self.line, false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.trace.borrow_mut().push((self.line, true));
            Ok(())
        }
    }

    fn register(trace: &Trace) -> ShiftRegister<Pin, Pin, Pin> {
        let pin = |line| Pin {
            line,
            trace: trace.clone(),
        };
        ShiftRegister::new(pin(Line::Data), pin(Line::Clock), pin(Line::Latch))
    }

    /// Data level sampled on every rising clock edge.
    fn clocked_bits(trace: &[(Line, bool)]) -> Vec<bool> {
        let mut data = false;
        let mut bits = Vec::new();
        for &(line, level) in trace {
            match line {
                Line::Data => data = level,
                Line::Clock if level => bits.push(data),
                _ => {}
            }
        }
        bits
    }

    #[test]
    fn shifts_lsb_first() {
        let trace = Trace::default();
        register(&trace).write(0b1000_0011).unwrap();

        let bits = clocked_bits(&trace.borrow());
        assert_eq!(
            bits,
            [true, true, false, false, false, false, false, true]
        );
    }

    #[test]
    fn latch_wraps_the_clocked_bits() {
        let trace = Trace::default();
        register(&trace).write(0x5A).unwrap();

        let trace = trace.borrow();
        assert_eq!(trace.first(), Some(&(Line::Latch, false)));
        let tail: Vec<_> = trace.iter().rev().take(2).copied().collect();
        assert_eq!(tail, [(Line::Latch, false), (Line::Latch, true)]);
        let pulses = trace
            .iter()
            .filter(|&&entry| entry == (Line::Clock, true))
            .count();
        assert_eq!(pulses, 8);
    }
}
