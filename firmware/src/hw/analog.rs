//! Potentiometer sampling on ADC1.

use embassy_stm32::adc::{Adc, AnyAdcChannel, Resolution, SampleTime};
use embassy_stm32::peripherals::ADC1;
use waterer_core::hardware::Sampler;
use waterer_core::selector::SampleReading;

/// Blocking one-shot reads of the duration knob at 10-bit resolution.
pub struct PotSampler<'d> {
    adc: Adc<'d, ADC1>,
    channel: AnyAdcChannel<ADC1>,
}

impl<'d> PotSampler<'d> {
    pub fn new(mut adc: Adc<'d, ADC1>, channel: AnyAdcChannel<ADC1>) -> Self {
        adc.set_resolution(Resolution::BITS10);
        adc.set_sample_time(SampleTime::CYCLES160_5);
        Self { adc, channel }
    }
}

impl Sampler for PotSampler<'_> {
    fn read_analog(&mut self) -> SampleReading {
        SampleReading::saturating(self.adc.blocking_read(&mut self.channel))
    }
}
