//! # Node ADC readout
//!
//! The ADC output register is shifted in by software, MSB first. The data line
//! already holds the first bit when chip select goes low, every clock pulse
//! advances to the next one.

use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::convert::RawSample;

pub struct Sampler<CS, SCLK, MISO> {
    cs: CS,
    sclk: SCLK,
    miso: MISO,
}

impl<CS, SCLK, MISO, P> Sampler<CS, SCLK, MISO>
where
    CS: OutputPin<Error = P>,
    SCLK: OutputPin<Error = P>,
    MISO: InputPin<Error = P>,
{
    /// Construct the sampler with chip select deasserted and the clock idling low.
    pub fn new(mut cs: CS, mut sclk: SCLK, miso: MISO) -> Result<Self, P> {
        cs.set_high()?;
        sclk.set_low()?;
        Ok(Self { cs, sclk, miso })
    }

    /// Read the 32 bit ADC output word.
    pub fn acquire(&mut self) -> Result<RawSample, P> {
        let mut bytes = [0u8; 4];
        self.cs.set_low()?;
        for byte in bytes.iter_mut() {
            for bit in (0..8).rev() {
                if self.miso.is_high()? {
                    *byte |= 1 << bit;
                }
                self.sclk.set_high()?;
                self.sclk.set_low()?;
            }
        }
        self.cs.set_high()?;
        Ok(RawSample(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Bus, Level};

    #[test]
    fn word_shifts_in_msb_first() {
        let bus = Bus::default();
        bus.adc_word(0x2DEA_DBE0);
        let mut sampler = Sampler::new(bus.pin("cs"), bus.pin("sclk"), bus.pin("miso")).unwrap();
        assert_eq!(bus.level("cs"), Some(Level::High));
        bus.clear();

        let sample = sampler.acquire().unwrap();
        assert_eq!(sample, RawSample([0x2D, 0xEA, 0xDB, 0xE0]));

        let events = bus.events();
        assert_eq!(events.first().map(String::as_str), Some("cs Low"));
        assert_eq!(events.last().map(String::as_str), Some("cs High"));
        assert_eq!(events.iter().filter(|e| *e == "sclk High").count(), 32);
        assert_eq!(bus.level("sclk"), Some(Level::Low));
    }

    #[test]
    fn every_acquisition_restarts_the_word() {
        let bus = Bus::default();
        let mut sampler = Sampler::new(bus.pin("cs"), bus.pin("sclk"), bus.pin("miso")).unwrap();
        bus.adc_word(0xFFFF_FFFF);
        assert_eq!(sampler.acquire().unwrap(), RawSample([0xFF; 4]));
        bus.adc_word(0x0000_0001);
        assert_eq!(sampler.acquire().unwrap(), RawSample([0, 0, 0, 1]));
    }
}
