//! # ADC code to field conversion
//!
//! Each node relays the 32 bit output word of its bipolar sigma-delta ADC
//! unchanged. The word carries a polarity flag, a 24 bit magnitude and five
//! status bits. The decode is a two segment linear map onto the
//! [-250, 250) µT range of the sensor, not a two's complement conversion.

use arbitrary_int::{u24, u5};
use bitbybit::bitfield;
use core::fmt;
use core::str::FromStr;

/// Number of sensor channels on the bus.
pub const CHANNELS: usize = 12;

/// Reading reported for a channel that did not answer in time.
pub const FAULT: f32 = 999.0;

/// Full scale of the sensor in µT.
pub const FULL_SCALE: f32 = 250.0;

/// Exclusive upper bound of the 24 bit magnitude.
const MAX_CODE: f32 = (1u32 << 24) as _;

/// Field layout of the ADC output word.
#[bitfield(u32)]
pub struct AdcWord {
    /// Selects the positive segment of the decode.
    #[bit(29, r)]
    pub positive: bool,

    #[bits(5..=28, r)]
    pub code: u24,

    /// Converter status, not part of the measurement.
    #[bits(0..=4, r)]
    pub status: u5,
}

/// Four raw bytes as shifted out of the ADC, most significant byte first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RawSample(pub [u8; 4]);

impl From<u32> for RawSample {
    fn from(word: u32) -> Self {
        Self(word.to_be_bytes())
    }
}

impl From<RawSample> for u32 {
    fn from(sample: RawSample) -> u32 {
        u32::from_be_bytes(sample.0)
    }
}

impl From<RawSample> for AdcWord {
    fn from(sample: RawSample) -> Self {
        AdcWord::new_with_raw_value(sample.into())
    }
}

impl AdcWord {
    /// Field in µT.
    pub fn field(&self) -> f32 {
        // Form the ratio first: `250 * code` rounds up to full scale in f32.
        let ratio = self.code().value() as f32 / MAX_CODE;
        if self.positive() {
            FULL_SCALE * ratio
        } else {
            FULL_SCALE * (ratio - 1.0)
        }
    }
}

/// Convert a raw ADC sample to the field in µT.
pub fn decode(sample: RawSample) -> f32 {
    AdcWord::from(sample).field()
}

/// One reading per channel, index 0 holding channel 1.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Readings(pub [f32; CHANNELS]);

impl Default for Readings {
    fn default() -> Self {
        Self([FAULT; CHANNELS])
    }
}

impl Readings {
    pub fn is_fault(reading: f32) -> bool {
        reading == FAULT
    }

    pub fn faults(&self) -> usize {
        self.0.iter().filter(|r| Self::is_fault(**r)).count()
    }
}

impl fmt::Display for Readings {
    /// Reply line of the `R` command: tab separated, eight fractional digits.
    /// The terminating newline is not part of the line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reading) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{:.8}", reading)?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
pub enum ParseError {
    /// The line did not hold exactly one value per channel.
    Count(usize),
    Float(core::num::ParseFloatError),
}

impl FromStr for Readings {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut readings = [FAULT; CHANNELS];
        let mut count = 0;
        for field in line.split_whitespace() {
            if count < CHANNELS {
                readings[count] = field.parse().map_err(ParseError::Float)?;
            }
            count += 1;
        }
        if count != CHANNELS {
            return Err(ParseError::Count(count));
        }
        Ok(Self(readings))
    }
}
