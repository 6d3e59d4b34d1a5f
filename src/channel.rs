//! # Sensor channel multiplexer
//!
//! Twelve sensor nodes share the trigger and serial lines. A 74HC595 shift
//! register drives the address inputs of the analog switches, and the inhibit
//! line of the first switch gates the bank holding channels 1 to 4. At most one
//! node is connected at a time.

use embedded_hal::{blocking::spi::Write, digital::v2::OutputPin, spi};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Shift register clock. The 74HC595 is good for far more, the long bus is not.
pub const SPI_FREQUENCY_HZ: u32 = 1_000_000;

/// Shift register mode: clock idles low, data captured on the rising edge, MSB first.
pub const SPI_MODE: spi::Mode = spi::MODE_0;

/// Shift register code per channel, indexed by channel id.
///
/// Channels 0 and 4 share a code and are told apart by the bank inhibit line.
pub const SELECT_CODES: [u8; 13] = [
    0b1111_1111, // disconnected
    0b1111_1100,
    0b1111_1101,
    0b1111_1110,
    0b1111_1111,
    0b0111_0011,
    0b0111_0111,
    0b0111_1011,
    0b0111_1111,
    0b1000_1111,
    0b1001_1111,
    0b1010_1111,
    0b1011_1111,
];

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, strum::EnumIter,
)]
#[repr(u8)]
pub enum Channel {
    None = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
    Ch5 = 5,
    Ch6 = 6,
    Ch7 = 7,
    Ch8 = 8,
    Ch9 = 9,
    Ch10 = 10,
    Ch11 = 11,
    Ch12 = 12,
}

impl Channel {
    /// Sensor channels in polling order.
    pub const SENSORS: [Self; 12] = [
        Self::Ch1,
        Self::Ch2,
        Self::Ch3,
        Self::Ch4,
        Self::Ch5,
        Self::Ch6,
        Self::Ch7,
        Self::Ch8,
        Self::Ch9,
        Self::Ch10,
        Self::Ch11,
        Self::Ch12,
    ];

    pub fn code(&self) -> u8 {
        SELECT_CODES[*self as usize]
    }

    /// Whether the channel sits in the bank gated by the inhibit line.
    pub fn inhibited_bank(&self) -> bool {
        (1..=4).contains(&(*self as u8))
    }
}

#[derive(Debug, PartialEq)]
pub enum Error<S, P> {
    Spi(S),
    Pin(P),
}

/// Owns the multiplexer control lines and the bus state they imply.
pub struct ChannelSelector<SPI, LATCH, INH> {
    spi: SPI,
    latch: LATCH,
    inhibit: INH,
    selected: Channel,
}

impl<SPI, LATCH, INH, P> ChannelSelector<SPI, LATCH, INH>
where
    SPI: Write<u8>,
    LATCH: OutputPin<Error = P>,
    INH: OutputPin<Error = P>,
{
    /// Construct the selector and disconnect all channels.
    ///
    /// # Args
    /// * `spi` - Shift register bus, see [SPI_MODE] and [SPI_FREQUENCY_HZ]
    /// * `latch` - Shift register storage clock (RCLK)
    /// * `inhibit` - INH input of the bank 1 analog switch
    pub fn new(spi: SPI, mut latch: LATCH, inhibit: INH) -> Result<Self, Error<SPI::Error, P>> {
        latch.set_low().map_err(Error::Pin)?;
        let mut selector = Self {
            spi,
            latch,
            inhibit,
            selected: Channel::None,
        };
        selector.select(Channel::None)?;
        Ok(selector)
    }

    /// Connect a channel to the shared bus, disconnecting any other.
    pub fn select(&mut self, channel: Channel) -> Result<(), Error<SPI::Error, P>> {
        self.spi.write(&[channel.code()]).map_err(Error::Spi)?;
        self.latch.set_high().map_err(Error::Pin)?;
        self.latch.set_low().map_err(Error::Pin)?;
        if channel.inhibited_bank() {
            self.inhibit.set_low().map_err(Error::Pin)?;
        } else {
            self.inhibit.set_high().map_err(Error::Pin)?;
        }
        self.selected = channel;
        Ok(())
    }

    pub fn selected(&self) -> Channel {
        self.selected
    }
}
