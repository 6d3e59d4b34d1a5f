//! # Bit-banged UART transmitter
//!
//! The node has no free UART, so its response is clocked out by software:
//! 8N1 frames at [NODE_BAUD], line idle high.

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{OutputPin, PinState},
};

/// Rate the controller's receiver is configured for.
pub const NODE_BAUD: u32 = 9_600;

/// One bit period, rounded down from 104.17 µs.
pub const BIT_PERIOD_US: u32 = 1_000_000 / NODE_BAUD;

/// Line levels of one 8N1 frame, `true` for high.
///
/// Start bit, data bits LSB first, stop bit.
#[derive(Clone, Debug)]
pub struct Frame {
    byte: u8,
    position: u8,
}

impl Frame {
    pub const BITS: usize = 10;

    pub fn new(byte: u8) -> Self {
        Self { byte, position: 0 }
    }
}

impl Iterator for Frame {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let level = match self.position {
            0 => false,
            n @ 1..=8 => self.byte >> (n - 1) & 1 == 1,
            9 => true,
            _ => return None,
        };
        self.position += 1;
        Some(level)
    }
}

pub struct SoftTx<TX, D> {
    tx: TX,
    delay: D,
}

impl<TX, D> SoftTx<TX, D>
where
    TX: OutputPin,
    D: DelayUs<u32>,
{
    /// Construct the transmitter and idle the line.
    pub fn new(mut tx: TX, delay: D) -> Result<Self, TX::Error> {
        tx.set_high()?;
        Ok(Self { tx, delay })
    }

    /// Send one frame. The line is left high at the end of the stop bit.
    pub fn write(&mut self, byte: u8) -> Result<(), TX::Error> {
        for level in Frame::new(byte) {
            self.tx.set_state(PinState::from(level))?;
            self.delay.delay_us(BIT_PERIOD_US);
        }
        Ok(())
    }

    /// Send frames back to back, without gaps beyond the stop bits.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<(), TX::Error> {
        bytes.iter().try_for_each(|byte| self.write(*byte))
    }
}
