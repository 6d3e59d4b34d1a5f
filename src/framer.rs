//! # Node response reception
//!
//! A triggered node answers with its latest sample as four 8N1 frames on the
//! shared serial line. The controller reassembles them in arrival order and
//! gives up once the response deadline has passed. There is no checksum: any
//! four bytes received in time are accepted.

use embedded_hal::serial::Read;

use crate::convert::RawSample;
use crate::{Duration, Instant};

/// Deadline for all four response bytes, counted from the end of the trigger pulse.
///
/// [receive] waits one monotonic tick longer, so the full timeout elapses even
/// when the start is read just before a tick.
pub const RESPONSE_TIMEOUT: Duration = Duration::millis(10);

/// Monotonic time source for busy-wait deadlines.
pub trait Clock {
    fn now(&mut self) -> Instant;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The deadline passed with only `received` bytes in.
    Timeout { received: usize },
}

/// Drop everything already buffered on the link.
///
/// Returns the number of discarded bytes.
pub fn flush<L: Read<u8>>(link: &mut L) -> usize {
    let mut dropped = 0;
    loop {
        match link.read() {
            Ok(_) => dropped += 1,
            Err(nb::Error::WouldBlock) => return dropped,
            // A receive error consumes the faulty frame.
            Err(nb::Error::Other(_)) => {}
        }
    }
}

/// Busy-wait for one four byte response.
///
/// # Args
/// * `link` - Node response byte queue
/// * `clock` - Deadline time source
/// * `timeout` - Response deadline relative to the call
pub fn receive<L, C>(link: &mut L, clock: &mut C, timeout: Duration) -> Result<RawSample, Error>
where
    L: Read<u8>,
    C: Clock,
{
    let deadline = clock.now() + timeout + Duration::from_ticks(1);
    let mut bytes = [0u8; 4];
    let mut received = 0;
    while received < bytes.len() {
        match link.read() {
            Ok(byte) => {
                bytes[received] = byte;
                received += 1;
            }
            Err(nb::Error::WouldBlock) => {
                if clock.now() >= deadline {
                    return Err(Error::Timeout { received });
                }
            }
            Err(nb::Error::Other(_)) => {}
        }
    }
    Ok(RawSample(bytes))
}
