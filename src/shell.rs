//! # Host command interface
//!
//! Single byte commands, no acknowledgement and no queueing: one byte is
//! consumed per call to [Shell::process]. Unknown bytes are dropped silently.

use core::fmt::Write;

use embedded_hal::serial::Read;
use num_enum::TryFromPrimitive;

use crate::poll::Acquire;

/// Host link rate.
pub const HOST_BAUD: u32 = 115_200;

/// Reply to [Command::Identify].
pub const IDENTIFICATION: &str = "Magnetometer Controller";

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    /// `R`: poll all channels and reply with one line of readings.
    Read = 0x52,
    /// `I`: reply with [IDENTIFICATION].
    Identify = 0x49,
}

#[derive(Debug, PartialEq)]
pub enum Error<E> {
    Acquire(E),
    Write(core::fmt::Error),
}

pub struct Shell<HOST, A> {
    host: HOST,
    acquire: A,
}

impl<HOST, A> Shell<HOST, A>
where
    HOST: Read<u8> + Write,
    A: Acquire,
{
    pub fn new(host: HOST, acquire: A) -> Self {
        Self { host, acquire }
    }

    /// Handle at most one byte from the host.
    ///
    /// # Returns
    /// The command executed, if any.
    pub fn process(&mut self) -> Result<Option<Command>, Error<A::Error>> {
        let Ok(byte) = self.host.read() else {
            return Ok(None);
        };
        let Ok(command) = Command::try_from(byte) else {
            log::trace!("Ignoring {:#04x}", byte);
            return Ok(None);
        };

        match command {
            Command::Read => {
                let readings = self.acquire.acquire().map_err(Error::Acquire)?;
                writeln!(self.host, "{}", readings).map_err(Error::Write)?;
            }
            Command::Identify => {
                writeln!(self.host, "{}", IDENTIFICATION).map_err(Error::Write)?;
            }
        }
        Ok(Some(command))
    }

    pub fn host(&mut self) -> &mut HOST {
        &mut self.host
    }
}
