//! # Sensor polling
//!
//! One poll cycle visits the sensor channels in ascending order. Each node is
//! connected, asked for its latest sample with a trigger pulse and given
//! [RESPONSE_TIMEOUT] to answer. Silent channels report [FAULT] and the cycle
//! carries on. The bus is left disconnected afterwards.

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Write},
    digital::v2::OutputPin,
    serial::Read,
};

use crate::channel::{self, Channel, ChannelSelector};
use crate::convert::{decode, Readings, FAULT};
use crate::framer::{self, Clock, RESPONSE_TIMEOUT};

/// Length of the trigger pulse. The node samples the pin change interrupt
/// on its own clock, so keep this well above its interrupt latency.
pub const TRIGGER_PULSE_US: u32 = 100;

#[derive(Debug, PartialEq)]
pub enum Error<S, P> {
    Channel(channel::Error<S, P>),
    Trigger(P),
}

impl<S, P> From<channel::Error<S, P>> for Error<S, P> {
    fn from(e: channel::Error<S, P>) -> Self {
        Self::Channel(e)
    }
}

/// Source of complete reading sets.
pub trait Acquire {
    type Error;

    fn acquire(&mut self) -> Result<Readings, Self::Error>;
}

/// Controller side of the sensor bus.
pub struct Poller<SPI, LATCH, INH, TRIG, LINK, CLK, D> {
    selector: ChannelSelector<SPI, LATCH, INH>,
    trigger: TRIG,
    link: LINK,
    clock: CLK,
    delay: D,
}

impl<SPI, LATCH, INH, TRIG, LINK, CLK, D, P> Poller<SPI, LATCH, INH, TRIG, LINK, CLK, D>
where
    SPI: Write<u8>,
    LATCH: OutputPin<Error = P>,
    INH: OutputPin<Error = P>,
    TRIG: OutputPin<Error = P>,
    LINK: Read<u8>,
    CLK: Clock,
    D: DelayUs<u32>,
{
    /// Construct a poller. The trigger line is driven to its idle high level.
    ///
    /// # Args
    /// * `selector` - Channel multiplexer
    /// * `trigger` - Shared trigger line
    /// * `link` - Node response receiver (9600 baud)
    /// * `clock` - Monotonic clock for the response deadline
    /// * `delay` - Trigger pulse timing
    pub fn new(
        selector: ChannelSelector<SPI, LATCH, INH>,
        mut trigger: TRIG,
        link: LINK,
        clock: CLK,
        delay: D,
    ) -> Result<Self, Error<SPI::Error, P>> {
        trigger.set_high().map_err(Error::Trigger)?;
        Ok(Self {
            selector,
            trigger,
            link,
            clock,
            delay,
        })
    }

    /// Read all sensor channels once.
    pub fn poll_all(&mut self) -> Result<Readings, Error<SPI::Error, P>> {
        let mut readings = [FAULT; Channel::SENSORS.len()];
        for (reading, ch) in readings.iter_mut().zip(Channel::SENSORS) {
            *reading = self.poll(ch)?;
        }
        self.selector.select(Channel::None)?;

        let readings = Readings(readings);
        log::debug!("Poll cycle done, {} faults", readings.faults());
        Ok(readings)
    }

    fn poll(&mut self, ch: Channel) -> Result<f32, Error<SPI::Error, P>> {
        self.selector.select(ch)?;

        let stale = framer::flush(&mut self.link);
        if stale > 0 {
            log::debug!("{:?}: dropped {} stale bytes", ch, stale);
        }

        self.trigger.set_low().map_err(Error::Trigger)?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_high().map_err(Error::Trigger)?;

        Ok(
            match framer::receive(&mut self.link, &mut self.clock, RESPONSE_TIMEOUT) {
                Ok(sample) => decode(sample),
                Err(framer::Error::Timeout { received }) => {
                    log::warn!("{:?}: response timeout after {}/4 bytes", ch, received);
                    FAULT
                }
            },
        )
    }

    pub fn selected(&self) -> Channel {
        self.selector.selected()
    }
}

impl<SPI, LATCH, INH, TRIG, LINK, CLK, D, P> Acquire
    for Poller<SPI, LATCH, INH, TRIG, LINK, CLK, D>
where
    SPI: Write<u8>,
    LATCH: OutputPin<Error = P>,
    INH: OutputPin<Error = P>,
    TRIG: OutputPin<Error = P>,
    LINK: Read<u8>,
    CLK: Clock,
    D: DelayUs<u32>,
{
    type Error = Error<SPI::Error, P>;

    fn acquire(&mut self) -> Result<Readings, Self::Error> {
        self.poll_all()
    }
}
