//! # Sensor node
//!
//! The node samples its ADC every [SAMPLE_TICKS] timer ticks and answers a
//! falling edge on the trigger line with the latest sample. Both interrupts
//! only touch the [Rendezvous]; the ADC readout and the transmission run from
//! the main loop in [Node::service].
//!
//! With the `interrupt-free-io` feature the readout and the transmission run
//! with interrupts masked, so the tick interrupt cannot stretch a bit period.
//! Ticks that fall into a masked section are coalesced into one pending
//! interrupt and the sampling period slips by up to one transmission time.

pub mod sampler;
pub mod uart;

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

use embedded_hal::{
    blocking::delay::DelayUs,
    digital::v2::{InputPin, OutputPin},
};

use crate::convert::RawSample;
use sampler::Sampler;
use uart::SoftTx;

/// Sampling timer period.
pub const TICK_PERIOD_US: u32 = 100;

/// Ticks between ADC readouts (250 ms).
pub const SAMPLE_TICKS: u16 = (250_000 / TICK_PERIOD_US) as u16;

/// State shared between the node interrupts and its main loop.
///
/// Interrupts only count ticks and raise the request. The main loop resets
/// the tick count, clears the request and is the only writer of the sample.
pub struct Rendezvous {
    ticks: AtomicU16,
    request: AtomicBool,
    sample: AtomicU32,
}

impl Default for Rendezvous {
    fn default() -> Self {
        Self::new()
    }
}

impl Rendezvous {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU16::new(0),
            request: AtomicBool::new(false),
            sample: AtomicU32::new(0),
        }
    }

    /// Sampling timer interrupt.
    pub fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Trigger falling edge interrupt.
    pub fn request(&self) {
        self.request.store(true, Ordering::Release);
    }

    pub fn sample_due(&self) -> bool {
        self.ticks.load(Ordering::Relaxed) >= SAMPLE_TICKS
    }

    pub fn restart(&self) {
        self.ticks.store(0, Ordering::Relaxed);
    }

    pub fn requested(&self) -> bool {
        self.request.load(Ordering::Acquire)
    }

    pub fn clear_request(&self) {
        self.request.store(false, Ordering::Release);
    }

    pub fn store(&self, sample: RawSample) {
        self.sample.store(sample.into(), Ordering::Release);
    }

    /// Most recently completed acquisition, all zero before the first one.
    pub fn latest(&self) -> RawSample {
        self.sample.load(Ordering::Acquire).into()
    }
}

#[derive(Debug, PartialEq)]
pub enum Error<P> {
    Acquire(P),
    Transmit(P),
}

fn io_section<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(feature = "interrupt-free-io")]
    {
        critical_section::with(|_| f())
    }
    #[cfg(not(feature = "interrupt-free-io"))]
    {
        f()
    }
}

/// Main loop side of a sensor node.
pub struct Node<'a, CS, SCLK, MISO, TX, D> {
    sampler: Sampler<CS, SCLK, MISO>,
    tx: SoftTx<TX, D>,
    shared: &'a Rendezvous,
}

impl<'a, CS, SCLK, MISO, TX, D, P> Node<'a, CS, SCLK, MISO, TX, D>
where
    CS: OutputPin<Error = P>,
    SCLK: OutputPin<Error = P>,
    MISO: InputPin<Error = P>,
    TX: OutputPin<Error = P>,
    D: DelayUs<u32>,
{
    pub fn new(
        sampler: Sampler<CS, SCLK, MISO>,
        tx: SoftTx<TX, D>,
        shared: &'a Rendezvous,
    ) -> Self {
        Self {
            sampler,
            tx,
            shared,
        }
    }

    /// One main loop pass: sample if due, then answer a pending request.
    pub fn service(&mut self) -> Result<(), Error<P>> {
        if self.shared.sample_due() {
            let sample = io_section(|| self.sampler.acquire()).map_err(Error::Acquire)?;
            self.shared.store(sample);
            self.shared.restart();
        }

        if self.shared.requested() {
            let shared = self.shared;
            let tx = &mut self.tx;
            io_section(|| {
                let sent = tx.write_all(&shared.latest().0);
                shared.clear_request();
                sent
            })
            .map_err(Error::Transmit)?;
        }
        Ok(())
    }
}
