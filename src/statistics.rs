//! # Reading statistics
//!
//! Summaries of the readings of one channel over a telemetry period. Fault
//! sentinels are counted, not averaged.

use num_traits::Float as _;
use serde::Serialize;

use crate::convert::{ParseError, Readings, CHANNELS};
use crate::shell::IDENTIFICATION;

/// Statistics telemetry struct. Mean, peak-to-peak and standard deviation of
/// the field in µT over the last telemetry period.
#[derive(Serialize, Copy, Clone, Debug, PartialEq)]
pub struct Statistics {
    mean: f32,
    ptp: f32,
    std: f32,
}

impl From<Buffer> for Option<Statistics> {
    /// Finalize the buffer. `None` if the period held no valid reading.
    fn from(buff: Buffer) -> Self {
        if buff.counter > 0 {
            let c = 1.0 / buff.counter as f32;
            let mean = buff.m1 * c;
            let var = (buff.m2 * c - mean * mean).max(0.0);
            Some(Statistics {
                mean: mean + buff.x0,
                ptp: buff.max - buff.min,
                std: var.sqrt(),
            })
        } else {
            None
        }
    }
}

/// Statistics buffer for computing min/max/mean of the last telemetry period.
#[derive(Copy, Clone, Debug)]
pub struct Buffer {
    min: f32,
    max: f32,
    m1: f32,
    m2: f32,
    x0: f32,
    counter: u32,
    faults: u32,
}

impl Buffer {
    /// Add a new reading to the buffer. Fault sentinels only bump the fault counter.
    pub fn update(&mut self, x: f32) {
        if Readings::is_fault(x) {
            self.faults += 1;
            return;
        }
        self.max = self.max.max(x);
        self.min = self.min.min(x);
        if self.counter == 0 {
            self.x0 = x;
        };
        self.counter += 1;
        let t = x - self.x0;
        self.m1 += t;
        self.m2 += t * t;
    }

    pub fn faults(&self) -> u32 {
        self.faults
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self {
            counter: 0,
            faults: 0,
            m1: 0.,
            m2: 0.,
            x0: 0.,
            max: f32::NEG_INFINITY,
            min: f32::INFINITY,
        }
    }
}

/// Telemetry of all channels for one period.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct Telemetry {
    /// `None` for channels without a valid reading in the period.
    pub statistics: [Option<Statistics>; CHANNELS],
    /// Timed out polls per channel.
    pub faults: [u32; CHANNELS],
    /// Poll cycles in the period.
    pub cycles: u32,
}

/// Per-channel statistics buffers.
#[derive(Clone, Debug, Default)]
pub struct Accumulator {
    buffers: [Buffer; CHANNELS],
    cycles: u32,
}

impl Accumulator {
    pub fn update(&mut self, readings: &Readings) {
        for (buff, x) in self.buffers.iter_mut().zip(readings.0) {
            buff.update(x);
        }
        self.cycles += 1;
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Finalize and reset all buffers.
    pub fn take(&mut self) -> Telemetry {
        let Self { buffers, cycles } = core::mem::take(self);
        Telemetry {
            statistics: buffers.map(Into::into),
            faults: buffers.map(|b| b.faults()),
            cycles,
        }
    }
}

/// Reply lines per telemetry period.
pub const TELEMETRY_PERIOD: u32 = 25;

/// Host side consumer of `R` reply lines.
#[derive(Clone, Debug)]
pub struct Monitor {
    accumulator: Accumulator,
    period: u32,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(TELEMETRY_PERIOD)
    }
}

impl Monitor {
    pub fn new(period: u32) -> Self {
        Self {
            accumulator: Accumulator::default(),
            period,
        }
    }

    /// Add one reply line.
    ///
    /// Blank lines and the identification reply are skipped. Unparsable lines
    /// are rejected without touching the period.
    ///
    /// # Returns
    /// The telemetry of the period completed by this line, if any.
    pub fn feed(&mut self, line: &str) -> Result<Option<Telemetry>, ParseError> {
        let line = line.trim();
        if line.is_empty() || line == IDENTIFICATION {
            return Ok(None);
        }
        self.accumulator.update(&line.parse()?);
        Ok((self.accumulator.cycles() >= self.period).then(|| self.accumulator.take()))
    }

    /// Telemetry of a trailing partial period.
    pub fn finish(&mut self) -> Option<Telemetry> {
        (self.accumulator.cycles() > 0).then(|| self.accumulator.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::FAULT;

    #[test]
    fn empty_buffer_has_no_statistics() {
        assert_eq!(Option::<Statistics>::from(Buffer::default()), None);
    }

    #[test]
    fn mean_ptp_std() {
        let mut buff = Buffer::default();
        for x in [10.0, 12.0, 14.0, 12.0] {
            buff.update(x);
        }
        let stats = Option::<Statistics>::from(buff).unwrap();
        assert!((stats.mean - 12.0).abs() < 1e-5);
        assert!((stats.ptp - 4.0).abs() < 1e-5);
        assert!((stats.std - 2.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn faults_are_counted_not_averaged() {
        let mut buff = Buffer::default();
        buff.update(-100.0);
        buff.update(FAULT);
        buff.update(-102.0);
        assert_eq!(buff.faults(), 1);
        let stats = Option::<Statistics>::from(buff).unwrap();
        assert!((stats.mean + 101.0).abs() < 1e-5);
        assert!((stats.ptp - 2.0).abs() < 1e-5);
    }

    #[test]
    fn accumulator_resets_on_take() {
        let mut acc = Accumulator::default();
        let mut readings = Readings::default();
        readings.0[0] = 1.5;
        acc.update(&readings);
        acc.update(&readings);

        let telemetry = acc.take();
        assert_eq!(telemetry.cycles, 2);
        assert_eq!(telemetry.faults[0], 0);
        assert_eq!(telemetry.faults[1], 2);
        assert!(telemetry.statistics[0].is_some());
        assert!(telemetry.statistics[1].is_none());

        assert_eq!(acc.cycles(), 0);
        assert_eq!(acc.take(), Telemetry::default());
    }

    fn reply(first: f32) -> String {
        let mut readings = Readings::default();
        readings.0[0] = first;
        readings.to_string()
    }

    #[test]
    fn monitor_skips_identification_and_blank_lines() {
        let mut monitor = Monitor::default();
        assert_eq!(monitor.feed(IDENTIFICATION), Ok(None));
        assert_eq!(monitor.feed(""), Ok(None));
        assert_eq!(monitor.feed("  \r"), Ok(None));
        assert_eq!(monitor.finish(), None);
    }

    #[test]
    fn monitor_reports_every_period() {
        let mut monitor = Monitor::default();
        for i in 0..TELEMETRY_PERIOD - 1 {
            assert_eq!(monitor.feed(&reply(i as f32)), Ok(None));
        }
        let telemetry = monitor.feed(&reply(24.0)).unwrap().unwrap();
        assert_eq!(telemetry.cycles, TELEMETRY_PERIOD);
        assert_eq!(telemetry.faults[0], 0);
        assert_eq!(telemetry.faults[11], TELEMETRY_PERIOD);
        assert!(telemetry.statistics[0].is_some());
        assert!(telemetry.statistics[1].is_none());

        // The 26th line opens the next period, reported at the end.
        assert_eq!(monitor.feed(&(reply(-3.5) + "\n")), Ok(None));
        let tail = monitor.finish().unwrap();
        assert_eq!(tail.cycles, 1);
        assert_eq!(
            tail.statistics[0],
            Some(Statistics {
                mean: -3.5,
                ptp: 0.0,
                std: 0.0
            })
        );
        assert_eq!(monitor.finish(), None);
    }

    #[test]
    fn monitor_rejects_garbage() {
        let mut monitor = Monitor::default();
        assert!(matches!(monitor.feed("garbage"), Err(ParseError::Float(_))));
        assert_eq!(monitor.feed("1.0\t2.0"), Err(ParseError::Count(2)));
        assert_eq!(monitor.finish(), None);
    }
}
