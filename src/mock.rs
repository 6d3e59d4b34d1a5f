//! Recording stand-ins for the bus hardware.
//!
//! All handles of one [Bus] share a single state, so pin edges, SPI writes and
//! delays end up in one ordered event log. The trigger line and the serial link
//! are wired together: a rising edge on `trig` makes the node addressed by the
//! last select code and the `inh` level queue its configured reply. The `sclk`
//! and `miso` pins emulate the shift register of a node ADC.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Write},
    digital::v2::{InputPin, OutputPin},
    serial::Read,
};
use strum::IntoEnumIterator;

use crate::channel::Channel;
use crate::Instant;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

#[derive(Default)]
struct State {
    events: Vec<String>,
    levels: HashMap<&'static str, Level>,
    spi: Vec<u8>,
    /// `None` marks a frame received with an error.
    rx: VecDeque<Option<u8>>,
    replies: HashMap<u8, Vec<u8>>,
    triggered: Vec<Channel>,
    now_ms: u32,
    delay_us: u64,
    adc_word: u32,
    adc_bit: u32,
}

impl State {
    fn connected(&self) -> Channel {
        let code = self.spi.last().copied().unwrap_or(0xFF);
        let bank = self.levels.get("inh") == Some(&Level::Low);
        Channel::iter()
            .find(|ch| ch.code() == code && ch.inhibited_bank() == bank)
            .unwrap_or(Channel::None)
    }

    fn set(&mut self, name: &'static str, level: Level) {
        let previous = self.levels.insert(name, level);
        self.events.push(format!("{name} {level:?}"));
        match (name, previous, level) {
            ("trig", Some(Level::Low), Level::High) => {
                let ch = self.connected();
                if ch != Channel::None {
                    self.triggered.push(ch);
                    if let Some(reply) = self.replies.get(&(ch as u8)) {
                        self.rx.extend(reply.iter().copied().map(Some));
                    }
                }
            }
            ("sclk", Some(Level::Low), Level::High) => self.adc_bit += 1,
            ("cs", _, Level::Low) => self.adc_bit = 0,
            _ => {}
        }
    }
}

#[derive(Clone, Default)]
pub struct Bus(Rc<RefCell<State>>);

impl Bus {
    pub fn pin(&self, name: &'static str) -> Pin {
        Pin {
            name,
            bus: self.clone(),
        }
    }

    pub fn spi(&self) -> Spi {
        Spi(self.clone())
    }

    pub fn link(&self) -> Link {
        Link(self.clone())
    }

    pub fn clock(&self) -> Clock {
        Clock(self.clone())
    }

    pub fn delay(&self) -> Delay {
        Delay(self.clone())
    }

    /// Bytes the node on `ch` sends when triggered.
    pub fn reply(&self, ch: Channel, bytes: &[u8]) {
        self.0.borrow_mut().replies.insert(ch as u8, bytes.to_vec());
    }

    pub fn silence(&self, ch: Channel) {
        self.0.borrow_mut().replies.remove(&(ch as u8));
    }

    /// Queue bytes on the link as if already received.
    pub fn preload(&self, bytes: &[u8]) {
        self.0.borrow_mut().rx.extend(bytes.iter().copied().map(Some));
    }

    /// Queue a frame that fails to receive.
    pub fn garble(&self) {
        self.0.borrow_mut().rx.push_back(None);
    }

    /// Word shifted out by the emulated ADC, MSB first.
    pub fn adc_word(&self, word: u32) {
        self.0.borrow_mut().adc_word = word;
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().events.clone()
    }

    pub fn spi_bytes(&self) -> Vec<u8> {
        self.0.borrow().spi.clone()
    }

    pub fn level(&self, name: &str) -> Option<Level> {
        self.0.borrow().levels.get(name).copied()
    }

    pub fn triggered(&self) -> Vec<Channel> {
        self.0.borrow().triggered.clone()
    }

    pub fn now_ms(&self) -> u32 {
        self.0.borrow().now_ms
    }

    pub fn delay_us(&self) -> u64 {
        self.0.borrow().delay_us
    }
}

pub struct Pin {
    name: &'static str,
    bus: Bus,
}

impl OutputPin for Pin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.bus.0.borrow_mut().set(self.name, Level::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.bus.0.borrow_mut().set(self.name, Level::High);
        Ok(())
    }
}

impl InputPin for Pin {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        let state = self.bus.0.borrow();
        Ok(match self.name {
            "miso" => state.adc_bit < 32 && state.adc_word >> (31 - state.adc_bit) & 1 == 1,
            name => state.levels.get(name) == Some(&Level::High),
        })
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

pub struct Spi(Bus);

impl Write<u8> for Spi {
    type Error = Infallible;

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.0 .0.borrow_mut();
        for word in words {
            state.events.push(format!("spi {word:#04x}"));
            state.spi.push(*word);
        }
        Ok(())
    }
}

pub struct Link(Bus);

impl Read<u8> for Link {
    type Error = ();

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        match self.0 .0.borrow_mut().rx.pop_front() {
            Some(Some(byte)) => Ok(byte),
            Some(None) => Err(nb::Error::Other(())),
            None => Err(nb::Error::WouldBlock),
        }
    }
}

/// Advances by one millisecond on every reading.
pub struct Clock(Bus);

impl crate::framer::Clock for Clock {
    fn now(&mut self) -> Instant {
        let mut state = self.0 .0.borrow_mut();
        let now = Instant::from_ticks(state.now_ms);
        state.now_ms += 1;
        now
    }
}

pub struct Delay(Bus);

impl DelayUs<u32> for Delay {
    fn delay_us(&mut self, us: u32) {
        let mut state = self.0 .0.borrow_mut();
        state.events.push(format!("delay {us}"));
        state.delay_us += us as u64;
    }
}

/// Host side of the command link: queued input, collected output.
#[derive(Default)]
pub struct Console {
    pub input: VecDeque<u8>,
    pub output: String,
}

impl Console {
    pub fn send(&mut self, bytes: &[u8]) {
        self.input.extend(bytes);
    }
}

impl Read<u8> for Console {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.input.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl core::fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.output.push_str(s);
        Ok(())
    }
}
