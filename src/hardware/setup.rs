//! Peripheral setup for both boards.
//!
//! Controller
//! * SPI1 (PA5 SCK, PA7 MOSI), PA4 latch, PB0 bank inhibit: channel multiplexer
//! * PB1: trigger line, idle high
//! * USART2 (PD6 RX): node responses, 9600 baud
//! * USART3 (PD8 TX, PD9 RX): host commands, 115200 baud
//!
//! Node
//! * PA4 chip select, PA5 clock, PA6 data: ADC readout
//! * PD5: response line, bit-banged
//! * PB1: trigger line input, falling edge interrupt
//! * TIM2: sampling tick
use log::info;
use rtt_logger::RTTLogger;

use super::hal::{
    self,
    gpio::{gpioa::*, gpiob::*, gpiod::*, Edge, ExtiPin, Input, Output, PushPull},
    hal::serial,
    prelude::*,
    serial::{Rx, Tx},
    spi::{Enabled, NoMiso, Spi},
    stm32::{SPI1, TIM2, USART2, USART3},
    timer::{Event, Timer},
};
use super::{delay::AsmDelay, Systick, SystemTimer, SYSCLK_HZ};
use crate::channel::{ChannelSelector, SPI_FREQUENCY_HZ, SPI_MODE};
use crate::node::{sampler::Sampler, uart::SoftTx, uart::NODE_BAUD, Node, Rendezvous};
use crate::node::TICK_PERIOD_US;
use crate::shell::{Shell, HOST_BAUD};

type O = Output<PushPull>;

pub type Poller = crate::poll::Poller<
    Spi<SPI1, Enabled, u8>,
    PA4<O>,
    PB0<O>,
    PB1<O>,
    Rx<USART2>,
    SystemTimer,
    AsmDelay,
>;

pub type SensorNode = Node<'static, PA4<O>, PA5<O>, PA6<Input>, PD5<O>, AsmDelay>;

/// Host command link. Output blocks until each byte is queued.
pub struct HostLink {
    tx: Tx<USART3>,
    rx: Rx<USART3>,
}

impl serial::Read<u8> for HostLink {
    type Error = <Rx<USART3> as serial::Read<u8>>::Error;

    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.rx.read()
    }
}

impl core::fmt::Write for HostLink {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        s.bytes()
            .try_for_each(|b| nb::block!(serial::Write::write(&mut self.tx, b)))
            .map_err(|_| core::fmt::Error)
    }
}

pub struct ControllerDevices {
    pub shell: Shell<HostLink, Poller>,
}

pub struct NodeDevices {
    pub node: SensorNode,
    pub timer: Timer<TIM2>,
    pub trigger: PB1<Input>,
}

fn init_logging() {
    static LOGGER: RTTLogger = RTTLogger::new(log::LevelFilter::Info);
    rtt_target::rtt_init_print!();
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(log::LevelFilter::Trace))
        .unwrap();
}

pub fn setup_controller(
    core: rtic::export::Peripherals,
    device: hal::stm32::Peripherals,
) -> ControllerDevices {
    init_logging();
    info!("---Starting controller setup");

    let pwr = device.PWR.constrain();
    let pwrcfg = pwr.freeze();
    let rcc = device.RCC.constrain();
    let ccdr = rcc
        .sys_ck(SYSCLK_HZ.Hz())
        .freeze(pwrcfg, &device.SYSCFG);

    Systick::start(core.SYST, ccdr.clocks.sysclk().raw());

    let gpioa = device.GPIOA.split(ccdr.peripheral.GPIOA);
    let gpiob = device.GPIOB.split(ccdr.peripheral.GPIOB);
    let gpiod = device.GPIOD.split(ccdr.peripheral.GPIOD);

    let spi: Spi<SPI1, Enabled, u8> = device.SPI1.spi(
        (gpioa.pa5.into_alternate(), NoMiso, gpioa.pa7.into_alternate()),
        SPI_MODE,
        SPI_FREQUENCY_HZ.Hz(),
        ccdr.peripheral.SPI1,
        &ccdr.clocks,
    );
    let selector = ChannelSelector::new(
        spi,
        gpioa.pa4.into_push_pull_output(),
        gpiob.pb0.into_push_pull_output(),
    )
    .unwrap();

    let (_, node_rx) = device
        .USART2
        .serial(
            (gpiod.pd5.into_alternate(), gpiod.pd6.into_alternate()),
            NODE_BAUD.Hz(),
            ccdr.peripheral.USART2,
            &ccdr.clocks,
        )
        .unwrap()
        .split();

    let (host_tx, host_rx) = device
        .USART3
        .serial(
            (gpiod.pd8.into_alternate(), gpiod.pd9.into_alternate()),
            HOST_BAUD.Hz(),
            ccdr.peripheral.USART3,
            &ccdr.clocks,
        )
        .unwrap()
        .split();

    let poller = Poller::new(
        selector,
        gpiob.pb1.into_push_pull_output(),
        node_rx,
        SystemTimer,
        AsmDelay::new(ccdr.clocks.c_ck().raw()),
    )
    .unwrap();

    info!("---Controller setup done");
    ControllerDevices {
        shell: Shell::new(
            HostLink {
                tx: host_tx,
                rx: host_rx,
            },
            poller,
        ),
    }
}

pub fn setup_node(
    core: rtic::export::Peripherals,
    mut device: hal::stm32::Peripherals,
    shared: &'static Rendezvous,
) -> NodeDevices {
    init_logging();
    info!("---Starting node setup");

    let pwr = device.PWR.constrain();
    let pwrcfg = pwr.freeze();
    let rcc = device.RCC.constrain();
    let ccdr = rcc
        .sys_ck(SYSCLK_HZ.Hz())
        .freeze(pwrcfg, &device.SYSCFG);

    Systick::start(core.SYST, ccdr.clocks.sysclk().raw());

    let gpioa = device.GPIOA.split(ccdr.peripheral.GPIOA);
    let gpiob = device.GPIOB.split(ccdr.peripheral.GPIOB);
    let gpiod = device.GPIOD.split(ccdr.peripheral.GPIOD);

    let delay = AsmDelay::new(ccdr.clocks.c_ck().raw());

    let sampler = Sampler::new(
        gpioa.pa4.into_push_pull_output(),
        gpioa.pa5.into_push_pull_output(),
        gpioa.pa6.into_pull_up_input(),
    )
    .unwrap();
    let tx = SoftTx::new(gpiod.pd5.into_push_pull_output(), delay).unwrap();

    let mut trigger = gpiob.pb1.into_pull_up_input();
    trigger.make_interrupt_source(&mut device.SYSCFG);
    trigger.trigger_on_edge(&mut device.EXTI, Edge::Falling);
    trigger.enable_interrupt(&mut device.EXTI);

    let mut timer = device.TIM2.timer(
        (1_000_000 / TICK_PERIOD_US).Hz(),
        ccdr.peripheral.TIM2,
        &ccdr.clocks,
    );
    timer.listen(Event::TimeOut);

    info!("---Node setup done");
    NodeDevices {
        node: Node::new(sampler, tx, shared),
        timer,
        trigger,
    }
}
