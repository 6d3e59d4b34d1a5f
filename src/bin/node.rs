//! # Magnetometer array sensor node
//!
//! Firmware: samples the local ADC every 250 ms and answers the trigger line
//! with the latest sample.
//!
//! On a hosted target this prints the response line levels for a sample given
//! in hex, for comparison with a scope capture.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
use panic_probe as _; // global panic handler

/// Shared between the interrupt tasks and the main loop.
#[cfg(target_os = "none")]
static RENDEZVOUS: magnetometer_array::node::Rendezvous =
    magnetometer_array::node::Rendezvous::new();

#[cfg(not(target_os = "none"))]
fn main() {
    use magnetometer_array::convert::RawSample;
    use magnetometer_array::node::uart::{Frame, BIT_PERIOD_US};

    let Some(arg) = std::env::args().nth(1) else {
        eprintln!("usage: node <sample as hex, e.g. 2000_0020>");
        std::process::exit(2);
    };
    let word = match u32::from_str_radix(&arg.trim_start_matches("0x").replace('_', ""), 16) {
        Ok(word) => word,
        Err(e) => {
            eprintln!("Invalid sample {:?}: {}", arg, e);
            std::process::exit(2);
        }
    };

    println!("bit period {} us", BIT_PERIOD_US);
    for byte in RawSample::from(word).0 {
        let levels: String = Frame::new(byte).map(|high| if high { '1' } else { '0' }).collect();
        println!("{:#04x} {}", byte, levels);
    }
}

#[cfg(target_os = "none")]
#[cfg_attr(target_os = "none", rtic::app(device = hal::stm32, peripherals = true))]
mod app {
    use magnetometer_array::hardware::{
        hal::{
            self,
            gpio::{gpiob::PB1, ExtiPin, Input},
            stm32::TIM2,
            timer::Timer,
        },
        setup::{setup_node, SensorNode},
    };
    use super::RENDEZVOUS;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        node: SensorNode,
        timer: Timer<TIM2>,
        trigger: PB1<Input>,
    }

    #[init]
    fn init(c: init::Context) -> (Shared, Local) {
        let devices = setup_node(c.core, c.device, &RENDEZVOUS);
        (
            Shared {},
            Local {
                node: devices.node,
                timer: devices.timer,
                trigger: devices.trigger,
            },
        )
    }

    #[idle(local=[node])]
    fn idle(c: idle::Context) -> ! {
        loop {
            if let Err(e) = c.local.node.service() {
                log::error!("Node service failed: {:?}", e);
            }
        }
    }

    #[task(priority = 2, binds = TIM2, local=[timer])]
    fn tick(c: tick::Context) {
        c.local.timer.clear_irq();
        RENDEZVOUS.tick();
    }

    #[task(priority = 2, binds = EXTI1, local=[trigger])]
    fn trigger(c: trigger::Context) {
        c.local.trigger.clear_interrupt_pending_bit();
        RENDEZVOUS.request();
    }
}
