//! # Magnetometer array controller
//!
//! Firmware: polls the twelve sensor nodes on host request.
//!
//! On a hosted target this builds a monitor instead. It reads reply lines from
//! stdin and prints channel statistics as JSON every
//! `statistics::TELEMETRY_PERIOD` lines.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
use panic_probe as _; // global panic handler

#[cfg(not(target_os = "none"))]
fn main() {
    use magnetometer_array::statistics::{Monitor, Telemetry};
    use std::io::BufRead;

    let mut monitor = Monitor::default();
    let report = |telemetry: Telemetry| {
        println!("{}", serde_json::to_string(&telemetry).unwrap());
    };

    for line in std::io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Reading stdin failed: {}", e);
                break;
            }
        };
        match monitor.feed(&line) {
            Ok(Some(telemetry)) => report(telemetry),
            Ok(None) => {}
            Err(e) => eprintln!("Skipping line {:?}: {:?}", line, e),
        }
    }
    if let Some(telemetry) = monitor.finish() {
        report(telemetry);
    }
}

#[cfg(target_os = "none")]
#[cfg_attr(target_os = "none", rtic::app(device = hal::stm32, peripherals = true))]
mod app {
    use magnetometer_array::hardware::{
        hal,
        setup::{setup_controller, HostLink, Poller},
    };
    use magnetometer_array::shell::Shell;

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        shell: Shell<HostLink, Poller>,
    }

    #[init]
    fn init(c: init::Context) -> (Shared, Local) {
        let controller = setup_controller(c.core, c.device);
        (
            Shared {},
            Local {
                shell: controller.shell,
            },
        )
    }

    #[idle(local=[shell])]
    fn idle(c: idle::Context) -> ! {
        loop {
            match c.local.shell.process() {
                Ok(Some(command)) => log::debug!("Handled {:?}", command),
                Ok(None) => {}
                Err(e) => log::error!("Command failed: {:?}", e),
            }
        }
    }
}
