//! # Magnetometer array board support
//!
//! Controller and sensor nodes run on the same STM32H743 module. Pin
//! assignments and peripheral setup live in [setup].

pub use stm32h7xx_hal as hal;

use rtic_monotonics::Monotonic;

use crate::{framer, Instant, MONOTONIC_FREQUENCY};

pub mod delay;
pub mod setup;

rtic_monotonics::systick_monotonic!(Systick, MONOTONIC_FREQUENCY);

/// Core clock frequency requested from the RCC.
pub const SYSCLK_HZ: u32 = 400_000_000;

/// Protocol deadline clock backed by the SysTick monotonic.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemTimer;

impl framer::Clock for SystemTimer {
    fn now(&mut self) -> Instant {
        Systick::now()
    }
}
