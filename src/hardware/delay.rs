use super::hal::hal::blocking::delay::DelayUs;

/// Busy-wait delay calibrated to the core clock.
///
/// Used for the trigger pulse on the controller and for the bit periods of
/// the software UART on the node.
#[derive(Copy, Clone, Debug)]
pub struct AsmDelay {
    cyc_per_us_corrected: u32,
}

impl AsmDelay {
    pub fn new(freq: u32) -> AsmDelay {
        AsmDelay {
            // Corrected value for cortex_m::asm::delay cycles per us.
            // See https://github.com/rust-embedded/cortex-m/issues/430
            cyc_per_us_corrected: (freq / 1_000_000) * 2,
        }
    }
}

impl DelayUs<u32> for AsmDelay {
    fn delay_us(&mut self, us: u32) {
        cortex_m::asm::delay(self.cyc_per_us_corrected * us)
    }
}
