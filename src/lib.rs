#![cfg_attr(not(test), no_std)]

#[cfg(target_os = "none")]
pub mod hardware;

pub mod channel;
pub mod convert;
pub mod framer;
pub mod node;
pub mod poll;
pub mod shell;
pub mod statistics;

#[cfg(test)]
mod mock;

/// Monotonic clock tick frequency used for protocol deadlines.
pub const MONOTONIC_FREQUENCY: u32 = 1_000;

pub type Instant = fugit::TimerInstantU32<MONOTONIC_FREQUENCY>;
pub type Duration = fugit::TimerDurationU32<MONOTONIC_FREQUENCY>;
