#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

#[cfg(feature = "firmware")]
use core::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "firmware")]
use defmt_rtt as _; // global logger
#[cfg(feature = "firmware")]
use panic_probe as _;

pub mod buffer;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod hw;
pub mod pulse;
pub mod record;
pub mod session;
pub mod stream;
pub mod tick;
pub mod transmit;

#[cfg(test)]
mod mock;

#[cfg(feature = "firmware")]
static COUNT: AtomicUsize = AtomicUsize::new(0);
#[cfg(feature = "firmware")]
defmt::timestamp!("{=usize}", {
    let n = COUNT.load(Ordering::Relaxed);
    COUNT.store(n + 1, Ordering::Relaxed);
    n
});

/// Parks the core after a fatal error and makes `probe-run` exit.
#[cfg(feature = "firmware")]
pub fn exit() -> ! {
    loop {
        cortex_m::asm::bkpt();
    }
}
