#![no_std]

use embedded_hal as hal;

pub use cortex_m;

pub mod pac;

pub mod aes;
pub mod debug;
pub mod dma;
pub mod prelude;
pub mod watchdog;
