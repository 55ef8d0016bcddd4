#![deny(warnings)]
#![deny(unsafe_code)]
#![no_main]
#![no_std]

extern crate cortex_m;
extern crate cortex_m_rt as rt;
extern crate msp432p4xx_hal as hal;
extern crate panic_halt;

use hal::pac;
use hal::prelude::*;
use hal::watchdog::{ClockSource, Interval};
use rt::entry;

#[entry]
fn main() -> ! {
    let dp = pac::Peripherals::take().unwrap();

    let mut watchdog = dp.WDT_A.watchdog();
    watchdog.hold();
    assert!(watchdog.is_held());

    // About 1 s from the 32768 Hz reference
    watchdog.set_clock_source(ClockSource::BCLK);
    watchdog.start(Interval::Cycles32K);

    for _ in 0..1_000 {
        watchdog.feed();
        cortex_m::asm::delay(10_000);
    }

    cortex_m::asm::bkpt();

    // Stop feeding, the watchdog resets the device
    loop {}
}
