//! Interface to the WDT_A watchdog timer
//!
//! The watchdog runs from reset on, so programs that don't feed it need to
//! call [`WatchdogTimer::hold`] first thing.

use tock_registers::{
    fields::FieldValue,
    interfaces::{ReadWriteable, Readable},
};

use crate::hal::watchdog;
use crate::pac::{wdt_a::WDTCTL, WDT_A};

/// Written to the upper byte of every WDTCTL access. Reads back as 0x69.
const PASSWORD: u16 = 0x5A;

/// Timeout, in cycles of the selected clock source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interval {
    Cycles2G = 0,
    Cycles128M = 1,
    Cycles8192K = 2,
    Cycles512K = 3,
    Cycles32K = 4,
    Cycles8192 = 5,
    Cycles512 = 6,
    Cycles64 = 7,
}

impl Interval {
    /// Number of clock cycles until the watchdog expires
    pub fn cycles(self) -> u32 {
        match self {
            Interval::Cycles2G => 1 << 31,
            Interval::Cycles128M => 1 << 27,
            Interval::Cycles8192K => 1 << 23,
            Interval::Cycles512K => 1 << 19,
            Interval::Cycles32K => 1 << 15,
            Interval::Cycles8192 => 1 << 13,
            Interval::Cycles512 => 1 << 9,
            Interval::Cycles64 => 1 << 6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockSource {
    SMCLK = 0,
    ACLK = 1,
    VLOCLK = 2,
    BCLK = 3,
}

pub struct WatchdogTimer {
    wdt: WDT_A,
    clock_source: ClockSource,
}

impl WatchdogTimer {
    /// Stops the counter
    pub fn hold(&mut self) {
        self.wdt.ctl.modify(hold_fields());
    }

    pub fn is_held(&self) -> bool {
        self.wdt.ctl.is_set(WDTCTL::WDTHOLD)
    }

    /// Clock source used by the next [`start`](watchdog::WatchdogEnable::start)
    pub fn set_clock_source(&mut self, clock_source: ClockSource) {
        self.clock_source = clock_source;
    }
}

impl watchdog::Watchdog for WatchdogTimer {
    fn feed(&mut self) {
        self.wdt.ctl.modify(feed_fields());
    }
}

impl watchdog::WatchdogEnable for WatchdogTimer {
    type Time = Interval;

    fn start<T>(&mut self, period: T)
    where
        T: Into<Interval>,
    {
        self.wdt
            .ctl
            .modify(start_fields(self.clock_source, period.into()));
    }
}

impl watchdog::WatchdogDisable for WatchdogTimer {
    fn disable(&mut self) {
        self.hold();
    }
}

pub trait WatchdogExt {
    fn watchdog(self) -> WatchdogTimer;
}

impl WatchdogExt for WDT_A {
    fn watchdog(self) -> WatchdogTimer {
        WatchdogTimer {
            wdt: self,
            clock_source: ClockSource::SMCLK,
        }
    }
}

fn hold_fields() -> FieldValue<u16, WDTCTL::Register> {
    WDTCTL::WDTPW.val(PASSWORD) + WDTCTL::WDTHOLD::SET
}

fn feed_fields() -> FieldValue<u16, WDTCTL::Register> {
    WDTCTL::WDTPW.val(PASSWORD) + WDTCTL::WDTCNTCL::SET
}

fn start_fields(
    clock_source: ClockSource,
    interval: Interval,
) -> FieldValue<u16, WDTCTL::Register> {
    WDTCTL::WDTPW.val(PASSWORD)
        + WDTCTL::WDTSSEL.val(clock_source as u16)
        + WDTCTL::WDTTMSEL::CLEAR
        + WDTCTL::WDTIS.val(interval as u16)
        + WDTCTL::WDTCNTCL::SET
        + WDTCTL::WDTHOLD::CLEAR
}

#[cfg(test)]
mod tests {
    use super::*;
    use tock_registers::registers::InMemoryRegister;

    /// WDTCTL after reset: password reads as 0x69, 32K interval
    const RESET: u16 = 0x6904;

    #[test]
    fn hold_keeps_interval() {
        let ctl: InMemoryRegister<u16, WDTCTL::Register> = InMemoryRegister::new(RESET);

        ctl.modify(hold_fields());

        assert_eq!(ctl.get(), 0x5A84);
        assert!(ctl.is_set(WDTCTL::WDTHOLD));
    }

    #[test]
    fn feed_clears_counter() {
        let ctl: InMemoryRegister<u16, WDTCTL::Register> = InMemoryRegister::new(RESET);

        ctl.modify(feed_fields());

        assert_eq!(ctl.get(), 0x5A0C);
    }

    #[test]
    fn start_releases_hold() {
        let ctl: InMemoryRegister<u16, WDTCTL::Register> =
            InMemoryRegister::new(RESET | 0x0080);

        ctl.modify(start_fields(ClockSource::ACLK, Interval::Cycles8192));

        assert!(!ctl.is_set(WDTCTL::WDTHOLD));
        assert_eq!(ctl.read(WDTCTL::WDTPW), 0x5A);
        assert_eq!(ctl.read(WDTCTL::WDTIS), 5);
        assert!(ctl.matches_all(WDTCTL::WDTSSEL::ACLK + WDTCTL::WDTCNTCL::SET));
        assert_eq!(ctl.get(), 0x5A2D);
    }

    #[test]
    fn interval_cycles() {
        assert_eq!(Interval::Cycles2G.cycles(), 2_147_483_648);
        assert_eq!(Interval::Cycles32K.cycles(), 32_768);
        assert_eq!(Interval::Cycles64.cycles(), 64);
    }
}
