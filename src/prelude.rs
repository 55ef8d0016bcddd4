pub use embedded_hal::prelude::*;

pub use crate::hal::watchdog::Watchdog as _;
pub use crate::hal::watchdog::WatchdogDisable as _;
pub use crate::hal::watchdog::WatchdogEnable as _;

pub use crate::watchdog::WatchdogExt as _;
