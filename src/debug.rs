//! Debug output over semihosting
//!
//! Requires the `debug` feature. Without it, [`init`] does nothing and the
//! [`print!`] and [`println!`] macros discard their output, so the same
//! program runs with or without a debugger attached.
//!
//! Programs built with the `debug` feature halt at the first output if no
//! debugger is attached.

use core::cell::RefCell;

use cortex_m::interrupt::Mutex;
use cortex_m_semihosting::hio::HStdout;

/// Connects to the host's stdout
///
/// Users can typically ignore this static, and use [`init`], [`print!`], and
/// [`println!`] instead.
pub static STDOUT: Mutex<RefCell<Option<HStdout>>> = Mutex::new(RefCell::new(None));

/// Initializes the debug output, if the `debug` feature is enabled
pub fn init() {
    #[cfg(feature = "debug")]
    {
        use cortex_m::interrupt;
        use cortex_m_semihosting::hio;

        interrupt::free(|cs| {
            *STDOUT.borrow(cs).borrow_mut() =
                Some(hio::hstdout().expect("Failed to initialize semihosting"));
        });
    }
}

/// Sends a debug message to the host, if semihosting is enabled
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => {
        $crate::cortex_m::interrupt::free(|cs| {
            if let Some(ref mut stdout) =
                *$crate::debug::STDOUT.borrow(cs).borrow_mut()
            {
                use core::fmt::Write;
                write!(stdout, $($arg)*).expect("Failed to write to stdout")
            }
        })
    }
}

/// Sends a debug message to the host, if semihosting is enabled
#[macro_export]
macro_rules! println {
    ($fmt:expr) => {
        $crate::print!(concat!($fmt, "\n"));
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::print!(concat!($fmt, "\n"), $($arg)*);
    };
}
