//! Watchdog timer registers

use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

register_structs! {
    pub RegisterBlock {
        (0x00 => _reserved0),
        /// Watchdog Timer Control Register
        (0x0C => pub ctl: ReadWrite<u16, WDTCTL::Register>),
        (0x0E => @END),
    }
}

register_bitfields![u16,
    pub WDTCTL [
        /// Interval select
        WDTIS OFFSET(0) NUMBITS(3) [],
        /// Counter clear, reads as 0
        WDTCNTCL OFFSET(3) NUMBITS(1) [],
        /// Interval timer mode instead of watchdog mode
        WDTTMSEL OFFSET(4) NUMBITS(1) [],
        /// Clock source select
        WDTSSEL OFFSET(5) NUMBITS(2) [
            SMCLK = 0,
            ACLK = 1,
            VLOCLK = 2,
            BCLK = 3
        ],
        /// Stops the counter
        WDTHOLD OFFSET(7) NUMBITS(1) [],
        /// Password. Must be written as 0x5A, reads as 0x69.
        WDTPW OFFSET(8) NUMBITS(8) []
    ]
];
