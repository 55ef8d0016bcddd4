//! Register map and peripheral singletons for the MSP432P401
//!
//! Only the peripherals this crate drives are described. The layout follows
//! the MSP432P4xx technical reference manual (SLAU356).

#![allow(non_camel_case_types)]

use core::{convert::TryFrom, marker::PhantomData, ops::Deref};

pub mod aes256;
pub mod dma;
pub mod wdt_a;

macro_rules! peripheral {
    ($(#[$attr:meta])* $name:ident, $block:path, $address:expr) => {
        $(#[$attr])*
        pub struct $name {
            _marker: PhantomData<*const ()>,
        }

        unsafe impl Send for $name {}

        impl $name {
            /// Pointer to the register block
            pub const PTR: *const $block = $address as *const _;

            /// Return the pointer to the register block
            #[inline(always)]
            pub const fn ptr() -> *const $block {
                Self::PTR
            }
        }

        impl Deref for $name {
            type Target = $block;

            #[inline(always)]
            fn deref(&self) -> &Self::Target {
                unsafe { &*Self::PTR }
            }
        }
    };
}

peripheral!(
    /// AES256 accelerator
    AES256,
    aes256::RegisterBlock,
    0x4000_3C00
);
peripheral!(
    /// Micro direct memory access controller
    DMA,
    dma::RegisterBlock,
    0x4000_E000
);
peripheral!(
    /// Watchdog timer
    WDT_A,
    wdt_a::RegisterBlock,
    0x4000_4800
);

static mut DEVICE_PERIPHERALS: bool = false;

/// All the peripherals
#[allow(non_snake_case)]
pub struct Peripherals {
    pub AES256: AES256,
    pub DMA: DMA,
    pub WDT_A: WDT_A,
}

impl Peripherals {
    /// Returns all the peripherals *once*
    #[inline]
    pub fn take() -> Option<Self> {
        cortex_m::interrupt::free(|_| {
            if unsafe { DEVICE_PERIPHERALS } {
                None
            } else {
                Some(unsafe { Peripherals::steal() })
            }
        })
    }

    /// Unchecked version of `Peripherals::take`
    ///
    /// # Safety
    ///
    /// Each of the returned peripherals must be used at most once.
    #[inline]
    pub unsafe fn steal() -> Self {
        DEVICE_PERIPHERALS = true;

        Peripherals {
            AES256: AES256 {
                _marker: PhantomData,
            },
            DMA: DMA {
                _marker: PhantomData,
            },
            WDT_A: WDT_A {
                _marker: PhantomData,
            },
        }
    }
}

/// Enumeration of all the device interrupts
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Interrupt {
    PSS = 0,
    CS = 1,
    PCM = 2,
    WDT_A = 3,
    FPU = 4,
    FLCTL = 5,
    COMP_E0 = 6,
    COMP_E1 = 7,
    TA0_0 = 8,
    TA0_N = 9,
    TA1_0 = 10,
    TA1_N = 11,
    TA2_0 = 12,
    TA2_N = 13,
    TA3_0 = 14,
    TA3_N = 15,
    EUSCIA0 = 16,
    EUSCIA1 = 17,
    EUSCIA2 = 18,
    EUSCIA3 = 19,
    EUSCIB0 = 20,
    EUSCIB1 = 21,
    EUSCIB2 = 22,
    EUSCIB3 = 23,
    ADC14 = 24,
    T32_INT1 = 25,
    T32_INT2 = 26,
    T32_INTC = 27,
    AES256 = 28,
    RTC_C = 29,
    DMA_ERR = 30,
    DMA_INT3 = 31,
    DMA_INT2 = 32,
    DMA_INT1 = 33,
    DMA_INT0 = 34,
    PORT1 = 35,
    PORT2 = 36,
    PORT3 = 37,
    PORT4 = 38,
    PORT5 = 39,
    PORT6 = 40,
}

unsafe impl cortex_m::interrupt::InterruptNumber for Interrupt {
    #[inline(always)]
    fn number(self) -> u16 {
        self as u16
    }
}

/// Returned for IRQ numbers the device doesn't have
#[derive(Debug, PartialEq, Eq)]
pub struct UnknownInterrupt(pub i16);

impl TryFrom<i16> for Interrupt {
    type Error = UnknownInterrupt;

    fn try_from(irqn: i16) -> Result<Self, Self::Error> {
        let interrupt = match irqn {
            0 => Interrupt::PSS,
            1 => Interrupt::CS,
            2 => Interrupt::PCM,
            3 => Interrupt::WDT_A,
            4 => Interrupt::FPU,
            5 => Interrupt::FLCTL,
            6 => Interrupt::COMP_E0,
            7 => Interrupt::COMP_E1,
            8 => Interrupt::TA0_0,
            9 => Interrupt::TA0_N,
            10 => Interrupt::TA1_0,
            11 => Interrupt::TA1_N,
            12 => Interrupt::TA2_0,
            13 => Interrupt::TA2_N,
            14 => Interrupt::TA3_0,
            15 => Interrupt::TA3_N,
            16 => Interrupt::EUSCIA0,
            17 => Interrupt::EUSCIA1,
            18 => Interrupt::EUSCIA2,
            19 => Interrupt::EUSCIA3,
            20 => Interrupt::EUSCIB0,
            21 => Interrupt::EUSCIB1,
            22 => Interrupt::EUSCIB2,
            23 => Interrupt::EUSCIB3,
            24 => Interrupt::ADC14,
            25 => Interrupt::T32_INT1,
            26 => Interrupt::T32_INT2,
            27 => Interrupt::T32_INTC,
            28 => Interrupt::AES256,
            29 => Interrupt::RTC_C,
            30 => Interrupt::DMA_ERR,
            31 => Interrupt::DMA_INT3,
            32 => Interrupt::DMA_INT2,
            33 => Interrupt::DMA_INT1,
            34 => Interrupt::DMA_INT0,
            35 => Interrupt::PORT1,
            36 => Interrupt::PORT2,
            37 => Interrupt::PORT3,
            38 => Interrupt::PORT4,
            39 => Interrupt::PORT5,
            40 => Interrupt::PORT6,
            _ => return Err(UnknownInterrupt(irqn)),
        };

        Ok(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_m::interrupt::InterruptNumber;

    #[test]
    fn irq_numbers_round_trip() {
        for irqn in 0i16..=40 {
            let interrupt = Interrupt::try_from(irqn).unwrap();
            assert_eq!(interrupt.number(), irqn as u16);
        }
    }

    #[test]
    fn dma_completion_lines() {
        assert_eq!(Interrupt::try_from(33i16), Ok(Interrupt::DMA_INT1));
        assert_eq!(Interrupt::DMA_INT0.number(), 34);
        assert_eq!(Interrupt::DMA_ERR.number(), 30);
    }

    #[test]
    fn exceptions_and_unknown_irqs_are_rejected() {
        assert_eq!(Interrupt::try_from(-1i16), Err(UnknownInterrupt(-1)));
        assert_eq!(Interrupt::try_from(41i16), Err(UnknownInterrupt(41)));
    }
}
