//! AES256 accelerator registers
//!
//! See SLAU356, chapter 22. All registers are 16 bits wide.

use tock_registers::registers::{ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

register_structs! {
    pub RegisterBlock {
        /// Control Register 0
        (0x00 => pub ctl0: ReadWrite<u16, CTL0::Register>),
        /// Control Register 1
        (0x02 => pub ctl1: ReadWrite<u16, CTL1::Register>),
        /// Status Register
        (0x04 => pub stat: ReadWrite<u16, STAT::Register>),
        /// Key Register
        (0x06 => pub key: WriteOnly<u16>),
        /// Data In Register
        (0x08 => pub din: WriteOnly<u16>),
        /// Data Out Register
        (0x0A => pub dout: ReadWrite<u16>),
        /// XORed Data In Register, starts an operation
        (0x0C => pub xdin: WriteOnly<u16>),
        /// XORed Data In Register, doesn't start an operation
        (0x0E => pub xin: WriteOnly<u16>),
        (0x10 => @END),
    }
}

register_bitfields![u16,
    pub CTL0 [
        /// Operation
        OP OFFSET(0) NUMBITS(2) [
            Encrypt = 0,
            /// The provided key is the key used for encryption
            Decrypt = 1,
            /// Generate the first round key required for decryption
            GenerateDecryptKey = 2,
            /// The provided key is the first round key required for decryption
            DecryptWithRoundKey = 3
        ],
        /// Key length
        KL OFFSET(2) NUMBITS(2) [
            Bits128 = 0,
            Bits192 = 1,
            Bits256 = 2
        ],
        /// Cipher mode, only used with CMEN set
        CM OFFSET(5) NUMBITS(2) [
            ECB = 0,
            CBC = 1,
            OFB = 2,
            CFB = 3
        ],
        /// Software reset, always reads as 0
        SWRST OFFSET(7) NUMBITS(1) [],
        /// Ready interrupt flag
        RDYIFG OFFSET(8) NUMBITS(1) [],
        /// Error flag
        ERRFG OFFSET(11) NUMBITS(1) [],
        /// Ready interrupt enable
        RDYIE OFFSET(12) NUMBITS(1) [],
        /// Cipher mode enable, hands the data path over to the DMA triggers
        CMEN OFFSET(15) NUMBITS(1) []
    ],
    pub CTL1 [
        /// Number of blocks to process in cipher mode
        BLKCNT OFFSET(0) NUMBITS(8) []
    ],
    pub STAT [
        BUSY OFFSET(0) NUMBITS(1) [],
        /// All 16 bytes of the key were written. Setting it by software marks
        /// a generated first round key as valid.
        KEYWR OFFSET(1) NUMBITS(1) [],
        /// All 16 bytes of input were written. Setting it by software starts
        /// an operation with the current state.
        DINWR OFFSET(2) NUMBITS(1) [],
        /// All 16 bytes were read from DOUT
        DOUTRD OFFSET(3) NUMBITS(1) [],
        KEYCNT OFFSET(4) NUMBITS(4) [],
        DINCNT OFFSET(8) NUMBITS(4) [],
        DOUTCNT OFFSET(12) NUMBITS(4) []
    ]
];
