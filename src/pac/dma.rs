//! µDMA controller registers
//!
//! The controller is an ARM PL230. Channel descriptors are not registers but
//! live in a control table in SRAM, see `DMA_CTRL`.

use tock_registers::registers::{ReadOnly, ReadWrite, WriteOnly};
use tock_registers::{register_bitfields, register_structs};

register_structs! {
    pub RegisterBlock {
        /// Device Configuration Status
        (0x0000 => pub device_cfg: ReadOnly<u32, DMA_DEVICE_CFG::Register>),
        /// Software Channel Trigger Register
        (0x0004 => pub sw_chtrig: ReadWrite<u32>),
        (0x0008 => _reserved0),
        /// Channel n Source Configuration Registers
        (0x0010 => pub ch_srccfg: [ReadWrite<u32>; 32]),
        (0x0090 => _reserved1),
        /// Interrupt 1 Source Channel Configuration
        (0x0100 => pub int1_srccfg: ReadWrite<u32, DMA_INTn_SRCCFG::Register>),
        /// Interrupt 2 Source Channel Configuration
        (0x0104 => pub int2_srccfg: ReadWrite<u32, DMA_INTn_SRCCFG::Register>),
        /// Interrupt 3 Source Channel Configuration
        (0x0108 => pub int3_srccfg: ReadWrite<u32, DMA_INTn_SRCCFG::Register>),
        (0x010C => _reserved2),
        /// Interrupt 0 Source Channel Flag Register
        (0x0110 => pub int0_srcflg: ReadOnly<u32>),
        /// Interrupt 0 Source Channel Clear Flag Register
        (0x0114 => pub int0_clrflg: WriteOnly<u32>),
        (0x0118 => _reserved3),
        /// Status Register
        (0x1000 => pub stat: ReadOnly<u32, DMA_STAT::Register>),
        /// Configuration Register
        (0x1004 => pub cfg: WriteOnly<u32, DMA_CFG::Register>),
        /// Channel Control Data Base Pointer Register
        (0x1008 => pub ctlbase: ReadWrite<u32>),
        /// Channel Alternate Control Data Base Pointer Register
        (0x100C => pub altbase: ReadOnly<u32>),
        /// Channel Wait on Request Status Register
        (0x1010 => pub waitstat: ReadOnly<u32>),
        /// Channel Software Request Register
        (0x1014 => pub wreq: WriteOnly<u32>),
        /// Channel Useburst Set Register
        (0x1018 => pub useburstset: ReadWrite<u32>),
        /// Channel Useburst Clear Register
        (0x101C => pub useburstclr: WriteOnly<u32>),
        /// Channel Request Mask Set Register
        (0x1020 => pub reqmaskset: ReadWrite<u32>),
        /// Channel Request Mask Clear Register
        (0x1024 => pub reqmaskclr: WriteOnly<u32>),
        /// Channel Enable Set Register
        (0x1028 => pub enaset: ReadWrite<u32>),
        /// Channel Enable Clear Register
        (0x102C => pub enaclr: WriteOnly<u32>),
        /// Channel Primary-Alternate Set Register
        (0x1030 => pub altset: ReadWrite<u32>),
        /// Channel Primary-Alternate Clear Register
        (0x1034 => pub altclr: WriteOnly<u32>),
        /// Channel Priority Set Register
        (0x1038 => pub prioset: ReadWrite<u32>),
        /// Channel Priority Clear Register
        (0x103C => pub prioclr: WriteOnly<u32>),
        (0x1040 => _reserved4),
        /// Bus Error Clear Register
        (0x104C => pub errclr: ReadWrite<u32>),
        (0x1050 => @END),
    }
}

register_bitfields![u32,
    pub DMA_DEVICE_CFG [
        NUM_DMA_CHANNELS OFFSET(0) NUMBITS(8) [],
        NUM_SRC_PER_CHANNEL OFFSET(8) NUMBITS(8) []
    ],
    pub DMA_INTn_SRCCFG [
        /// Channel whose completion event is mapped to this interrupt
        INT_SRC OFFSET(0) NUMBITS(5) [],
        EN OFFSET(5) NUMBITS(1) []
    ],
    pub DMA_STAT [
        MASTEN OFFSET(0) NUMBITS(1) [],
        /// Current state of the control state machine
        STATE OFFSET(4) NUMBITS(4) [
            Idle = 0,
            ReadingChannelControllerData = 1,
            ReadingSourceDataEndPointer = 2,
            ReadingDestinationDataEndPointer = 3,
            ReadingSourceData = 4,
            WritingDestinationData = 5,
            WaitingForRequestToClear = 6,
            WritingChannelControllerData = 7,
            Stalled = 8,
            Done = 9,
            PeripheralScatterGatherTransition = 10
        ],
        /// Number of available channels minus one
        DMACHANS OFFSET(16) NUMBITS(5) []
    ],
    pub DMA_CFG [
        MASTEN OFFSET(0) NUMBITS(1) [],
        CHPROTCTRL OFFSET(5) NUMBITS(3) []
    ]
];

register_bitfields![u32,
    /// Channel descriptor control word
    pub DMA_CTRL [
        CYCLE_CTRL OFFSET(0) NUMBITS(3) [
            /// The descriptor is invalid
            Stop = 0,
            Basic = 1,
            Auto = 2,
            PingPong = 3,
            MemoryScatterGatherPrimary = 4,
            MemoryScatterGatherAlternate = 5,
            PeripheralScatterGatherPrimary = 6,
            PeripheralScatterGatherAlternate = 7
        ],
        NEXT_USEBURST OFFSET(3) NUMBITS(1) [],
        /// Total number of transfers in the cycle, minus one
        N_MINUS_1 OFFSET(4) NUMBITS(10) [],
        /// The controller rearbitrates after 2^R_POWER transfers
        R_POWER OFFSET(14) NUMBITS(4) [],
        SRC_PROT_CTRL OFFSET(18) NUMBITS(3) [],
        DST_PROT_CTRL OFFSET(21) NUMBITS(3) [],
        SRC_SIZE OFFSET(24) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2
        ],
        SRC_INC OFFSET(26) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2,
            NoIncrement = 3
        ],
        /// Must match SRC_SIZE
        DST_SIZE OFFSET(28) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2
        ],
        DST_INC OFFSET(30) NUMBITS(2) [
            Byte = 0,
            HalfWord = 1,
            Word = 2,
            NoIncrement = 3
        ]
    ]
];
