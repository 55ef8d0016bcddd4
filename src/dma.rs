//! Interface to the µDMA controller
//!
//! See MSP432P4xx Technical Reference Manual, chapter 11.
//!
//! The controller doesn't hold the channel configuration in registers. It
//! reads a control table from SRAM instead, which the user provides as a
//! `static` [`ControlTable`] when creating the [`DMA`] instance.


use core::{
    fmt,
    mem,
    ops::Deref,
    pin::Pin,
    sync::atomic::{
        compiler_fence,
        Ordering,
    }
};

use as_slice::AsSlice;
use tock_registers::{
    interfaces::{Readable, Writeable},
    registers::InMemoryRegister,
};

use crate::{
    aes,
    pac::{
        self,
        dma::{DMA_CFG, DMA_CTRL, DMA_INTn_SRCCFG},
    },
};


/// Number of channels on the MSP432P401
pub const CHANNELS: usize = 8;

/// Maximum number of transfers in a single basic cycle
pub const MAX_TRANSFERS: usize = 1024;


/// Entry point to the DMA API
pub struct DMA {
    /// Handle to the DMA peripheral
    pub handle: Handle,

    /// DMA channels
    pub channels: Channels
}

impl DMA {
    /// Create an instance of the DMA API
    ///
    /// Enables the controller and points it at `table`.
    pub fn new(dma: pac::DMA, table: &'static mut ControlTable) -> Self {
        dma.cfg.write(DMA_CFG::MASTEN::SET);
        dma.ctlbase.set(&*table as *const ControlTable as u32);

        Self {
            handle:   Handle { dma, table },
            channels: Channels::new(),
        }
    }
}


/// Handle to the DMA peripheral
pub struct Handle {
    dma:   pac::DMA,
    table: &'static mut ControlTable,
}

impl Handle {
    /// Maps the completion event of `channel` to one of the DMA interrupts
    ///
    /// The mapping stays in place until another channel is routed to the same
    /// line. Completion of unrouted channels is only flagged in
    /// `DMA_INT0_SRCFLG`.
    pub fn route_interrupt<C>(&mut self, line: InterruptLine, _channel: &C)
        where C: Channel
    {
        let srccfg = match line {
            InterruptLine::Int1 => &self.dma.int1_srccfg,
            InterruptLine::Int2 => &self.dma.int2_srccfg,
            InterruptLine::Int3 => &self.dma.int3_srccfg,
        };

        srccfg.write(
            DMA_INTn_SRCCFG::INT_SRC.val(C::NUMBER as u32)
                + DMA_INTn_SRCCFG::EN::SET
        );
    }
}


/// Disables a channel by number
///
/// Meant for interrupt handlers, which don't own the channel tokens. Only
/// writes the stateless `DMA_ENACLR` register, so it doesn't interfere with
/// the owner of the channel.
///
/// # Panics
///
/// Panics, if `number` is not a valid channel number.
pub fn disable_channel(number: usize) {
    assert!(number < CHANNELS);

    // Safe, as ENACLR is write-one-to-clear and only affects this channel.
    let dma = unsafe { &*pac::DMA::ptr() };
    dma.enaclr.set(1 << number);
}


/// Channel descriptors read by the controller
///
/// Holds the primary descriptors of all channels, followed by the alternate
/// ones. Only basic cycles are used, so the alternate half stays unused, but
/// the controller expects the full table.
#[repr(C, align(1024))]
pub struct ControlTable {
    descriptors: [Descriptor; 2 * CHANNELS],
}

impl ControlTable {
    /// Creates a table with all descriptors invalid
    pub const fn new() -> Self {
        const EMPTY: Descriptor = Descriptor::new();

        Self {
            descriptors: [EMPTY; 2 * CHANNELS],
        }
    }

    fn primary(&self, channel: usize) -> &Descriptor {
        &self.descriptors[channel]
    }
}


/// A single channel descriptor
#[repr(C)]
struct Descriptor {
    src_end: InMemoryRegister<u32>,
    dst_end: InMemoryRegister<u32>,
    control: InMemoryRegister<u32, DMA_CTRL::Register>,
    _unused: InMemoryRegister<u32>,
}

impl Descriptor {
    const fn new() -> Self {
        Self {
            src_end: InMemoryRegister::new(0),
            dst_end: InMemoryRegister::new(0),
            control: InMemoryRegister::new(0),
            _unused: InMemoryRegister::new(0),
        }
    }

    /// Sets up a basic cycle of `transfers` units from `src` to `dst`
    fn program(&self, src: u32, dst: u32, config: &Config, transfers: u16) {
        self.src_end.set(end_address(src, transfers, config.src_increment));
        self.dst_end.set(end_address(dst, transfers, config.dst_increment));
        self.control.set(config.control_word(transfers));
    }
}

/// The controller wants the address of the last unit, not the first one
fn end_address(start: u32, transfers: u16, increment: Increment) -> u32 {
    match increment.shift() {
        Some(shift) => start + ((transfers as u32 - 1) << shift),
        None        => start,
    }
}


/// Size of a single transfer unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    HalfWord,
    Word,
}

impl Width {
    fn bits(self) -> u32 {
        match self {
            Width::Byte     => 0,
            Width::HalfWord => 1,
            Width::Word     => 2,
        }
    }

    fn increment(self) -> Increment {
        match self {
            Width::Byte     => Increment::Byte,
            Width::HalfWord => Increment::HalfWord,
            Width::Word     => Increment::Word,
        }
    }
}


/// Address increment after each transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Increment {
    Byte,
    HalfWord,
    Word,
    /// Address stays fixed, as for a peripheral register
    None,
}

impl Increment {
    fn bits(self) -> u32 {
        match self {
            Increment::Byte     => 0,
            Increment::HalfWord => 1,
            Increment::Word     => 2,
            Increment::None     => 3,
        }
    }

    fn shift(self) -> Option<u32> {
        match self {
            Increment::None => None,
            other           => Some(other.bits()),
        }
    }
}


/// Number of transfers after which the controller rearbitrates the bus
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arbitration {
    Transfers1    = 0,
    Transfers2    = 1,
    Transfers4    = 2,
    Transfers8    = 3,
    Transfers16   = 4,
    Transfers32   = 5,
    Transfers64   = 6,
    Transfers128  = 7,
    Transfers256  = 8,
    Transfers512  = 9,
    Transfers1024 = 10,
}


/// The direction of the DMA transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    MemoryToPeripheral,
    PeripheralToMemory,
}


/// Channel configuration for a transfer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    direction:     Direction,
    width:         Width,
    src_increment: Increment,
    dst_increment: Increment,
    arbitration:   Arbitration,
}

impl Config {
    /// Reads consecutive memory into a fixed peripheral register
    pub fn memory_to_peripheral(width: Width) -> Self {
        Self {
            direction:     Direction::MemoryToPeripheral,
            width,
            src_increment: width.increment(),
            dst_increment: Increment::None,
            arbitration:   Arbitration::Transfers1,
        }
    }

    /// Reads a fixed peripheral register into consecutive memory
    pub fn peripheral_to_memory(width: Width) -> Self {
        Self {
            direction:     Direction::PeripheralToMemory,
            width,
            src_increment: Increment::None,
            dst_increment: width.increment(),
            arbitration:   Arbitration::Transfers1,
        }
    }

    pub fn src_increment(mut self, increment: Increment) -> Self {
        self.src_increment = increment;
        self
    }

    pub fn dst_increment(mut self, increment: Increment) -> Self {
        self.dst_increment = increment;
        self
    }

    pub fn arbitration(mut self, arbitration: Arbitration) -> Self {
        self.arbitration = arbitration;
        self
    }

    fn control_word(&self, transfers: u16) -> u32 {
        let control = DMA_CTRL::CYCLE_CTRL::Basic
            + DMA_CTRL::N_MINUS_1.val(transfers as u32 - 1)
            + DMA_CTRL::R_POWER.val(self.arbitration as u32)
            + DMA_CTRL::SRC_SIZE.val(self.width.bits())
            + DMA_CTRL::SRC_INC.val(self.src_increment.bits())
            + DMA_CTRL::DST_SIZE.val(self.width.bits())
            + DMA_CTRL::DST_INC.val(self.dst_increment.bits());

        control.value
    }
}


/// A DMA transfer on channel `C`, moving `B` to or from target `T`
pub struct Transfer<T, C, B, State> {
    res:    TransferResources<T, C, B>,
    _state: State,
}

impl<T, C, B> Transfer<T, C, B, Ready>
    where
        T: Target<C>,
        C: Channel,
{
    /// Internal constructor
    ///
    /// # Safety
    ///
    /// If this is used to prepare a memory-to-peripheral transfer, the caller
    /// must make sure that the buffer can be read from safely.
    ///
    /// If this is used to prepare a peripheral-to-memory transfer, the caller
    /// must make sure that the buffer can be written to safely.
    ///
    /// # Panics
    ///
    /// Panics, if the buffer is empty or longer than [`MAX_TRANSFERS`].
    ///
    /// Panics, if the buffer is not aligned to the word size, or if the word
    /// size doesn't match `config`.
    pub(crate) unsafe fn new<Word>(
        handle:   &mut Handle,
        target:   T,
        channel:  C,
        buffer:   Pin<B>,
        address:  u32,
        config:   Config,
        priority: Priority,
    )
        -> Self
        where
            B:         Deref,
            B::Target: Buffer<Word>,
            Word:      SupportedWordSize,
    {
        assert!(buffer.len() > 0);
        assert!(buffer.len() <= MAX_TRANSFERS);
        assert_eq!(buffer.as_ptr().align_offset(mem::size_of::<Word>()), 0);
        assert_eq!(config.width, Word::width());

        let memory = buffer.as_ptr() as u32;
        let (src, dst) = match config.direction {
            Direction::MemoryToPeripheral => (memory, address),
            Direction::PeripheralToMemory => (address, memory),
        };

        channel.select_target(handle, &target);
        channel.configure(handle, priority);
        handle.table
            .primary(C::NUMBER)
            .program(src, dst, &config, buffer.len() as u16);

        Transfer {
            res: TransferResources {
                target,
                channel,
                buffer,
            },
            _state: Ready,
        }
    }

    /// Start the DMA transfer
    ///
    /// Consumes this instance of `Transfer` and returns a new one, with its
    /// state changes to indicate that the transfer has been started.
    ///
    /// The channel is armed, but nothing moves until the target raises its
    /// trigger.
    pub fn start(self) -> Transfer<T, C, B, Started> {
        compiler_fence(Ordering::SeqCst);

        self.res.channel.start();

        Transfer {
            res:    self.res,
            _state: Started,
        }
    }
}

impl<T, C, B> Transfer<T, C, B, Started>
    where C: Channel
{
    /// Indicates whether the transfer is still ongoing
    ///
    /// The controller clears the enable bit when the cycle completes, as does
    /// [`disable_channel`].
    pub fn is_active(&self) -> bool {
        self.res.channel.is_active()
    }

    /// Waits for the transfer to finish and returns the owned resources
    ///
    /// This function will busily wait until the transfer is finished. If you
    /// don't want this, please call this function only once you know that the
    /// transfer has finished.
    ///
    /// This function will return immediately, if [`Transfer::is_active`]
    /// returns `false`.
    pub fn wait(self)
        -> Result<
            TransferResources<T, C, B>,
            (TransferResources<T, C, B>, Error)
        >
    {
        while self.is_active() {
            if self.res.channel.error_occured() {
                return Err((self.res, Error));
            }
        }

        compiler_fence(Ordering::SeqCst);

        if self.res.channel.error_occured() {
            return Err((self.res, Error));
        }

        Ok(self.res)
    }
}


/// The resources owned by a transfer, returned once it has finished
pub struct TransferResources<T, C, B> {
    pub target:  T,
    pub channel: C,
    pub buffer:  Pin<B>,
}

// Since `TransferResources` is used in the error variant of a `Result`, it
// needs to implement `Debug` for methods like `unwrap` to work. We can't just
// derive `Debug`, without requiring all type parameters to be `Debug`, which
// seems to restrictive.
impl<T, C, B> fmt::Debug for TransferResources<T, C, B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "TransferResources {{ ... }}")
    }
}


/// The priority of the DMA transfer
///
/// The controller only knows two levels. Within a level, lower channel
/// numbers win.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Priority(bool);

impl Priority {
    pub fn high() -> Self {
        Self(true)
    }
}


/// DMA interrupts that a channel's completion can be routed to
///
/// `DMA_INT0` is shared by all channels that aren't routed elsewhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterruptLine {
    Int1,
    Int2,
    Int3,
}

impl InterruptLine {
    /// The NVIC interrupt this line raises
    pub fn interrupt(self) -> pac::Interrupt {
        match self {
            InterruptLine::Int1 => pac::Interrupt::DMA_INT1,
            InterruptLine::Int2 => pac::Interrupt::DMA_INT2,
            InterruptLine::Int3 => pac::Interrupt::DMA_INT3,
        }
    }
}


/// A bus error occurred
///
/// The controller has a single error flag for all channels, so the error is
/// reported to whichever transfer checks first.
#[derive(Debug)]
pub struct Error;


/// Implemented for the channel tokens in [`Channels`]
pub trait Channel: Sized {
    /// Channel number
    const NUMBER: usize;

    fn mask() -> u32 {
        1 << Self::NUMBER
    }

    fn select_target<T: Target<Self>>(&self, handle: &mut Handle, _target: &T) {
        handle.dma.ch_srccfg[Self::NUMBER].set(T::SOURCE);
    }

    fn configure(&self, handle: &mut Handle, priority: Priority) {
        let dma = &handle.dma;

        // Use the primary descriptor
        dma.altclr.set(Self::mask());
        // Accept single and burst requests
        dma.useburstclr.set(Self::mask());
        // Don't ignore the peripheral's requests
        dma.reqmaskclr.set(Self::mask());

        if priority.0 {
            dma.prioset.set(Self::mask());
        }
        else {
            dma.prioclr.set(Self::mask());
        }

        // Completion flag of a previous transfer
        dma.int0_clrflg.set(Self::mask());
    }

    fn start(&self) {
        // Safe, because ENASET is write-one-to-set and we only touch the bit
        // of this channel.
        let dma = unsafe { &*pac::DMA::ptr() };
        dma.enaset.set(Self::mask());
    }

    fn is_active(&self) -> bool {
        // Safe, as we only do one atomic read.
        let dma = unsafe { &*pac::DMA::ptr() };
        dma.enaset.get() & Self::mask() != 0
    }

    fn error_occured(&self) -> bool {
        // This is safe, for the following reasons:
        // - We only do one atomic read of ERRCLR.
        // - Clearing the flag is a single atomic write.
        let dma = unsafe { &*pac::DMA::ptr() };

        if dma.errclr.get() & 0x1 != 0 {
            dma.errclr.set(0x1);
            true
        }
        else {
            false
        }
    }
}

macro_rules! impl_channel {
    (
        $(
            $channel:ident,
            $field:ident,
            $number:expr;
        )*
    ) => {
        pub struct Channels {
            $(pub $field: $channel,)*
        }

        impl Channels {
            fn new() -> Self {
                Self {
                    $($field: $channel(()),)*
                }
            }
        }

        $(
            pub struct $channel(());

            impl Channel for $channel {
                const NUMBER: usize = $number;
            }
        )*
    }
}

impl_channel!(
    Channel0, channel0, 0;
    Channel1, channel1, 1;
    Channel2, channel2, 2;
    Channel3, channel3, 3;
    Channel4, channel4, 4;
    Channel5, channel5, 5;
    Channel6, channel6, 6;
    Channel7, channel7, 7;
);


pub trait Target<Channel> {
    /// Value for `DMA_CHn_SRCCFG`, selecting the trigger source
    const SOURCE: u32;
}

macro_rules! impl_target {
    ($($target:ty, $channel:ty, $source:expr;)*) => {
        $(
            impl Target<$channel> for $target {
                const SOURCE: u32 = $source;
            }
        )*
    }
}

// See MSP432P401R datasheet, table 6-35.
impl_target!(
    aes::XorIn,     Channel0, 7;
    aes::DataOut,   Channel1, 7;
    aes::XorDataIn, Channel2, 7;
);


/// Indicates that a DMA transfer is ready
pub struct Ready;

/// Indicates that a DMA transfer has been started
pub struct Started;


/// Implemented for types, that can be used as a buffer for DMA transfers
pub(crate) trait Buffer<Word> {
    fn as_ptr(&self) -> *const Word;
    fn len(&self) -> usize;
}

impl<T, Word> Buffer<Word> for T
    where T: ?Sized + AsSlice<Element=Word>
{
    fn as_ptr(&self) -> *const Word {
        self.as_slice().as_ptr()
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}


pub trait SupportedWordSize {
    fn width() -> Width;
}

impl SupportedWordSize for u8 {
    fn width() -> Width {
        Width::Byte
    }
}

impl SupportedWordSize for u16 {
    fn width() -> Width {
        Width::HalfWord
    }
}

impl SupportedWordSize for u32 {
    fn width() -> Width {
        Width::Word
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_word_for_aes_input() {
        let config = Config::memory_to_peripheral(Width::HalfWord);

        // UDMA_SIZE_16 | UDMA_SRC_INC_16 | UDMA_DST_INC_NONE | UDMA_ARB_1,
        // basic mode, 8 transfers
        assert_eq!(config.control_word(8), 0xD500_0071);
    }

    #[test]
    fn control_word_for_aes_output() {
        let config = Config::peripheral_to_memory(Width::HalfWord);

        assert_eq!(config.control_word(8), 0x5D00_0071);
    }

    #[test]
    fn control_word_fields() {
        let config = Config::memory_to_peripheral(Width::Word)
            .arbitration(Arbitration::Transfers1024);
        let control: InMemoryRegister<u32, DMA_CTRL::Register> =
            InMemoryRegister::new(config.control_word(MAX_TRANSFERS as u16));

        assert!(control.matches_all(DMA_CTRL::CYCLE_CTRL::Basic));
        assert_eq!(control.read(DMA_CTRL::N_MINUS_1), 1023);
        assert_eq!(control.read(DMA_CTRL::R_POWER), 10);
        assert_eq!(control.read(DMA_CTRL::SRC_SIZE), 2);
        assert_eq!(control.read(DMA_CTRL::DST_SIZE), 2);
        assert_eq!(control.read(DMA_CTRL::SRC_INC), 2);
        assert_eq!(control.read(DMA_CTRL::DST_INC), 3);
        assert_eq!(control.read(DMA_CTRL::NEXT_USEBURST), 0);
    }

    #[test]
    fn builder_overrides_increments() {
        let config = Config::memory_to_peripheral(Width::Byte)
            .src_increment(Increment::None)
            .dst_increment(Increment::Byte);

        assert_eq!(config.src_increment, Increment::None);
        assert_eq!(config.dst_increment, Increment::Byte);
        assert_eq!(config.direction, Direction::MemoryToPeripheral);
    }

    #[test]
    fn end_addresses() {
        assert_eq!(end_address(0x2000_0000, 8, Increment::HalfWord), 0x2000_000E);
        assert_eq!(end_address(0x2000_0000, 8, Increment::Word), 0x2000_001C);
        assert_eq!(end_address(0x2000_0001, 4, Increment::Byte), 0x2000_0004);
        assert_eq!(end_address(0x4000_3C0E, 8, Increment::None), 0x4000_3C0E);
        assert_eq!(end_address(0x2000_0100, 1, Increment::HalfWord), 0x2000_0100);
    }

    #[test]
    fn program_primary_descriptor() {
        let table = ControlTable::new();
        let config = Config::peripheral_to_memory(Width::HalfWord);

        table.primary(1).program(0x4000_3C0A, 0x2000_0040, &config, 8);

        let descriptor = table.primary(1);
        assert_eq!(descriptor.src_end.get(), 0x4000_3C0A);
        assert_eq!(descriptor.dst_end.get(), 0x2000_004E);
        assert_eq!(descriptor.control.get(), 0x5D00_0071);

        // Other descriptors stay invalid
        assert_eq!(table.primary(0).control.get(), 0);
        assert_eq!(table.descriptors[9].control.get(), 0);
    }

    #[test]
    fn control_table_layout() {
        assert_eq!(mem::size_of::<Descriptor>(), 16);
        assert_eq!(mem::size_of::<ControlTable>(), 1024);
        assert_eq!(mem::align_of::<ControlTable>(), 1024);

        let table = ControlTable::new();
        let base = &table as *const ControlTable as usize;
        let alternate = &table.descriptors[CHANNELS] as *const Descriptor as usize;
        assert_eq!(alternate - base, 0x80);
    }

    #[test]
    fn channel_numbers() {
        assert_eq!(Channel0::NUMBER, 0);
        assert_eq!(Channel2::mask(), 0b100);
        assert_eq!(Channel7::mask(), 0x80);
    }

    #[test]
    fn aes_trigger_sources() {
        assert_eq!(<aes::XorIn as Target<Channel0>>::SOURCE, 7);
        assert_eq!(<aes::DataOut as Target<Channel1>>::SOURCE, 7);
        assert_eq!(<aes::XorDataIn as Target<Channel2>>::SOURCE, 7);
    }

    #[test]
    fn interrupt_lines() {
        assert_eq!(InterruptLine::Int1.interrupt(), pac::Interrupt::DMA_INT1);
        assert_eq!(InterruptLine::Int3.interrupt(), pac::Interrupt::DMA_INT3);
    }

    #[test]
    fn output_buffer_is_reused_as_input() {
        static mut BUFFER: [u16; 8] = [0; 8];

        let buffer: &'static mut [u16; 8] =
            unsafe { &mut *core::ptr::addr_of_mut!(BUFFER) };
        let res = TransferResources {
            target:  (),
            channel: Channel1(()),
            buffer:  Pin::new(buffer),
        };

        let output: &'static mut [u16; 8] = Pin::into_inner(res.buffer);
        output[7] = 0xabcd;
        let input: &'static [u16; 8] = output;

        let xin = Pin::new(input);
        let xdin = Pin::new(input);
        assert_eq!(Buffer::<u16>::len(&*xin), 8);
        assert_eq!(Buffer::<u16>::as_ptr(&*xin), Buffer::<u16>::as_ptr(&*xdin));
        assert_eq!(xdin[7], 0xabcd);
    }

    #[test]
    fn word_sizes() {
        assert_eq!(u8::width(), Width::Byte);
        assert_eq!(u16::width(), Width::HalfWord);
        assert_eq!(u32::width(), Width::Word);
    }
}
