//! AES-256 round trip in OFB mode, with all data moved by the DMA
//!
//! Encrypts one block, decrypts it again and compares the result with the
//! plaintext. Ends at a breakpoint, so the buffers can be inspected in the
//! debugger. Build with the `debug` feature to see the blocks on the host.


#![no_main]
#![no_std]


extern crate panic_semihosting;


use core::{
    convert::TryFrom,
    pin::Pin,
    sync::atomic::{AtomicBool, Ordering},
};

use cortex_m::peripheral::NVIC;
use cortex_m_rt::{entry, exception};
use msp432p4xx_hal::{
    prelude::*,
    aes::{self, Block, HalfWords, Key, Mode, AES},
    debug,
    dma::{self, ControlTable, InterruptLine, DMA},
    pac::{self, Interrupt},
    println,
};


const PLAINTEXT: Block = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
    0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
];

const KEY: [u8; 32] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07,
    0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f,
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17,
    0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f,
];

const INIT_VECTOR: Block = [0x11; 16];

static DATA: HalfWords = aes::pack(&PLAINTEXT);

/// Set by the DMA_INT1 handler once the output channel is done
static FINISHED: AtomicBool = AtomicBool::new(false);


#[entry]
fn main() -> ! {
    static mut CONTROL_TABLE: ControlTable = ControlTable::new();
    static mut CIPHERTEXT: HalfWords = [0; 8];
    static mut RECOVERED: HalfWords = [0; 8];

    debug::init();

    let dp = pac::Peripherals::take().unwrap();

    let mut watchdog = dp.WDT_A.watchdog();
    watchdog.hold();
    cortex_m::interrupt::disable();

    let mut aes = AES::new(dp.AES256);
    let mut dma = DMA::new(dp.DMA, CONTROL_TABLE);
    let key = Key::new(KEY);

    let data = Pin::new(&DATA);

    dma.handle
        .route_interrupt(InterruptLine::Int1, &dma.channels.channel1);
    // Safe, as the handler only touches the channels it disables and an
    // atomic flag.
    unsafe {
        NVIC::unmask(InterruptLine::Int1.interrupt());
        cortex_m::interrupt::enable();
    }

    // Encrypt
    let mut stream = aes.enable(<dyn Mode>::ofb_encrypt(INIT_VECTOR), &key);

    let xin = stream.xin
        .write_all(&mut dma.handle, data, dma.channels.channel0);
    let dout = stream.dout
        .read_all(
            &mut dma.handle,
            Pin::new(CIPHERTEXT),
            dma.channels.channel1,
        );
    let xdin = stream.xdin
        .write_all(&mut dma.handle, data, dma.channels.channel2);

    let xdin = xdin.start();
    let xin  = xin.start();
    let dout = dout.start();
    stream.control.start(1).unwrap();

    while !FINISHED.load(Ordering::Acquire) {}
    FINISHED.store(false, Ordering::Release);

    let xin_res  = xin.wait().unwrap();
    let dout_res = dout.wait().unwrap();
    let xdin_res = xdin.wait().unwrap();

    stream.xin            = xin_res.target;
    stream.dout           = dout_res.target;
    stream.xdin           = xdin_res.target;
    dma.channels.channel0 = xin_res.channel;
    dma.channels.channel1 = dout_res.channel;
    dma.channels.channel2 = xdin_res.channel;
    aes                   = stream.disable();

    let ciphertext: &'static mut HalfWords = Pin::into_inner(dout_res.buffer);
    let ciphertext: &'static HalfWords = ciphertext;
    assert_ne!(ciphertext, &DATA);

    // Decrypt
    let mut stream = aes.enable(<dyn Mode>::ofb_decrypt(INIT_VECTOR), &key);

    let xin = stream.xin
        .write_all(
            &mut dma.handle,
            Pin::new(ciphertext),
            dma.channels.channel0,
        );
    let dout = stream.dout
        .read_all(
            &mut dma.handle,
            Pin::new(RECOVERED),
            dma.channels.channel1,
        );
    let xdin = stream.xdin
        .write_all(
            &mut dma.handle,
            Pin::new(ciphertext),
            dma.channels.channel2,
        );

    let xdin = xdin.start();
    let xin  = xin.start();
    let dout = dout.start();
    stream.control.start(1).unwrap();

    while !FINISHED.load(Ordering::Acquire) {}
    FINISHED.store(false, Ordering::Release);

    xin.wait().unwrap();
    xdin.wait().unwrap();
    let dout_res = dout.wait().unwrap();

    let recovered = aes::unpack(&dout_res.buffer);

    println!("plaintext:  {:02x?}", PLAINTEXT);
    println!("ciphertext: {:02x?}", aes::unpack(ciphertext));
    println!("recovered:  {:02x?}", recovered);

    assert_eq!(recovered, PLAINTEXT);

    cortex_m::asm::bkpt();

    loop {}
}


#[exception]
unsafe fn DefaultHandler(irqn: i16) {
    match Interrupt::try_from(irqn) {
        Ok(Interrupt::DMA_INT1) => {
            dma::disable_channel(0);
            dma::disable_channel(1);
            dma::disable_channel(2);

            FINISHED.store(true, Ordering::Release);
        }
        other => panic!("Unexpected interrupt: {:?}", other),
    }
}
