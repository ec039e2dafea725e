use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_executor::task;
use embassy_futures::select::select;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_usb::class::cdc_acm::{Receiver, Sender};
use embassy_usb::driver::EndpointError;

use quadrature_sim::console::ByteIo;

use crate::usb::{UsbDriver, UsbSerial, MAX_PACKET_SIZE};

const PACKET: usize = MAX_PACKET_SIZE as usize;

// ── Console pipes ─────────────────────────────────────────────────────────────
//  Host -> foreground and foreground -> host. The foreground side never
//  awaits; it polls through `PipeIo`.
static CONSOLE_RX: Pipe<CriticalSectionRawMutex, 256> = Pipe::new();
static CONSOLE_TX: Pipe<CriticalSectionRawMutex, 1024> = Pipe::new();

/// Cleared while no terminal is attached, so output is dropped instead of
/// stalling the foreground.
static USB_CONNECTED: AtomicBool = AtomicBool::new(false);

/// Bridges the CDC-ACM endpoints to the console pipes.
#[task]
pub async fn console_task(class: UsbSerial) -> ! {
    let (mut tx, mut rx) = class.split();
    loop {
        rx.wait_connection().await;
        defmt::info!("console connected");
        USB_CONNECTED.store(true, Ordering::Release);
        let _ = select(host_to_pipe(&mut rx), pipe_to_host(&mut tx)).await;
        USB_CONNECTED.store(false, Ordering::Release);
        CONSOLE_TX.clear();
        defmt::info!("console disconnected");
    }
}

async fn host_to_pipe(rx: &mut Receiver<'static, UsbDriver>) -> Result<(), EndpointError> {
    let mut buf = [0u8; PACKET];
    loop {
        let n = rx.read_packet(&mut buf).await?;
        CONSOLE_RX.write_all(&buf[..n]).await;
    }
}

async fn pipe_to_host(tx: &mut Sender<'static, UsbDriver>) -> Result<(), EndpointError> {
    let mut buf = [0u8; PACKET];
    loop {
        let n = CONSOLE_TX.read(&mut buf).await;
        tx.write_packet(&buf[..n]).await?;
        // a full packet with nothing behind it needs a ZLP to end the transfer
        if n == PACKET && CONSOLE_TX.is_empty() {
            tx.write_packet(&[]).await?;
        }
    }
}

/// Foreground end of the console pipes.
pub struct PipeIo;

impl ByteIo for PipeIo {
    fn try_read(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        match CONSOLE_RX.try_read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn write_bytes(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            if !USB_CONNECTED.load(Ordering::Acquire) {
                return;
            }
            match CONSOLE_TX.try_write(bytes) {
                Ok(n) => bytes = &bytes[n..],
                Err(_) => spin_loop(),
            }
        }
    }
}
