#![no_std]
#![no_main]

mod board;
mod tasks;
mod usb;

use core::fmt::Write;

use cortex_m_rt::entry;
use embassy_executor::InterruptExecutor;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_time::{block_for, Duration};
use {defmt_rtt as _, panic_probe as _};

use quadrature_sim::console::Console;
use quadrature_sim::controller::Controller;
use quadrature_sim::display::write_help;
use quadrature_sim::drivers::quadrature::PulseEngine;
use quadrature_sim::drivers::sync_gate::SyncGate;
use quadrature_sim::link::ConfigChannel;

use crate::board::{Board, QuadPort};
use crate::tasks::console_task::PipeIo;

// ── Shared state ──────────────────────────────────────────────────────────────
static PULSE_ENGINE: PulseEngine = PulseEngine::new(board::CHANNEL_PINS);
static CONFIG_CHAN: ConfigChannel = ConfigChannel::new();
static SYNC_GATE: SyncGate = SyncGate::new();

// ── Executors ─────────────────────────────────────────────────────────────────
//  Pulse side: snapshot consumer, just below the tick interrupt.
//  Control side: USB device and console bridge, below the gate interrupt.
//  The command loop itself runs in thread mode.
static EXECUTOR_PULSE: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_CONSOLE: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
fn TIM2() {
    board::ack_tick_timer();
    PULSE_ENGINE.on_tick(&mut QuadPort);
}

#[interrupt]
fn TIM3() {
    board::ack_gate_timer();
    if let Some(on) = SYNC_GATE.on_tick() {
        board::set_led(on);
    }
}

#[interrupt]
unsafe fn UART5() {
    EXECUTOR_PULSE.on_interrupt()
}

#[interrupt]
unsafe fn UART4() {
    EXECUTOR_CONSOLE.on_interrupt()
}

#[entry]
fn main() -> ! {
    // 1. Board init (168 MHz PLL)
    let board = Board::init();
    let p = board.p;

    // 2. Sensor lines and heartbeat LED
    board::init_outputs(p.PA0, p.PA1, p.PA3, p.PA4, p.PC13);

    // 3. Pulse side consumer
    interrupt::UART5.set_priority(Priority::P1);
    let spawner = EXECUTOR_PULSE.start(interrupt::UART5);
    spawner.spawn(tasks::pulse_task::pulse_task(&CONFIG_CHAN, &PULSE_ENGINE)).unwrap();

    // 4. USB CDC-ACM console
    let (usb_dev, usb_serial) = usb::init(p.USB_OTG_FS, p.PA12, p.PA11);
    interrupt::OTG_FS.set_priority(Priority::P3);
    interrupt::UART4.set_priority(Priority::P4);
    let spawner = EXECUTOR_CONSOLE.start(interrupt::UART4);
    spawner.spawn(usb::usb_task(usb_dev)).unwrap();
    spawner.spawn(tasks::console_task::console_task(usb_serial)).unwrap();

    // 5. Timebases: 1 MHz pulse tick, 100 ms gate
    board::start_tick_timer();
    board::start_gate_timer();
    defmt::info!("timers running");

    // 6. Give the host time to enumerate the serial port
    block_for(Duration::from_secs(4));

    let mut console = Console::new(PipeIo);
    let _ = writeln!(console, "Speed sensor simulator");
    let _ = writeln!(console, "Hardware clock: {} Hz", board::SYSCLK_HZ);
    let _ = write_help(&mut console, false);

    let mut controller = Controller::new(&CONFIG_CHAN, SYNC_GATE.slot(0));
    controller.start(&mut console);

    // 7. Command loop
    loop {
        let _ = console.write_str(">");
        let line = console.read_line();
        let _ = console.write_str("\n");
        let outcome = controller.handle_line(line.trim(), &mut console);
        defmt::debug!("command {}", outcome);
    }
}
