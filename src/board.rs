use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::interrupt::{self, InterruptExt, Priority};
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::regs::Bsrr;
use embassy_stm32::peripherals::{PA0, PA1, PA3, PA4, PC13};
use embassy_stm32::rcc::*;
use embassy_stm32::time::Hertz as TimeHertz;
use embassy_stm32::Config;

use quadrature_sim::drivers::quadrature::{ChannelPins, QuadratureOutput};
use quadrature_sim::drivers::sync_gate::GATE_PERIOD_MS;
use quadrature_sim::drivers::units::TICK_HZ;

pub const SYSCLK_HZ: u32 = 168_000_000;
/// APB1 timers run at twice the 42 MHz bus clock.
const APB1_TIMER_HZ: u32 = 84_000_000;

// ── Pin map (GPIOA) ───────────────────────────────────────────────────────────
pub const CHANNEL_PINS: [ChannelPins; 2] = [
    ChannelPins::new(1, 0), // sensor 1: A = PA1, B = PA0
    ChannelPins::new(4, 3), // sensor 2: A = PA4, B = PA3
];

pub struct Board {
    pub p: embassy_stm32::Peripherals,
}

impl Board {
    pub fn init() -> Self {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: TimeHertz(8_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL168,
            divp: Some(PllPDiv::DIV2), // 168 MHz
            divq: Some(PllQDiv::DIV7), // 48 MHz for USB
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;

        let p = embassy_stm32::init(config);

        Self { p }
    }
}

/// Configures the four sensor lines low and the LED off. The `Output`
/// drivers are forgotten so the pins keep their mode; from here on they are
/// only driven through BSRR.
pub fn init_outputs(pa0: PA0, pa1: PA1, pa3: PA3, pa4: PA4, pc13: PC13) {
    core::mem::forget(Output::new(pa0, Level::Low, Speed::VeryHigh));
    core::mem::forget(Output::new(pa1, Level::Low, Speed::VeryHigh));
    core::mem::forget(Output::new(pa3, Level::Low, Speed::VeryHigh));
    core::mem::forget(Output::new(pa4, Level::Low, Speed::VeryHigh));
    // LED is active low
    core::mem::forget(Output::new(pc13, Level::High, Speed::Low));
}

/// GPIOA as seen by the pulse engine.
pub struct QuadPort;

impl QuadratureOutput for QuadPort {
    #[inline(always)]
    fn write_masked(&mut self, mask: u16, levels: u16) {
        let set = u32::from(levels & mask);
        let reset = u32::from(!levels & mask);
        // set and reset in one store, other lines untouched
        pac::GPIOA.bsrr().write_value(Bsrr(set | (reset << 16)));
    }
}

pub fn set_led(on: bool) {
    pac::GPIOC.bsrr().write(|w| {
        if on {
            w.set_br(13, true);
        } else {
            w.set_bs(13, true);
        }
    });
}

// ── Timers ────────────────────────────────────────────────────────────────────

/// TIM2 update interrupt at `TICK_HZ`, highest priority.
pub fn start_tick_timer() {
    pac::RCC.apb1enr().modify(|w| w.set_tim2en(true));
    let tim = pac::TIM2;
    tim.psc().write_value(0);
    tim.arr().write_value(APB1_TIMER_HZ / TICK_HZ as u32 - 1);
    tim.egr().write(|w| w.set_ug(true));
    tim.sr().modify(|w| w.set_uif(false));
    tim.dier().modify(|w| w.set_uie(true));
    tim.cr1().modify(|w| w.set_cen(true));
    interrupt::TIM2.set_priority(Priority::P0);
    unsafe { interrupt::TIM2.enable() };
}

/// TIM3 update interrupt every `GATE_PERIOD_MS`.
pub fn start_gate_timer() {
    pac::RCC.apb1enr().modify(|w| w.set_tim3en(true));
    let tim = pac::TIM3;
    // 10 kHz count
    tim.psc().write_value((APB1_TIMER_HZ / 10_000 - 1) as u16);
    tim.arr().write_value((GATE_PERIOD_MS * 10 - 1) as u16);
    tim.egr().write(|w| w.set_ug(true));
    tim.sr().modify(|w| w.set_uif(false));
    tim.dier().modify(|w| w.set_uie(true));
    tim.cr1().modify(|w| w.set_cen(true));
    interrupt::TIM3.set_priority(Priority::P2);
    unsafe { interrupt::TIM3.enable() };
}

/// Acknowledges a TIM2 update, called first thing in its handler.
#[inline(always)]
pub fn ack_tick_timer() {
    pac::TIM2.sr().modify(|w| w.set_uif(false));
}

pub fn ack_gate_timer() {
    pac::TIM3.sr().modify(|w| w.set_uif(false));
}
