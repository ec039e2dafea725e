//! Two-channel quadrature speed sensor simulator.
//!
//! The library holds everything that does not touch the board: the pulse
//! engine driven by the 1 MHz tick, the snapshot channel between the control
//! context and the pulse context, the 100 ms pacing gate, the ramp sequencer
//! and the command console on top of it. `main.rs` wires these to the HAL.
#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod command;
pub mod console;
pub mod controller;
pub mod display;
pub mod drivers;
pub mod link;
pub mod recording;
pub mod sequencer;
pub mod state;
