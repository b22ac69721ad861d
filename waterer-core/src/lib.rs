#![no_std]

// Shared logic for the garden waterer.
//
// Everything here is portable across the MCU firmware and the host emulator:
// hardware is reached only through the traits in `hardware`, and time only
// advances through an injected `TickSource`.

pub mod buttons;
pub mod config;
pub mod controller;
pub mod countdown;
pub mod hardware;
pub mod selector;
pub mod telemetry;
