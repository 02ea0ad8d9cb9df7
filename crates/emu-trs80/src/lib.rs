//! TRS-80 Model III emulator.
//!
//! A cycle-paced Z80 machine with memory-mapped screen and keyboard, a
//! WD1791/93 floppy controller reading JV1/JV3 images, a cassette deck
//! that turns WAV samples into edge interrupts, a clock-ordered event
//! scheduler, and a real-time pacing loop. The machine talks to its UI
//! over a pair of channels carrying JSON-shaped command and update
//! records.

pub mod bus;
pub mod cassette;
pub mod events;
pub mod fdc;
pub mod interrupts;
pub mod keyboard;
pub mod machine;
pub mod update;

pub use bus::TrsBus;
pub use machine::{Breakpoint, Machine, CPU_HZ, TIMER_CYCLES};
pub use update::{VmCommand, VmUpdate};
