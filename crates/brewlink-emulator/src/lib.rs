//! Espresso controller emulator.
//!
//! A deterministic stand-in for the machine's controller board, used by the
//! link's integration tests and the CLI `demo` command. [`EspressoMachine`]
//! simulates the process; [`EmulatedController`] speaks the wire protocol
//! on top of it.

pub mod device;
pub mod machine;

pub use device::{BOOT_BANNER, EmulatedController};
pub use machine::{EspressoMachine, ExtractionState, MachineProfile, StateTransition};
