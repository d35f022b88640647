//! A CHIP-8 virtual machine core.
//!
//! The crate owns the emulated machine state (memory, registers, call stack,
//! framebuffer, delay/sound timers) and drives the fetch-decode-execute loop
//! together with the two timer cadences on their own threads. Everything a
//! host needs to bolt on a renderer, a keyboard and a beeper is exposed as
//! cloneable handles and an outbound event channel; the core makes no
//! assumptions about the UI technology.

// `error_chain!` can recurse deeply
#![recursion_limit = "1024"]

extern crate byteorder;
#[macro_use]
extern crate enum_primitive;
#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate log;
extern crate rand;

mod memory;
mod regfile;
mod stack;
mod vm;

pub mod display;
pub mod emulator;
pub mod instruction;
pub mod keypad;
pub mod timer;

pub use display::{Frame, SharedDisplay};
pub use emulator::{CancelToken, Emulator, EmulatorConfig, Event, RunHandle};
pub use keypad::Keypad;
pub use memory::{Memory, MEMORY_SIZE, USER_SPACE_END, USER_SPACE_START};
pub use timer::AsyncTimer;
pub use vm::Vm;

error_chain! {
    links {
        Instruction(instruction::Error, instruction::ErrorKind);
    }

    errors {
        OutOfRangeAccess(addr: u16) {
            description("memory access out of range")
            display("address {:#05x} is outside user memory", addr)
        }
        TruncatedWord(addr: u16) {
            description("truncated instruction word")
            display("not enough bytes at {:#05x} to form an instruction word", addr)
        }
        StackOverflow {
            description("call stack overflow")
            display("call stack depth exceeded")
        }
        StackUnderflow {
            description("call stack underflow")
            display("return with an empty call stack")
        }
    }
}
