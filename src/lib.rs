//! ISA model, data path, and control unit for a stack-oriented
//! register machine: opcode/register sets and their bit-exact encoding,
//! a composite memory abstraction, a passive ALU/register/flags data
//! path, and the fetch/decode/execute/interrupt control unit that owns
//! them. The translator front end lives in the sibling `stackvm-lang`
//! crate; this crate has no file I/O or parsing of its own.

pub mod bitutil;
pub mod constants;
pub mod control_unit;
pub mod datapath;
pub mod error;
pub mod isa;
pub mod memory;

pub use control_unit::{Machine, State, TickOutcome};
pub use datapath::{DataPath, Flags};
pub use error::SimError;
pub use isa::{EncodeError, Instruction, Opcode, Register};
pub use memory::{CompositeMemory, MountError, OutOfRange, Storage, StorageMut};
