//! Compile-time constants of this particular implementation: memory
//! sizes and the fixed addresses referenced by §6 of the external
//! interface (memory-mapped I/O ports and the interrupt handler).

/// Number of 32-bit words in instruction memory.
pub const INSTRUCTION_MEMORY_SIZE: usize = 0x1_0000;

/// Number of 32-bit words in data memory.
pub const DATA_MEMORY_SIZE: usize = 0x1000;

/// Reading from this address pops one buffered input value; writing to
/// it is fatal.
pub const INPUT_ADDRESS: u32 = 0;

/// Writing to this address appends to the output buffer; reading from
/// it is fatal.
pub const OUTPUT_ADDRESS: u32 = 1;

/// First address available for variables and literal pool content.
pub const DATA_AREA_START: u32 = 2;

/// Fixed instruction-memory address of the interrupt handler. Main code
/// must not be linked at or beyond this address.
pub const INTERRUPTS_HANDLER_ADDRESS: u32 = 0x8000;

/// Field widths, in bits, shared by every instruction shape.
pub const OPCODE_WIDTH: u32 = 7;
pub const REGISTER_FIELD_WIDTH: u32 = 5;
pub const U_IMM_WIDTH: u32 = 20;
pub const I_IMM_WIDTH: u32 = 15;
pub const B_IMM_WIDTH: u32 = 15;
pub const J_IMM_WIDTH: u32 = 25;
pub const JR_IMM_WIDTH: u32 = 20;

pub const OPCODE_SHIFT: u32 = 0;
pub const RD_SHIFT: u32 = OPCODE_WIDTH;
pub const RS1_SHIFT: u32 = RD_SHIFT + REGISTER_FIELD_WIDTH;
pub const RS2_SHIFT: u32 = RS1_SHIFT + REGISTER_FIELD_WIDTH;

pub const U_IMM_SHIFT: u32 = RD_SHIFT + REGISTER_FIELD_WIDTH;
pub const I_IMM_SHIFT: u32 = RS1_SHIFT + REGISTER_FIELD_WIDTH;
pub const J_IMM_SHIFT: u32 = OPCODE_WIDTH;

pub const B_IMM_LOW_SHIFT: u32 = RD_SHIFT;
pub const B_IMM_LOW_WIDTH: u32 = REGISTER_FIELD_WIDTH;
pub const B_IMM_HIGH_SHIFT: u32 = RS2_SHIFT + REGISTER_FIELD_WIDTH;
pub const B_IMM_HIGH_WIDTH: u32 = B_IMM_WIDTH - B_IMM_LOW_WIDTH;

pub const JR_IMM_LOW_SHIFT: u32 = RD_SHIFT;
pub const JR_IMM_LOW_WIDTH: u32 = REGISTER_FIELD_WIDTH;
pub const JR_IMM_HIGH_SHIFT: u32 = RS1_SHIFT + REGISTER_FIELD_WIDTH;
pub const JR_IMM_HIGH_WIDTH: u32 = JR_IMM_WIDTH - JR_IMM_LOW_WIDTH;
