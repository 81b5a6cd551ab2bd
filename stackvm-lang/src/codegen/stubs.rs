//! Two-pass fixed-point label resolution (§4.4), grounded on
//! `original_source/src/translator/code_generator/stubs.py`'s
//! `Stub`/`LabelStub`/`BranchStub`/`JumpStub` classes — generalized
//! from the original's simple eager relative offsets (which assume
//! every branch/jump always fits) into a real fixed-point solver, since
//! this target's branch and jump immediates are narrow enough that
//! `if`/`begin` bodies can overflow them.

use super::producers::decompose;
use crate::error::CodegenError;
use stackvm::bitutil::fits_signed;
use stackvm::constants::{B_IMM_WIDTH, J_IMM_WIDTH};
use stackvm::{Instruction, Opcode, Register};
use std::collections::HashMap;

/// A not-yet-addressed item in an instruction stream under construction.
/// `Branch`/`Jump` stubs carry a `size` guess that the resolver grows
/// until every stub's real expansion matches its guessed size.
pub enum Item {
    Instr(Instruction),
    Label(usize),
    Branch { opcode: Opcode, rs1: Register, rs2: Register, label: usize, size: u32 },
    Jump { label: usize, size: u32 },
}

/// Expands a conditional-branch stub once its own address and its
/// label's address are both known. Three escalating forms, matching
/// §4.4: a plain branch if the offset fits; a trampoline (invert the
/// branch over an unconditional long jump) if not; an absolute
/// jump-through-register as the last resort.
fn expand_branch(opcode: Opcode, rs1: Register, rs2: Register, own_address: u32, target_address: u32) -> Vec<Instruction> {
    let offset = target_address as i64 - own_address as i64;

    if offset >= i32::MIN as i64 && offset <= i32::MAX as i64 && fits_signed(offset as i32, B_IMM_WIDTH) {
        return vec![Instruction::B { opcode, rs1, rs2, imm: offset as i32 }];
    }

    let trampoline_offset = offset - 2;
    if trampoline_offset >= i32::MIN as i64
        && trampoline_offset <= i32::MAX as i64
        && fits_signed(trampoline_offset as i32, J_IMM_WIDTH)
    {
        return vec![
            Instruction::B { opcode, rs1, rs2, imm: 2 },
            Instruction::J { opcode: Opcode::J, imm: 2 },
            Instruction::J { opcode: Opcode::J, imm: trampoline_offset as i32 },
        ];
    }

    let (upper, lower) = decompose(target_address as i32);
    vec![
        Instruction::B { opcode, rs1, rs2, imm: 2 },
        Instruction::J { opcode: Opcode::J, imm: 4 },
        Instruction::U { opcode: Opcode::Lui, rd: Register::T0, imm: upper },
        Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::T0, imm: lower },
        Instruction::Jr { opcode: Opcode::Jr, rs1: Register::T0, imm: 0 },
    ]
}

/// Expands an unconditional-jump stub: a plain `j` if the offset fits,
/// else an absolute jump-through-register.
fn expand_jump(own_address: u32, target_address: u32) -> Vec<Instruction> {
    let offset = target_address as i64 - own_address as i64;

    if offset >= i32::MIN as i64 && offset <= i32::MAX as i64 && fits_signed(offset as i32, J_IMM_WIDTH) {
        return vec![Instruction::J { opcode: Opcode::J, imm: offset as i32 }];
    }

    let (upper, lower) = decompose(target_address as i32);
    vec![
        Instruction::U { opcode: Opcode::Lui, rd: Register::T0, imm: upper },
        Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::T0, imm: lower },
        Instruction::Jr { opcode: Opcode::Jr, rs1: Register::T0, imm: 0 },
    ]
}

/// Assigns addresses to a stream of items starting at `start_address`,
/// growing stub sizes until a full pass leaves every size unchanged,
/// then expands every stub into its final concrete instructions.
///
/// Terminates: a stub's size only ever grows (1 -> 3 -> 5 for branches,
/// 1 -> 3 for jumps), so the fixed point is reached in at most a few
/// passes.
pub fn resolve(stream: &[Item], start_address: u32) -> Result<Vec<(u32, Instruction)>, CodegenError> {
    let mut sizes: Vec<u32> = stream
        .iter()
        .map(|item| match item {
            Item::Branch { .. } | Item::Jump { .. } => 1,
            Item::Instr(_) | Item::Label(_) => 0,
        })
        .collect();

    loop {
        let mut address = start_address;
        let mut item_address = vec![0u32; stream.len()];
        let mut label_address: HashMap<usize, u32> = HashMap::new();

        for (i, item) in stream.iter().enumerate() {
            item_address[i] = address;
            match item {
                Item::Instr(_) => address += 1,
                Item::Label(id) => {
                    label_address.insert(*id, address);
                }
                Item::Branch { .. } | Item::Jump { .. } => address += sizes[i],
            }
        }

        let mut changed = false;
        for (i, item) in stream.iter().enumerate() {
            let needed = match item {
                Item::Branch { opcode, rs1, rs2, label, .. } => {
                    let target = label_address[label];
                    expand_branch(*opcode, *rs1, *rs2, item_address[i], target).len() as u32
                }
                Item::Jump { label, .. } => {
                    let target = label_address[label];
                    expand_jump(item_address[i], target).len() as u32
                }
                Item::Instr(_) | Item::Label(_) => continue,
            };
            if needed != sizes[i] {
                sizes[i] = needed;
                changed = true;
            }
        }

        if !changed {
            let mut out = Vec::new();
            for (i, item) in stream.iter().enumerate() {
                match item {
                    Item::Instr(instr) => out.push((item_address[i], *instr)),
                    Item::Label(_) => {}
                    Item::Branch { opcode, rs1, rs2, label, .. } => {
                        let target = label_address[label];
                        let mut addr = item_address[i];
                        for instr in expand_branch(*opcode, *rs1, *rs2, item_address[i], target) {
                            out.push((addr, instr));
                            addr += 1;
                        }
                    }
                    Item::Jump { label, .. } => {
                        let target = label_address[label];
                        let mut addr = item_address[i];
                        for instr in expand_jump(item_address[i], target) {
                            out.push((addr, instr));
                            addr += 1;
                        }
                    }
                }
            }
            return Ok(out);
        }
    }
}
