//! Operation-to-instruction-sequence tables, grounded on
//! `original_source/src/translator/code_generator/instruction_producers.py`'s
//! `OPERATION_TRANSLATION` dict. The keywords that dict omits (`mod`,
//! `neg`, `abs`, the `2`-prefixed double-word family, `over`, `2store`,
//! `2load`) are produced here by generalizing the surrounding patterns
//! the same way the original generalizes push/pop.
//!
//! Convention shared by every comparison and double-word producer: the
//! stack holds `..., a, b, <top>` before a binary op, so the first pop
//! is the right-hand operand and the second pop is the left-hand one.

use crate::token::TokenKind;
use stackvm::constants::{INPUT_ADDRESS, OUTPUT_ADDRESS};
use stackvm::{Instruction, Opcode, Register};

const LUI_SHIFT: u32 = 12;

pub fn push_register(reg: Register) -> Vec<Instruction> {
    vec![
        Instruction::I { opcode: Opcode::Addi, rd: Register::Sp, rs1: Register::Sp, imm: -1 },
        Instruction::S { opcode: Opcode::Sw, rs1: Register::Sp, rs2: reg },
    ]
}

pub fn pop_to_register(reg: Register) -> Vec<Instruction> {
    vec![
        Instruction::I { opcode: Opcode::Lw, rd: reg, rs1: Register::Sp, imm: 0 },
        Instruction::I { opcode: Opcode::Addi, rd: Register::Sp, rs1: Register::Sp, imm: 1 },
    ]
}

/// Splits a 32-bit value into a 20-bit upper half and a 12-bit signed
/// lower half such that `(upper << 12) + lower == value`, for the
/// `lui`+`addi` pair used whenever a value doesn't fit a single `addi`.
pub fn decompose(value: i32) -> (i32, i32) {
    use stackvm::bitutil::{low_bits, sign_extend};
    let lower = sign_extend(low_bits(value, LUI_SHIFT), LUI_SHIFT);
    let upper = (value - lower) >> LUI_SHIFT;
    (upper, lower)
}

pub fn push_number(value: i32) -> Vec<Instruction> {
    use stackvm::bitutil::fits_signed;
    use stackvm::constants::I_IMM_WIDTH;

    let mut out = if fits_signed(value, I_IMM_WIDTH) {
        vec![Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: value }]
    } else {
        let (upper, lower) = decompose(value);
        vec![
            Instruction::U { opcode: Opcode::Lui, rd: Register::T0, imm: upper },
            Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::T0, imm: lower },
        ]
    };
    out.extend(push_register(Register::T0));
    out
}

/// A `NNN.` extended-number literal pushes its low word first, so the
/// high word ends up on top (§3's "low pushed first, high on top").
pub fn push_extended_number(value: i64) -> Vec<Instruction> {
    let low = value as i32;
    let high = (value >> 32) as i32;
    let mut out = push_number(low);
    out.extend(push_number(high));
    out
}

/// A declared symbol's data address always falls inside the (tiny) data
/// segment, which fits a single `addi` immediate.
pub fn push_symbol_address(address: u32) -> Vec<Instruction> {
    let mut out = vec![Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: address as i32 }];
    out.extend(push_register(Register::T0));
    out
}

fn comparison(branch_opcode: Opcode, also_if_equal: bool) -> Vec<Instruction> {
    // t1 = right operand (popped first, the top of stack)
    // t0 = left operand (popped second)
    let mut out = pop_to_register(Register::T1);
    out.extend(pop_to_register(Register::T0));
    let mut branch_opcodes = vec![branch_opcode];
    if also_if_equal {
        branch_opcodes.push(Opcode::Beq);
    }
    // true-path instruction sits right after the false-path's addi+j.
    let true_index = (branch_opcodes.len() + 2) as i32;
    for (i, opcode) in branch_opcodes.into_iter().enumerate() {
        out.push(Instruction::B {
            opcode,
            rs1: Register::T0,
            rs2: Register::T1,
            imm: true_index - i as i32,
        });
    }
    out.push(Instruction::I { opcode: Opcode::Addi, rd: Register::T2, rs1: Register::Zero, imm: 0 });
    out.push(Instruction::J { opcode: Opcode::J, imm: 2 });
    out.push(Instruction::I { opcode: Opcode::Addi, rd: Register::T2, rs1: Register::Zero, imm: 1 });
    out.extend(push_register(Register::T2));
    out
}

fn negate_on_stack_top(reg_value: Register, scratch: Register) -> Vec<Instruction> {
    vec![
        Instruction::B { opcode: Opcode::Blt, rs1: reg_value, rs2: Register::Zero, imm: 2 },
        Instruction::J { opcode: Opcode::J, imm: 2 },
        Instruction::R { opcode: Opcode::Sub, rd: reg_value, rs1: scratch, rs2: reg_value },
    ]
}

fn abs_single() -> Vec<Instruction> {
    let mut out = pop_to_register(Register::T0);
    out.extend(negate_on_stack_top(Register::T0, Register::Zero));
    out.extend(push_register(Register::T0));
    out
}

fn abs_double() -> Vec<Instruction> {
    // sign of a 64-bit value lives in the high word, on top of stack.
    let mut out = pop_to_register(Register::T0); // high
    out.extend(pop_to_register(Register::T1)); // low
    out.push(Instruction::B { opcode: Opcode::Blt, rs1: Register::T0, rs2: Register::Zero, imm: 2 });
    out.push(Instruction::J { opcode: Opcode::J, imm: 4 });
    out.push(Instruction::I { opcode: Opcode::Addi, rd: Register::T2, rs1: Register::Zero, imm: 0 });
    out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T1, rs1: Register::T2, rs2: Register::T1 });
    out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T0, rs1: Register::T2, rs2: Register::T0 });
    out.extend(push_register(Register::T1));
    out.extend(push_register(Register::T0));
    out
}

/// `2var` lays out its low word at the base address and its high word
/// at `base + 1`. `2store`'s stack convention mirrors `store`'s
/// (`addr value store`, value on top) with the double value's own
/// low-then-high order preserved on top: `..., addr, low, high`.
fn double_store() -> Vec<Instruction> {
    let mut out = pop_to_register(Register::T0); // high (top)
    out.extend(pop_to_register(Register::T1)); // low
    out.extend(pop_to_register(Register::T2)); // address
    out.push(Instruction::S { opcode: Opcode::Sw, rs1: Register::T2, rs2: Register::T1 });
    out.push(Instruction::I { opcode: Opcode::Addi, rd: Register::T3, rs1: Register::T2, imm: 1 });
    out.push(Instruction::S { opcode: Opcode::Sw, rs1: Register::T3, rs2: Register::T0 });
    out
}

fn double_load() -> Vec<Instruction> {
    let mut out = pop_to_register(Register::T0); // address (top)
    out.push(Instruction::I { opcode: Opcode::Lw, rd: Register::T1, rs1: Register::T0, imm: 0 }); // low
    out.push(Instruction::I { opcode: Opcode::Lw, rd: Register::T2, rs1: Register::T0, imm: 1 }); // high
    out.extend(push_register(Register::T1));
    out.extend(push_register(Register::T2));
    out
}

/// Emits the fixed instruction sequence for one operation keyword. Only
/// called for `TokenKind`s where `is_operation()` is true.
pub fn operation_sequence(kind: TokenKind) -> Vec<Instruction> {
    use TokenKind::*;
    match kind {
        Plus => {
            let mut out = pop_to_register(Register::T0); // b
            out.extend(pop_to_register(Register::T1)); // a
            out.push(Instruction::R { opcode: Opcode::Add, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Minus => {
            let mut out = pop_to_register(Register::T0); // b
            out.extend(pop_to_register(Register::T1)); // a
            out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Star => {
            let mut out = pop_to_register(Register::T0);
            out.extend(pop_to_register(Register::T1));
            out.push(Instruction::R { opcode: Opcode::Mul, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Slash => {
            let mut out = pop_to_register(Register::T0);
            out.extend(pop_to_register(Register::T1));
            out.push(Instruction::R { opcode: Opcode::Div, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Mod => {
            let mut out = pop_to_register(Register::T0);
            out.extend(pop_to_register(Register::T1));
            out.push(Instruction::R { opcode: Opcode::Rem, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Neg => negate_single(),
        Abs => abs_single(),
        DPlus => {
            let mut out = pop_to_register(Register::T0); // b_high
            out.extend(pop_to_register(Register::T1)); // b_low
            out.extend(pop_to_register(Register::T2)); // a_high
            out.extend(pop_to_register(Register::T3)); // a_low
            out.push(Instruction::R { opcode: Opcode::Add, rd: Register::T0, rs1: Register::T2, rs2: Register::T0 });
            out.push(Instruction::R { opcode: Opcode::Adc, rd: Register::T2, rs1: Register::T3, rs2: Register::T1 });
            out.push(Instruction::R { opcode: Opcode::Add, rd: Register::T0, rs1: Register::T2, rs2: Register::T0 });
            out.push(Instruction::R { opcode: Opcode::Add, rd: Register::T1, rs1: Register::T3, rs2: Register::T1 });
            out.extend(push_register(Register::T1));
            out.extend(push_register(Register::T0));
            out
        }
        DMinus => {
            let mut out = pop_to_register(Register::T0); // b_high
            out.extend(pop_to_register(Register::T1)); // b_low
            out.extend(pop_to_register(Register::T2)); // a_high
            out.extend(pop_to_register(Register::T3)); // a_low
            out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T0, rs1: Register::T2, rs2: Register::T0 });
            out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T2, rs1: Register::T3, rs2: Register::T1 });
            out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T0, rs1: Register::T2, rs2: Register::T0 });
            out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T1, rs1: Register::T3, rs2: Register::T1 });
            out.extend(push_register(Register::T1));
            out.extend(push_register(Register::T0));
            out
        }
        DStar => {
            let mut out = pop_to_register(Register::T0); // b_high
            out.extend(pop_to_register(Register::T1)); // b_low
            out.extend(pop_to_register(Register::T2)); // a_high
            out.extend(pop_to_register(Register::T3)); // a_low
            out.push(Instruction::R { opcode: Opcode::Mulh, rd: Register::T0, rs1: Register::T3, rs2: Register::T1 });
            out.push(Instruction::R { opcode: Opcode::Mul, rd: Register::T2, rs1: Register::T3, rs2: Register::T1 });
            out.extend(push_register(Register::T2));
            out.extend(push_register(Register::T0));
            out
        }
        DNeg => {
            let mut out = pop_to_register(Register::T0); // high
            out.extend(pop_to_register(Register::T1)); // low
            out.push(Instruction::I { opcode: Opcode::Addi, rd: Register::T2, rs1: Register::Zero, imm: 0 });
            out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T1, rs1: Register::T2, rs2: Register::T1 });
            out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T0, rs1: Register::T2, rs2: Register::T0 });
            out.extend(push_register(Register::T1));
            out.extend(push_register(Register::T0));
            out
        }
        DAbs => abs_double(),
        And => {
            let mut out = pop_to_register(Register::T0);
            out.extend(pop_to_register(Register::T1));
            out.push(Instruction::R { opcode: Opcode::And, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Or => {
            let mut out = pop_to_register(Register::T0);
            out.extend(pop_to_register(Register::T1));
            out.push(Instruction::R { opcode: Opcode::Or, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Xor => {
            let mut out = pop_to_register(Register::T0);
            out.extend(pop_to_register(Register::T1));
            out.push(Instruction::R { opcode: Opcode::Xor, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Not => {
            let mut out = pop_to_register(Register::T0);
            out.push(Instruction::I { opcode: Opcode::Addi, rd: Register::T1, rs1: Register::Zero, imm: -1 });
            out.push(Instruction::R { opcode: Opcode::Xor, rd: Register::T0, rs1: Register::T1, rs2: Register::T0 });
            out.extend(push_register(Register::T0));
            out
        }
        Eq => comparison(Opcode::Beq, false),
        Neq => comparison(Opcode::Bne, false),
        Gt => comparison(Opcode::Bgt, false),
        Lt => comparison(Opcode::Blt, false),
        Ge => comparison(Opcode::Bgt, true),
        Le => comparison(Opcode::Blt, true),
        Dup => {
            let mut out = vec![Instruction::I { opcode: Opcode::Lw, rd: Register::T0, rs1: Register::Sp, imm: 0 }];
            out.extend(push_register(Register::T0));
            out
        }
        Drop => vec![Instruction::I { opcode: Opcode::Addi, rd: Register::Sp, rs1: Register::Sp, imm: 1 }],
        Swap => {
            let mut out = pop_to_register(Register::T0);
            out.extend(pop_to_register(Register::T1));
            out.extend(push_register(Register::T0));
            out.extend(push_register(Register::T1));
            out
        }
        Over => {
            let mut out = vec![Instruction::I { opcode: Opcode::Lw, rd: Register::T0, rs1: Register::Sp, imm: 1 }];
            out.extend(push_register(Register::T0));
            out
        }
        DDup => {
            let mut out = vec![Instruction::I { opcode: Opcode::Lw, rd: Register::T0, rs1: Register::Sp, imm: 1 }];
            out.push(Instruction::I { opcode: Opcode::Lw, rd: Register::T1, rs1: Register::Sp, imm: 0 });
            out.extend(push_register(Register::T0));
            out.extend(push_register(Register::T1));
            out
        }
        DDrop => vec![Instruction::I { opcode: Opcode::Addi, rd: Register::Sp, rs1: Register::Sp, imm: 2 }],
        DSwap => {
            let mut out = pop_to_register(Register::T0); // b_high
            out.extend(pop_to_register(Register::T1)); // b_low
            out.extend(pop_to_register(Register::T2)); // a_high
            out.extend(pop_to_register(Register::T3)); // a_low
            out.extend(push_register(Register::T1));
            out.extend(push_register(Register::T0));
            out.extend(push_register(Register::T3));
            out.extend(push_register(Register::T2));
            out
        }
        DOver => {
            let mut out = vec![Instruction::I { opcode: Opcode::Lw, rd: Register::T0, rs1: Register::Sp, imm: 3 }];
            out.push(Instruction::I { opcode: Opcode::Lw, rd: Register::T1, rs1: Register::Sp, imm: 2 });
            out.extend(push_register(Register::T0));
            out.extend(push_register(Register::T1));
            out
        }
        Store => {
            let mut out = pop_to_register(Register::T0); // value (top)
            out.extend(pop_to_register(Register::T1)); // address
            out.push(Instruction::S { opcode: Opcode::Sw, rs1: Register::T1, rs2: Register::T0 });
            out
        }
        Load => {
            let mut out = pop_to_register(Register::T0); // address
            out.push(Instruction::I { opcode: Opcode::Lw, rd: Register::T0, rs1: Register::T0, imm: 0 });
            out.extend(push_register(Register::T0));
            out
        }
        DStore => double_store(),
        DLoad => double_load(),
        Print => {
            let mut out = pop_to_register(Register::T0);
            out.push(Instruction::I { opcode: Opcode::Addi, rd: Register::T1, rs1: Register::Zero, imm: OUTPUT_ADDRESS as i32 });
            out.push(Instruction::S { opcode: Opcode::Sw, rs1: Register::T1, rs2: Register::T0 });
            out
        }
        Read => {
            let mut out = vec![
                Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: INPUT_ADDRESS as i32 },
                Instruction::I { opcode: Opcode::Lw, rd: Register::T0, rs1: Register::T0, imm: 0 },
            ];
            out.extend(push_register(Register::T0));
            out
        }
        EnInt => vec![Instruction::Plain { opcode: Opcode::Eint }],
        DiInt => vec![Instruction::Plain { opcode: Opcode::Dint }],
        _ => unreachable!("operation_sequence is only called for TokenKind::is_operation() kinds"),
    }
}

fn negate_single() -> Vec<Instruction> {
    let mut out = pop_to_register(Register::T0);
    out.push(Instruction::R { opcode: Opcode::Sub, rd: Register::T0, rs1: Register::Zero, rs2: Register::T0 });
    out.extend(push_register(Register::T0));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_number_small_is_one_addi_plus_push() {
        let seq = push_number(5);
        assert_eq!(seq.len(), 3);
        assert!(matches!(seq[0], Instruction::I { opcode: Opcode::Addi, imm: 5, .. }));
    }

    #[test]
    fn push_number_large_uses_lui_addi() {
        let seq = push_number(1 << 20);
        assert!(matches!(seq[0], Instruction::U { opcode: Opcode::Lui, .. }));
        assert!(matches!(seq[1], Instruction::I { opcode: Opcode::Addi, .. }));
    }

    #[test]
    fn decompose_reconstructs_value() {
        for value in [0, 1, -1, 4096, -4096, 1 << 20, -(1 << 20), i32::MAX, i32::MIN] {
            let (upper, lower) = decompose(value);
            assert_eq!((upper << 12).wrapping_add(lower), value, "value={}", value);
        }
    }

    #[test]
    fn drop_is_a_single_instruction() {
        let seq = operation_sequence(TokenKind::Drop);
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn comparison_ends_with_a_push() {
        let seq = operation_sequence(TokenKind::Gt);
        assert!(matches!(seq.last(), Some(Instruction::S { opcode: Opcode::Sw, .. })));
    }
}
