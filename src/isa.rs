//! Opcode and register sets, the seven instruction shapes, and their
//! bit-exact encode/decode.

use crate::bitutil::{extract, fits_signed, low_bits, sign_extend};
use crate::constants::*;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::{FromPrimitive, ToPrimitive};
use stackvm_util_derive::{EnumFromStr, InteropGetName};
use stackvm_util::InteropGetName;

/// Architectural register identifiers. `Zero` is hardwired to the value
/// zero: writes to it are dropped and reads always yield zero.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr, InteropGetName)]
pub enum Register {
    Zero,
    T0,
    T1,
    T2,
    T3,
    Sp,
}

impl Register {
    pub fn to_field(self) -> u32 {
        self.to_u32().expect("Register always fits in u32.")
    }

    pub fn from_field(field: u32) -> Option<Register> {
        Register::from_u32(field)
    }
}

/// Every opcode this machine understands. Each variant corresponds to
/// exactly one of the seven instruction shapes in the table below; the
/// shape is not a separate field because the bit layout already fixes
/// it per opcode.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive, EnumFromStr, InteropGetName)]
pub enum Opcode {
    /// Stops execution. Plain shape.
    Halt,
    /// Returns from an interrupt handler. Plain shape. Does not advance
    /// the tick on its own; triggers the `INT_EXIT` state.
    Rint,
    /// Enables interrupt delivery. Plain shape.
    Eint,
    /// Disables interrupt delivery. Plain shape.
    Dint,
    /// Loads the 20-bit upper immediate into `rd`, shifted left 12. U
    /// shape.
    Lui,
    /// `rd = rs1 + imm`. I shape.
    Addi,
    /// Two-step load: latches `rs1 + imm` as the data address, then
    /// loads the word into `rd`. I shape.
    Lw,
    /// Two-step store: latches `rs1` as the data address, then stores
    /// `rs2`. S shape.
    Sw,
    /// `rd = rs1 + rs2`. R shape.
    Add,
    /// `rd = rs1 + rs2`; the carry flag also reflects the unsigned-sum
    /// carry bit. R shape.
    Adc,
    /// `rd = rs1 - rs2`. R shape.
    Sub,
    /// `rd = rs1 * rs2`, low 32 bits. R shape.
    Mul,
    /// `rd = rs1 * rs2`, high 32 bits of the signed 64-bit product. R
    /// shape.
    Mulh,
    /// `rd = floor(rs1 / rs2)`. R shape.
    Div,
    /// `rd = rs1 mod rs2` (mathematical remainder, matching `Div`'s
    /// floor convention). R shape.
    Rem,
    /// `rd = rs1 << rs2`. R shape.
    Sll,
    /// `rd = rs1 >> rs2`, logical. R shape.
    Srl,
    /// `rd = rs1 & rs2`. R shape.
    And,
    /// `rd = rs1 | rs2`. R shape.
    Or,
    /// `rd = rs1 ^ rs2`. R shape.
    Xor,
    /// Two-step: computes `rs1 - rs2` (setting flags), branches if
    /// equal. B shape.
    Beq,
    /// As `Beq`, branches if not equal.
    Bne,
    /// As `Beq`, branches if `rs1 > rs2` (signed).
    Bgt,
    /// As `Beq`, branches if `rs1 < rs2` (signed).
    Blt,
    /// `pc = pc + imm`. J shape.
    J,
    /// `pc = reg[rs1] + imm`. JR shape.
    Jr,
}

/// The seven instruction shapes named in the external interface,
/// carrying their concrete operands.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    Plain { opcode: Opcode },
    U { opcode: Opcode, rd: Register, imm: i32 },
    I { opcode: Opcode, rd: Register, rs1: Register, imm: i32 },
    R { opcode: Opcode, rd: Register, rs1: Register, rs2: Register },
    S { opcode: Opcode, rs1: Register, rs2: Register },
    B { opcode: Opcode, rs1: Register, rs2: Register, imm: i32 },
    J { opcode: Opcode, imm: i32 },
    Jr { opcode: Opcode, rs1: Register, imm: i32 },
}

/// Failure modes for packing operands into their declared bit widths.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EncodeError {
    ImmediateOutOfRange { value: i32, width: u32 },
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match *self {
            Instruction::Plain { opcode }
            | Instruction::U { opcode, .. }
            | Instruction::I { opcode, .. }
            | Instruction::R { opcode, .. }
            | Instruction::S { opcode, .. }
            | Instruction::B { opcode, .. }
            | Instruction::J { opcode, .. }
            | Instruction::Jr { opcode, .. } => opcode,
        }
    }

    fn check_imm(value: i32, width: u32) -> Result<(), EncodeError> {
        if fits_signed(value, width) {
            Ok(())
        } else {
            Err(EncodeError::ImmediateOutOfRange { value, width })
        }
    }

    /// Packs this instruction into its 32-bit wire representation.
    pub fn encode(&self) -> Result<u32, EncodeError> {
        let opcode_bits = self.opcode().to_u32().expect("opcode fits in u32") << OPCODE_SHIFT;

        let word = match *self {
            Instruction::Plain { .. } => opcode_bits,

            Instruction::U { rd, imm, .. } => {
                Self::check_imm(imm, U_IMM_WIDTH)?;
                opcode_bits | (rd.to_field() << RD_SHIFT) | (low_bits(imm, U_IMM_WIDTH) << U_IMM_SHIFT)
            }

            Instruction::I { rd, rs1, imm, .. } => {
                Self::check_imm(imm, I_IMM_WIDTH)?;
                opcode_bits
                    | (rd.to_field() << RD_SHIFT)
                    | (rs1.to_field() << RS1_SHIFT)
                    | (low_bits(imm, I_IMM_WIDTH) << I_IMM_SHIFT)
            }

            Instruction::R { rd, rs1, rs2, .. } => {
                opcode_bits
                    | (rd.to_field() << RD_SHIFT)
                    | (rs1.to_field() << RS1_SHIFT)
                    | (rs2.to_field() << RS2_SHIFT)
            }

            Instruction::S { rs1, rs2, .. } => {
                opcode_bits | (rs1.to_field() << RS1_SHIFT) | (rs2.to_field() << RS2_SHIFT)
            }

            Instruction::B { rs1, rs2, imm, .. } => {
                Self::check_imm(imm, B_IMM_WIDTH)?;
                let low = low_bits(imm, B_IMM_LOW_WIDTH);
                let high = low_bits(imm >> B_IMM_LOW_WIDTH, B_IMM_HIGH_WIDTH);
                opcode_bits
                    | (low << B_IMM_LOW_SHIFT)
                    | (rs1.to_field() << RS1_SHIFT)
                    | (rs2.to_field() << RS2_SHIFT)
                    | (high << B_IMM_HIGH_SHIFT)
            }

            Instruction::J { imm, .. } => {
                Self::check_imm(imm, J_IMM_WIDTH)?;
                opcode_bits | (low_bits(imm, J_IMM_WIDTH) << J_IMM_SHIFT)
            }

            Instruction::Jr { rs1, imm, .. } => {
                Self::check_imm(imm, JR_IMM_WIDTH)?;
                let low = low_bits(imm, JR_IMM_LOW_WIDTH);
                let high = low_bits(imm >> JR_IMM_LOW_WIDTH, JR_IMM_HIGH_WIDTH);
                opcode_bits | (low << JR_IMM_LOW_SHIFT) | (rs1.to_field() << RS1_SHIFT) | (high << JR_IMM_HIGH_SHIFT)
            }
        };

        Ok(word)
    }

    /// Unpacks a 32-bit word into a typed instruction, or `None` if the
    /// opcode field does not name a known opcode or a register field
    /// names an unknown register.
    pub fn decode(word: u32) -> Option<Instruction> {
        let opcode = Opcode::from_u32(extract(word, OPCODE_SHIFT, OPCODE_WIDTH))?;
        let rd = || Register::from_field(extract(word, RD_SHIFT, REGISTER_FIELD_WIDTH));
        let rs1 = || Register::from_field(extract(word, RS1_SHIFT, REGISTER_FIELD_WIDTH));
        let rs2 = || Register::from_field(extract(word, RS2_SHIFT, REGISTER_FIELD_WIDTH));

        use Opcode::*;
        let instruction = match opcode {
            Halt | Rint | Eint | Dint => Instruction::Plain { opcode },

            Lui => Instruction::U {
                opcode,
                rd: rd()?,
                imm: sign_extend(extract(word, U_IMM_SHIFT, U_IMM_WIDTH), U_IMM_WIDTH),
            },

            Addi | Lw => Instruction::I {
                opcode,
                rd: rd()?,
                rs1: rs1()?,
                imm: sign_extend(extract(word, I_IMM_SHIFT, I_IMM_WIDTH), I_IMM_WIDTH),
            },

            Add | Adc | Sub | Mul | Mulh | Div | Rem | Sll | Srl | And | Or | Xor => Instruction::R {
                opcode,
                rd: rd()?,
                rs1: rs1()?,
                rs2: rs2()?,
            },

            Sw => Instruction::S {
                opcode,
                rs1: rs1()?,
                rs2: rs2()?,
            },

            Beq | Bne | Bgt | Blt => {
                let low = extract(word, B_IMM_LOW_SHIFT, B_IMM_LOW_WIDTH);
                let high = extract(word, B_IMM_HIGH_SHIFT, B_IMM_HIGH_WIDTH);
                let imm = sign_extend((high << B_IMM_LOW_WIDTH) | low, B_IMM_WIDTH);
                Instruction::B {
                    opcode,
                    rs1: rs1()?,
                    rs2: rs2()?,
                    imm,
                }
            }

            J => Instruction::J {
                opcode,
                imm: sign_extend(extract(word, J_IMM_SHIFT, J_IMM_WIDTH), J_IMM_WIDTH),
            },

            Jr => {
                let low = extract(word, JR_IMM_LOW_SHIFT, JR_IMM_LOW_WIDTH);
                let high = extract(word, JR_IMM_HIGH_SHIFT, JR_IMM_HIGH_WIDTH);
                let imm = sign_extend((high << JR_IMM_LOW_WIDTH) | low, JR_IMM_WIDTH);
                Instruction::Jr { opcode, rs1: rs1()?, imm }
            }
        };

        Some(instruction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_roundtrip() {
        let instr = Instruction::Plain { opcode: Opcode::Halt };
        assert_eq!(Instruction::decode(instr.encode().unwrap()), Some(instr));
    }

    #[test]
    fn r_shape_roundtrip() {
        let instr = Instruction::R {
            opcode: Opcode::Add,
            rd: Register::T0,
            rs1: Register::T1,
            rs2: Register::T2,
        };
        assert_eq!(Instruction::decode(instr.encode().unwrap()), Some(instr));
    }

    #[test]
    fn i_shape_negative_immediate_roundtrip() {
        let instr = Instruction::I {
            opcode: Opcode::Addi,
            rd: Register::T0,
            rs1: Register::Zero,
            imm: -100,
        };
        let word = instr.encode().unwrap();
        assert_eq!(Instruction::decode(word), Some(instr));
    }

    #[test]
    fn i_shape_immediate_out_of_range() {
        let instr = Instruction::I {
            opcode: Opcode::Addi,
            rd: Register::T0,
            rs1: Register::Zero,
            imm: 1 << 20,
        };
        assert!(instr.encode().is_err());
    }

    #[test]
    fn b_shape_split_immediate_roundtrip() {
        for imm in [-16384, -1, 0, 1, 16383] {
            let instr = Instruction::B {
                opcode: Opcode::Beq,
                rs1: Register::T0,
                rs2: Register::T1,
                imm,
            };
            let word = instr.encode().unwrap();
            assert_eq!(Instruction::decode(word), Some(instr), "imm={}", imm);
        }
    }

    #[test]
    fn j_shape_roundtrip() {
        let instr = Instruction::J { opcode: Opcode::J, imm: -70000 };
        let word = instr.encode().unwrap();
        assert_eq!(Instruction::decode(word), Some(instr));
    }

    #[test]
    fn jr_shape_roundtrip() {
        let instr = Instruction::Jr {
            opcode: Opcode::Jr,
            rs1: Register::T3,
            imm: -12345,
        };
        let word = instr.encode().unwrap();
        assert_eq!(Instruction::decode(word), Some(instr));
    }

    #[test]
    fn zero_register_field_roundtrips() {
        assert_eq!(Register::from_field(Register::Zero.to_field()), Some(Register::Zero));
    }

    #[test]
    fn unknown_opcode_decodes_to_none() {
        assert_eq!(Instruction::decode(0x7F), None);
    }
}
