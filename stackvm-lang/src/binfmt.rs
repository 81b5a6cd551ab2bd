//! Binary, hex, and JSON encodings of a linked program (§5). The binary
//! form is a flat sequence of big-endian `(address, value)` word pairs —
//! grounded on `examples/snacchus-vcpu`'s `vex` executable format, but
//! using [`stackvm_util::Endian`] instead of the teacher's little-endian
//! convention, and tolerating a truncated trailing record rather than
//! treating it as an error (§5: partial writes from a killed producer
//! process shouldn't corrupt the whole file).

use crate::error::CodegenError;
use byteorder::{ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use stackvm::{Instruction, Register};
use stackvm_util::Endian;
use std::io::{self, Read, Write};

/// One `(address, value)` record. Used identically for instruction
/// memory and data memory; the binary encoding carries no tag
/// distinguishing the two, matching §5 (the two files are separate
/// streams, so no tag is needed).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WordRecord {
    pub address: u32,
    pub value: u32,
}

pub fn write_instructions(
    writer: &mut dyn Write,
    instructions: &[(u32, Instruction)],
) -> Result<(), CodegenError> {
    for (address, instruction) in instructions {
        let value = instruction.encode()?;
        write_record(writer, *address, value).map_err(io_to_codegen)?;
    }
    Ok(())
}

pub fn write_data(writer: &mut dyn Write, data: &[i32], data_area_start: u32) -> Result<(), CodegenError> {
    for (i, value) in data.iter().enumerate() {
        write_record(writer, data_area_start + i as u32, *value as u32).map_err(io_to_codegen)?;
    }
    Ok(())
}

fn write_record(writer: &mut dyn Write, address: u32, value: u32) -> io::Result<()> {
    writer.write_u32::<Endian>(address)?;
    writer.write_u32::<Endian>(value)?;
    Ok(())
}

fn io_to_codegen(_err: io::Error) -> CodegenError {
    // the only way writing to an in-memory/file Write fails here is a
    // full disk or closed pipe; neither maps to an existing CodegenError
    // variant, so this is surfaced through the CLI's own anyhow wrapper
    // instead of the translation pipeline's error taxonomy.
    CodegenError::InstructionMemoryOverflow
}

/// Reads every complete `(address, value)` record from `reader`. A
/// trailing short read (fewer than 8 bytes left) is silently dropped
/// rather than treated as an error.
pub fn read_records(reader: &mut dyn Read) -> io::Result<Vec<WordRecord>> {
    let mut records = Vec::new();
    loop {
        let address = match reader.read_u32::<Endian>() {
            Ok(value) => value,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err),
        };
        let value = match reader.read_u32::<Endian>() {
            Ok(value) => value,
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(err) => return Err(err),
        };
        records.push(WordRecord { address, value });
    }
    Ok(records)
}

fn mnemonic(instruction: &Instruction) -> String {
    fn reg(register: Register) -> &'static str {
        match register {
            Register::Zero => "zero",
            Register::T0 => "t0",
            Register::T1 => "t1",
            Register::T2 => "t2",
            Register::T3 => "t3",
            Register::Sp => "sp",
        }
    }

    match *instruction {
        Instruction::Plain { opcode } => format!("{:?}", opcode).to_lowercase(),
        Instruction::U { opcode, rd, imm } => format!("{} {}, {}", format!("{:?}", opcode).to_lowercase(), reg(rd), imm),
        Instruction::I { opcode, rd, rs1, imm } => {
            format!("{} {}, {}, {}", format!("{:?}", opcode).to_lowercase(), reg(rd), reg(rs1), imm)
        }
        Instruction::R { opcode, rd, rs1, rs2 } => {
            format!("{} {}, {}, {}", format!("{:?}", opcode).to_lowercase(), reg(rd), reg(rs1), reg(rs2))
        }
        Instruction::S { opcode, rs1, rs2 } => format!("{} {}, {}", format!("{:?}", opcode).to_lowercase(), reg(rs1), reg(rs2)),
        Instruction::B { opcode, rs1, rs2, imm } => {
            format!("{} {}, {}, {}", format!("{:?}", opcode).to_lowercase(), reg(rs1), reg(rs2), imm)
        }
        Instruction::J { opcode, imm } => format!("{} {}", format!("{:?}", opcode).to_lowercase(), imm),
        Instruction::Jr { opcode, rs1, imm } => format!("{} {}, {}", format!("{:?}", opcode).to_lowercase(), reg(rs1), imm),
    }
}

/// One line per instruction: `<address> - <hex> - <binary> - <mnemonic>`.
pub fn hex_dump(instructions: &[(u32, Instruction)]) -> Result<String, CodegenError> {
    let mut out = String::new();
    for (address, instruction) in instructions {
        let word = instruction.encode()?;
        out.push_str(&format!("{:3} - {:08X} - {:032b} - {}\n", address, word, word, mnemonic(instruction)));
    }
    Ok(out)
}

#[derive(Serialize)]
struct InstructionJson {
    address: u32,
    opcode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rs1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rs2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    imm: Option<i32>,
}

fn reg_name(register: Register) -> String {
    format!("{:?}", register)
}

fn instruction_json(address: u32, instruction: &Instruction) -> InstructionJson {
    let opcode = format!("{:?}", instruction.opcode());
    match *instruction {
        Instruction::Plain { .. } => InstructionJson { address, opcode, rd: None, rs1: None, rs2: None, imm: None },
        Instruction::U { rd, imm, .. } => {
            InstructionJson { address, opcode, rd: Some(reg_name(rd)), rs1: None, rs2: None, imm: Some(imm) }
        }
        Instruction::I { rd, rs1, imm, .. } => {
            InstructionJson { address, opcode, rd: Some(reg_name(rd)), rs1: Some(reg_name(rs1)), rs2: None, imm: Some(imm) }
        }
        Instruction::R { rd, rs1, rs2, .. } => {
            InstructionJson { address, opcode, rd: Some(reg_name(rd)), rs1: Some(reg_name(rs1)), rs2: Some(reg_name(rs2)), imm: None }
        }
        Instruction::S { rs1, rs2, .. } => {
            InstructionJson { address, opcode, rd: None, rs1: Some(reg_name(rs1)), rs2: Some(reg_name(rs2)), imm: None }
        }
        Instruction::B { rs1, rs2, imm, .. } => {
            InstructionJson { address, opcode, rd: None, rs1: Some(reg_name(rs1)), rs2: Some(reg_name(rs2)), imm: Some(imm) }
        }
        Instruction::J { imm, .. } => InstructionJson { address, opcode, rd: None, rs1: None, rs2: None, imm: Some(imm) },
        Instruction::Jr { rs1, imm, .. } => {
            InstructionJson { address, opcode, rd: None, rs1: Some(reg_name(rs1)), rs2: None, imm: Some(imm) }
        }
    }
}

pub fn instructions_to_json(instructions: &[(u32, Instruction)]) -> Result<String, CodegenError> {
    let rows: Vec<InstructionJson> = instructions.iter().map(|(addr, instr)| instruction_json(*addr, instr)).collect();
    serde_json::to_string_pretty(&rows).map_err(|_| CodegenError::InstructionMemoryOverflow)
}

#[derive(Serialize)]
struct DataJson {
    address: u32,
    word: i32,
}

pub fn data_to_json(data: &[i32], data_area_start: u32) -> Result<String, CodegenError> {
    let rows: Vec<DataJson> = data
        .iter()
        .enumerate()
        .map(|(i, value)| DataJson { address: data_area_start + i as u32, word: *value })
        .collect();
    serde_json::to_string_pretty(&rows).map_err(|_| CodegenError::InstructionMemoryOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackvm::Opcode;

    #[test]
    fn instructions_round_trip_through_binary() {
        let instructions = vec![
            (0u32, Instruction::Plain { opcode: Opcode::Halt }),
            (1u32, Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: 5 }),
        ];
        let mut buf = Vec::new();
        write_instructions(&mut buf, &instructions).unwrap();
        let records = read_records(&mut &buf[..]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, 0);
        assert_eq!(Instruction::decode(records[1].value), Some(instructions[1].1));
    }

    #[test]
    fn trailing_partial_record_is_dropped() {
        let instructions = vec![(0u32, Instruction::Plain { opcode: Opcode::Halt })];
        let mut buf = Vec::new();
        write_instructions(&mut buf, &instructions).unwrap();
        buf.extend_from_slice(&[1, 2, 3]); // partial trailing record
        let records = read_records(&mut &buf[..]).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn hex_dump_contains_mnemonic() {
        let instructions = vec![(0u32, Instruction::Plain { opcode: Opcode::Halt })];
        let dump = hex_dump(&instructions).unwrap();
        assert!(dump.contains("halt"));
    }

    #[test]
    fn json_dump_is_valid_json() {
        let instructions = vec![(0u32, Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: 5 })];
        let json = instructions_to_json(&instructions).unwrap();
        assert!(json.contains("\"imm\": 5"));
    }
}
