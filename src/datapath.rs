//! The passive data path: ALU, register file, shadow register file,
//! flags, and the memory-mapped I/O ports. Every method here is a
//! combinational signal triggered by the control unit; nothing here
//! advances a tick on its own.

use crate::constants::{DATA_AREA_START, INPUT_ADDRESS, OUTPUT_ADDRESS};
use crate::error::SimError;
use crate::isa::{Opcode, Register};
use crate::memory::{CompositeMemory, Storage, StorageMut};
use num_integer::Integer;
use std::collections::VecDeque;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Flags {
    pub zero: bool,
    pub negative: bool,
    pub overflow: bool,
    pub carry: bool,
}

const REGISTER_COUNT: usize = 6;

pub struct DataPath {
    memory: CompositeMemory,
    data_memory_size: u32,
    data_address: u32,
    input_buffer: VecDeque<i32>,
    output_buffer: Vec<i32>,
    registers: [i32; REGISTER_COUNT],
    shadow_registers: [i32; REGISTER_COUNT],
    pub flags: Flags,
}

impl DataPath {
    pub fn new(data_memory_size: u32) -> DataPath {
        let mut memory = CompositeMemory::new();
        let usable = data_memory_size - DATA_AREA_START;
        memory
            .mount(DATA_AREA_START, "data", vec![0i32; usable as usize])
            .expect("data fragment does not overlap the I/O ports");

        let mut registers = [0i32; REGISTER_COUNT];
        registers[Register::Sp.to_field() as usize] = data_memory_size as i32;

        DataPath {
            memory,
            data_memory_size,
            data_address: 0,
            input_buffer: VecDeque::new(),
            output_buffer: Vec::new(),
            registers,
            shadow_registers: [0i32; REGISTER_COUNT],
            flags: Flags::default(),
        }
    }

    pub fn output_buffer(&self) -> &[i32] {
        &self.output_buffer
    }

    pub fn queue_input(&mut self, value: i32) {
        self.input_buffer.push_back(value);
    }

    pub fn load_data(&mut self, address: u32, value: i32) -> Result<(), SimError> {
        self.memory
            .write(address, value)
            .map_err(|_| SimError::InvalidDataAddress { address })
    }

    pub fn read_register(&self, register: Register) -> i32 {
        if register == Register::Zero {
            0
        } else {
            self.registers[register.to_field() as usize]
        }
    }

    pub fn write_register(&mut self, register: Register, value: i32) {
        if register != Register::Zero {
            self.registers[register.to_field() as usize] = value;
        }
    }

    pub fn store_registers(&mut self) {
        self.shadow_registers = self.registers;
    }

    pub fn restore_registers(&mut self) {
        self.registers = self.shadow_registers;
        self.registers[Register::Zero.to_field() as usize] = 0;
    }

    pub fn latch_data_address(&mut self, address: u32) -> Result<(), SimError> {
        if address < self.data_memory_size {
            self.data_address = address;
            Ok(())
        } else {
            Err(SimError::InvalidDataAddress { address })
        }
    }

    pub fn memory_store(&mut self, value: i32) -> Result<(), SimError> {
        match self.data_address {
            INPUT_ADDRESS => Err(SimError::WritingToInputAddress),
            OUTPUT_ADDRESS => {
                self.output_buffer.push(value);
                Ok(())
            }
            address => self
                .memory
                .write(address, value)
                .map_err(|_| SimError::InvalidDataAddress { address }),
        }
    }

    pub fn memory_load(&mut self) -> Result<i32, SimError> {
        match self.data_address {
            OUTPUT_ADDRESS => Err(SimError::ReadingFromOutputAddress),
            INPUT_ADDRESS => self.input_buffer.pop_front().ok_or(SimError::EmptyInputBuffer),
            address => self
                .memory
                .read(address)
                .map_err(|_| SimError::InvalidDataAddress { address }),
        }
    }

    /// Computes `left op right` for the twelve R-shape opcodes, updating
    /// `self.flags` unconditionally (spec.md §9: every ALU op touches
    /// zero/negative/overflow; `adc` additionally defines the carry
    /// bit). `div`/`rem` are floor division and mathematical remainder.
    pub fn alu(&mut self, opcode: Opcode, left: i32, right: i32) -> Result<i32, SimError> {
        let (result, overflow, carry) = match opcode {
            Opcode::Add => {
                let wide = left as i64 + right as i64;
                (wide as i32, out_of_i32_range(wide), false)
            }
            Opcode::Adc => {
                let wide = left as i64 + right as i64;
                let unsigned_wide = left as u32 as u64 + right as u32 as u64;
                (wide as i32, out_of_i32_range(wide), unsigned_wide > u32::MAX as u64)
            }
            Opcode::Sub => {
                let wide = left as i64 - right as i64;
                (wide as i32, out_of_i32_range(wide), false)
            }
            Opcode::Mul => {
                let wide = left as i64 * right as i64;
                (wide as i32, out_of_i32_range(wide), false)
            }
            Opcode::Mulh => {
                let wide = left as i64 * right as i64;
                ((wide >> 32) as i32, false, false)
            }
            Opcode::Div => {
                if right == 0 {
                    return Err(SimError::DivisionByZero);
                }
                (left.div_floor(&right), false, false)
            }
            Opcode::Rem => {
                if right == 0 {
                    return Err(SimError::DivisionByZero);
                }
                (left.mod_floor(&right), false, false)
            }
            Opcode::Sll => {
                let amount = (right as u32) & 0x1F;
                (((left as u32) << amount) as i32, false, false)
            }
            Opcode::Srl => {
                let amount = (right as u32) & 0x1F;
                (((left as u32) >> amount) as i32, false, false)
            }
            Opcode::And => (left & right, false, false),
            Opcode::Or => (left | right, false, false),
            Opcode::Xor => (left ^ right, false, false),
            other => unreachable!("alu() called with non-ALU opcode {:?}", other),
        };

        self.flags = Flags {
            zero: result == 0,
            negative: result < 0,
            overflow,
            carry,
        };

        Ok(result)
    }
}

fn out_of_i32_range(wide: i64) -> bool {
    wide < i32::MIN as i64 || wide > i32::MAX as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> DataPath {
        DataPath::new(64)
    }

    #[test]
    fn zero_register_reads_zero_and_ignores_writes() {
        let mut dp = path();
        dp.write_register(Register::Zero, 123);
        assert_eq!(dp.read_register(Register::Zero), 0);
    }

    #[test]
    fn sp_initialized_to_data_memory_size() {
        let dp = path();
        assert_eq!(dp.read_register(Register::Sp), 64);
    }

    #[test]
    fn store_and_restore_registers_round_trip() {
        let mut dp = path();
        dp.write_register(Register::T0, 7);
        dp.store_registers();
        dp.write_register(Register::T0, 99);
        dp.restore_registers();
        assert_eq!(dp.read_register(Register::T0), 7);
    }

    #[test]
    fn writing_to_input_address_is_fatal() {
        let mut dp = path();
        dp.latch_data_address(crate::constants::INPUT_ADDRESS).unwrap();
        assert_eq!(dp.memory_store(1), Err(SimError::WritingToInputAddress));
    }

    #[test]
    fn reading_from_output_address_is_fatal() {
        let mut dp = path();
        dp.latch_data_address(crate::constants::OUTPUT_ADDRESS).unwrap();
        assert_eq!(dp.memory_load(), Err(SimError::ReadingFromOutputAddress));
    }

    #[test]
    fn output_writes_accumulate_in_order() {
        let mut dp = path();
        dp.latch_data_address(crate::constants::OUTPUT_ADDRESS).unwrap();
        dp.memory_store(1).unwrap();
        dp.memory_store(2).unwrap();
        assert_eq!(dp.output_buffer(), &[1, 2]);
    }

    #[test]
    fn input_reads_are_fifo_and_fail_when_empty() {
        let mut dp = path();
        dp.queue_input(10);
        dp.queue_input(20);
        dp.latch_data_address(crate::constants::INPUT_ADDRESS).unwrap();
        assert_eq!(dp.memory_load(), Ok(10));
        assert_eq!(dp.memory_load(), Ok(20));
        assert_eq!(dp.memory_load(), Err(SimError::EmptyInputBuffer));
    }

    #[test]
    fn variable_store_and_load_round_trip() {
        let mut dp = path();
        dp.latch_data_address(10).unwrap();
        dp.memory_store(555).unwrap();
        dp.latch_data_address(10).unwrap();
        assert_eq!(dp.memory_load(), Ok(555));
    }

    #[test]
    fn latch_out_of_range_address_fails() {
        let mut dp = path();
        assert_eq!(
            dp.latch_data_address(1000),
            Err(SimError::InvalidDataAddress { address: 1000 })
        );
    }

    #[test]
    fn div_and_rem_are_floor_semantics() {
        let mut dp = path();
        assert_eq!(dp.alu(Opcode::Div, -7, 2).unwrap(), -4);
        assert_eq!(dp.alu(Opcode::Rem, -7, 2).unwrap(), 1);
    }

    #[test]
    fn div_by_zero_is_an_error() {
        let mut dp = path();
        assert_eq!(dp.alu(Opcode::Div, 1, 0), Err(SimError::DivisionByZero));
    }

    #[test]
    fn add_sets_overflow_on_range_escape() {
        let mut dp = path();
        let result = dp.alu(Opcode::Add, i32::MAX, 1).unwrap();
        assert_eq!(result, i32::MIN);
        assert!(dp.flags.overflow);
    }

    #[test]
    fn every_alu_op_updates_zero_and_negative() {
        let mut dp = path();
        dp.alu(Opcode::And, 0, 1).unwrap();
        assert!(dp.flags.zero);
        dp.alu(Opcode::Or, -1, 0).unwrap();
        assert!(dp.flags.negative);
    }

    #[test]
    fn adc_reports_unsigned_carry() {
        let mut dp = path();
        dp.alu(Opcode::Adc, -1, 1).unwrap();
        assert!(dp.flags.carry);
    }
}
