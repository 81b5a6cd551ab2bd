//! The control unit: fetch/decode/execute state machine, interrupt
//! entry/exit, and tick-accurate modelling. Owns the single [`DataPath`]
//! instance exclusively; all mutable simulator state lives in one
//! `Machine` value (design note in spec.md §9: no cross-component
//! aliasing of register file, memory, flags, PC).

use crate::constants::{INSTRUCTION_MEMORY_SIZE, INTERRUPTS_HANDLER_ADDRESS};
use crate::datapath::DataPath;
use crate::error::SimError;
use crate::isa::{Instruction, Opcode, Register};

/// Processor states. Two admissible schemes exist upstream (three- or
/// four-state); this one keeps `INT_ENTER`'s two sub-steps distinct from
/// `INT_BODY` so the step counter means the same thing in every state.
/// `INT_EXIT` has no state of its own: `rint` performs the restore and
/// returns to `Normal` within the same tick it is fetched on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum State {
    Normal,
    IntEnter,
    IntBody,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    Continue,
    Halted,
}

fn no_op() -> Instruction {
    Instruction::I {
        opcode: Opcode::Addi,
        rd: Register::Zero,
        rs1: Register::Zero,
        imm: 0,
    }
}

pub struct Machine {
    data_path: DataPath,
    instruction_memory: Vec<Instruction>,
    pc: u32,
    tick_count: u64,
    step: u8,
    state: State,
    interrupts_enabled: bool,
    interrupt_request: bool,
    pc_save: u32,
}

impl Machine {
    pub fn new(instructions: Vec<Instruction>, data_memory_size: u32) -> Machine {
        assert!(
            instructions.len() <= INSTRUCTION_MEMORY_SIZE,
            "program does not fit in instruction memory"
        );

        let mut instruction_memory = vec![no_op(); INSTRUCTION_MEMORY_SIZE];
        for (i, instr) in instructions.into_iter().enumerate() {
            instruction_memory[i] = instr;
        }

        Machine {
            data_path: DataPath::new(data_memory_size),
            instruction_memory,
            pc: 0,
            tick_count: 0,
            step: 0,
            state: State::Normal,
            interrupts_enabled: false,
            interrupt_request: false,
            pc_save: 0,
        }
    }

    pub fn output_buffer(&self) -> &[i32] {
        self.data_path.output_buffer()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn queue_input(&mut self, value: i32) {
        self.data_path.queue_input(value);
    }

    pub fn load_data(&mut self, address: u32, value: i32) -> Result<(), SimError> {
        self.data_path.load_data(address, value)
    }

    /// Step 1 of the interrupt protocol: called by the driver when the
    /// current tick appears in the input schedule. Ignored if
    /// interrupts are disabled or the processor is already servicing
    /// one.
    pub fn request_interrupt(&mut self, value: i32) {
        if !self.interrupts_enabled || self.state != State::Normal {
            return;
        }
        self.data_path.queue_input(value);
        self.interrupt_request = true;
    }

    /// Advances the simulator by exactly one tick.
    pub fn tick(&mut self) -> Result<TickOutcome, SimError> {
        self.tick_count += 1;

        if self.interrupt_request && self.step == 0 && self.state == State::Normal {
            self.state = State::IntEnter;
            self.interrupt_request = false;
        }

        match self.state {
            State::IntEnter => self.tick_int_enter(),
            State::Normal | State::IntBody => self.tick_fetch_execute(),
        }
    }

    fn tick_int_enter(&mut self) -> Result<TickOutcome, SimError> {
        match self.step {
            0 => {
                self.data_path.store_registers();
                self.pc_save = self.pc;
                self.step = 1;
            }
            _ => {
                self.pc = INTERRUPTS_HANDLER_ADDRESS;
                self.step = 0;
                self.state = State::IntBody;
            }
        }
        Ok(TickOutcome::Continue)
    }

    /// `rint`'s restore step: folded into the same tick as its fetch, not
    /// a separate state, so `rint` costs exactly one tick total.
    fn int_exit(&mut self) -> Result<TickOutcome, SimError> {
        self.data_path.restore_registers();
        self.pc = self.pc_save;
        self.state = State::Normal;
        Ok(TickOutcome::Continue)
    }

    fn fetch(&self) -> Result<Instruction, SimError> {
        self.instruction_memory
            .get(self.pc as usize)
            .copied()
            .ok_or(SimError::InvalidProgramCounter { pc: self.pc })
    }

    fn advance_pc(&mut self) {
        self.pc = self.pc.wrapping_add(1);
    }

    fn tick_fetch_execute(&mut self) -> Result<TickOutcome, SimError> {
        let instruction = self.fetch()?;

        match instruction {
            Instruction::Plain { opcode: Opcode::Halt } => return Ok(TickOutcome::Halted),

            Instruction::Plain { opcode: Opcode::Rint } => {
                self.step = 0;
                return self.int_exit();
            }

            Instruction::Plain { opcode: Opcode::Eint } => {
                self.interrupts_enabled = true;
                self.advance_pc();
            }

            Instruction::Plain { opcode: Opcode::Dint } => {
                self.interrupts_enabled = false;
                self.advance_pc();
            }

            Instruction::U { opcode: Opcode::Lui, rd, imm } => {
                self.data_path.write_register(rd, imm << 12);
                self.advance_pc();
            }

            Instruction::I { opcode: Opcode::Addi, rd, rs1, imm } => {
                let value = self.data_path.read_register(rs1).wrapping_add(imm);
                self.data_path.write_register(rd, value);
                self.advance_pc();
            }

            Instruction::I { opcode: Opcode::Lw, rd, rs1, imm } => {
                if self.step == 0 {
                    let address = self.data_path.read_register(rs1).wrapping_add(imm) as u32;
                    self.data_path.latch_data_address(address)?;
                    self.step = 1;
                } else {
                    let value = self.data_path.memory_load()?;
                    self.data_path.write_register(rd, value);
                    self.advance_pc();
                    self.step = 0;
                }
            }

            Instruction::S { opcode: Opcode::Sw, rs1, rs2 } => {
                if self.step == 0 {
                    let address = self.data_path.read_register(rs1) as u32;
                    self.data_path.latch_data_address(address)?;
                    self.step = 1;
                } else {
                    let value = self.data_path.read_register(rs2);
                    self.data_path.memory_store(value)?;
                    self.advance_pc();
                    self.step = 0;
                }
            }

            Instruction::R { opcode, rd, rs1, rs2 } => {
                let left = self.data_path.read_register(rs1);
                let right = self.data_path.read_register(rs2);
                let result = self.data_path.alu(opcode, left, right)?;
                self.data_path.write_register(rd, result);
                self.advance_pc();
            }

            Instruction::B { opcode, rs1, rs2, imm } => {
                if self.step == 0 {
                    let left = self.data_path.read_register(rs1);
                    let right = self.data_path.read_register(rs2);
                    self.data_path.alu(Opcode::Sub, left, right)?;
                    self.step = 1;
                } else {
                    let flags = self.data_path.flags;
                    let taken = match opcode {
                        Opcode::Beq => flags.zero,
                        Opcode::Bne => !flags.zero,
                        Opcode::Bgt => !flags.zero && (flags.negative == flags.overflow),
                        Opcode::Blt => flags.negative != flags.overflow,
                        other => unreachable!("non-branch opcode {:?} in B-shape", other),
                    };
                    if taken {
                        self.pc = (self.pc as i32).wrapping_add(imm) as u32;
                    } else {
                        self.advance_pc();
                    }
                    self.step = 0;
                }
            }

            Instruction::J { imm, .. } => {
                self.pc = (self.pc as i32).wrapping_add(imm) as u32;
            }

            Instruction::Jr { rs1, imm, .. } => {
                self.pc = (self.data_path.read_register(rs1).wrapping_add(imm)) as u32;
            }

            other => unreachable!("opcode/shape mismatch: {:?}", other),
        }

        Ok(TickOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::{Instruction, Opcode, Register};

    fn run_to_halt(instructions: Vec<Instruction>) -> Machine {
        let mut machine = Machine::new(instructions, 64);
        loop {
            match machine.tick().unwrap() {
                TickOutcome::Halted => return machine,
                TickOutcome::Continue => {}
            }
        }
    }

    #[test]
    fn halt_stops_immediately() {
        let machine = run_to_halt(vec![Instruction::Plain { opcode: Opcode::Halt }]);
        assert_eq!(machine.tick_count(), 1);
    }

    #[test]
    fn addi_and_add() {
        let machine = run_to_halt(vec![
            Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: 2 },
            Instruction::I { opcode: Opcode::Addi, rd: Register::T1, rs1: Register::Zero, imm: 3 },
            Instruction::R { opcode: Opcode::Add, rd: Register::T2, rs1: Register::T0, rs2: Register::T1 },
            Instruction::Plain { opcode: Opcode::Halt },
        ]);
        assert_eq!(machine.tick_count(), 4);
    }

    #[test]
    fn store_then_load_round_trips_through_memory() {
        let mut machine = Machine::new(
            vec![
                Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: 77 },
                Instruction::I { opcode: Opcode::Addi, rd: Register::T1, rs1: Register::Zero, imm: 10 },
                Instruction::S { opcode: Opcode::Sw, rs1: Register::T1, rs2: Register::T0 },
                Instruction::I { opcode: Opcode::Lw, rd: Register::T2, rs1: Register::T1, imm: 0 },
                Instruction::Plain { opcode: Opcode::Halt },
            ],
            64,
        );
        loop {
            if machine.tick().unwrap() == TickOutcome::Halted {
                break;
            }
        }
    }

    #[test]
    fn beq_branches_when_equal() {
        // t0 = 5; beq t0,t0,+3 (taken, skip the "wrong" addi); halt
        let machine = run_to_halt(vec![
            Instruction::I { opcode: Opcode::Addi, rd: Register::T0, rs1: Register::Zero, imm: 5 },
            Instruction::B { opcode: Opcode::Beq, rs1: Register::T0, rs2: Register::T0, imm: 3 },
            Instruction::I { opcode: Opcode::Addi, rd: Register::T1, rs1: Register::Zero, imm: 999 },
            Instruction::Plain { opcode: Opcode::Halt },
        ]);
        assert_eq!(machine.tick_count(), 1 + 2 + 1);
    }

    #[test]
    fn jump_adds_immediate_to_pc() {
        let machine = run_to_halt(vec![
            Instruction::J { opcode: Opcode::J, imm: 2 },
            Instruction::Plain { opcode: Opcode::Halt }, // skipped
            Instruction::Plain { opcode: Opcode::Halt },
        ]);
        assert_eq!(machine.tick_count(), 2);
    }

    #[test]
    fn interrupt_runs_handler_then_returns() {
        let mut instructions = vec![Instruction::Plain { opcode: Opcode::Eint }];
        instructions.resize(
            crate::constants::INTERRUPTS_HANDLER_ADDRESS as usize,
            Instruction::I { opcode: Opcode::Addi, rd: Register::Zero, rs1: Register::Zero, imm: 0 },
        );
        instructions.push(Instruction::Plain { opcode: Opcode::Rint });

        let mut machine = Machine::new(instructions, 64);
        assert_eq!(machine.tick().unwrap(), TickOutcome::Continue); // eint
        machine.request_interrupt(42);

        // INT_ENTER (2 ticks) + INT_BODY rint, which restores and returns in
        // the same tick (1 tick)
        for _ in 0..3 {
            assert_eq!(machine.tick().unwrap(), TickOutcome::Continue);
        }
        assert_eq!(machine.tick_count(), 4);
    }
}
