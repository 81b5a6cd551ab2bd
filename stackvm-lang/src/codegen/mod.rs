//! Code generation (§4.4): walks the AST, emitting a straight-line
//! instruction stream interleaved with branch/jump/label stubs, then
//! resolves those stubs to a fixed point and lays out the data segment.
//! Grounded on `original_source/src/translator/code_generator/code_generator.py`'s
//! per-node `visit_*` dispatch, generalized to the stub-based resolver
//! in [`stubs`] since this target's narrower immediates can't assume
//! every branch and jump fits in one instruction the way the original
//! does.

mod producers;
mod stubs;

use crate::ast::Ast;
use crate::error::CodegenError;
use crate::token::TokenKind;
use stackvm::constants::{DATA_AREA_START, INSTRUCTION_MEMORY_SIZE, INTERRUPTS_HANDLER_ADDRESS};
use stackvm::{Instruction, Opcode, Register};
use std::collections::HashMap;
use stubs::Item;

/// Final linked program. `instructions` is address-tagged rather than a
/// plain contiguous vector because the interrupt handler is linked at
/// the fixed [`INTERRUPTS_HANDLER_ADDRESS`], leaving a gap between it
/// and the end of main code.
pub struct CodegenOutput {
    pub instructions: Vec<(u32, Instruction)>,
    pub data: Vec<i32>,
}

struct Codegen<'a> {
    symbol_table: HashMap<String, u32>,
    data: Vec<i32>,
    literals: &'a [String],
    next_label: usize,
    interrupt_stream: Vec<Item>,
}

impl<'a> Codegen<'a> {
    fn new_label(&mut self) -> usize {
        let id = self.next_label;
        self.next_label += 1;
        id
    }

    fn declare(&mut self, name: &str, words: usize) -> u32 {
        let address = DATA_AREA_START + self.data.len() as u32;
        self.symbol_table.insert(name.to_string(), address);
        self.data.extend(std::iter::repeat(0).take(words));
        address
    }

    fn visit(&mut self, ast: &Ast, out: &mut Vec<Item>) -> Result<(), CodegenError> {
        match ast {
            Ast::Block(children) => {
                for child in children {
                    self.visit(child, out)?;
                }
            }

            Ast::Operation(kind) => {
                out.extend(producers::operation_sequence(*kind).into_iter().map(Item::Instr));
            }

            Ast::Number(value) => {
                out.extend(producers::push_number(*value).into_iter().map(Item::Instr));
            }

            Ast::ExtendedNumber(value) => {
                out.extend(producers::push_extended_number(*value).into_iter().map(Item::Instr));
            }

            Ast::Symbol(name) => {
                let address = *self
                    .symbol_table
                    .get(name)
                    .expect("parser only emits Ast::Symbol for names it has already declared");
                out.extend(producers::push_symbol_address(address).into_iter().map(Item::Instr));
            }

            // A bare literal (not wrapped in a `str` declaration) only
            // reserves its data; like the original, it has no stack
            // effect of its own.
            Ast::Literal(id) => {
                self.lay_out_literal(*id);
            }

            Ast::VariableDeclaration(name) => {
                self.declare(name, 1);
            }

            Ast::DVariableDeclaration(name) => {
                self.declare(name, 2);
            }

            Ast::StringDeclaration(name, literal_id) => {
                let address = DATA_AREA_START + self.data.len() as u32;
                self.symbol_table.insert(name.clone(), address);
                self.lay_out_literal(*literal_id);
            }

            Ast::MemoryBlockDeclaration(name, size) => {
                self.declare(name, *size as usize);
            }

            Ast::IfStatement(if_body, else_body) => {
                let else_label = self.new_label();
                let end_label = self.new_label();

                out.extend(producers::pop_to_register(Register::T0).into_iter().map(Item::Instr));
                out.push(Item::Branch {
                    opcode: Opcode::Beq,
                    rs1: Register::T0,
                    rs2: Register::Zero,
                    label: else_label,
                    size: 1,
                });
                self.visit(if_body, out)?;
                out.push(Item::Jump { label: end_label, size: 1 });
                out.push(Item::Label(else_label));
                if let Some(else_body) = else_body {
                    self.visit(else_body, out)?;
                }
                out.push(Item::Label(end_label));
            }

            Ast::WhileStatement(body) => {
                let head_label = self.new_label();
                out.push(Item::Label(head_label));
                self.visit(body, out)?;
                out.extend(producers::pop_to_register(Register::T0).into_iter().map(Item::Instr));
                out.push(Item::Branch {
                    opcode: Opcode::Bne,
                    rs1: Register::T0,
                    rs2: Register::Zero,
                    label: head_label,
                    size: 1,
                });
            }

            // The grammar forbids a nested `begin_int`, so the body is
            // always a plain word/control-flow sequence; it is linked
            // into its own stream rather than `out`.
            Ast::Interrupt(body) => {
                let mut body_stream = Vec::new();
                self.visit(body, &mut body_stream)?;
                body_stream.push(Item::Instr(Instruction::Plain { opcode: Opcode::Rint }));
                self.interrupt_stream.extend(body_stream);
            }
        }
        Ok(())
    }

    fn lay_out_literal(&mut self, literal_id: usize) {
        let text = &self.literals[literal_id];
        self.data.push(text.chars().count() as i32);
        self.data.extend(text.chars().map(|c| c as i32));
    }
}

pub fn generate(ast: &Ast, literals: &[String]) -> Result<CodegenOutput, CodegenError> {
    let mut codegen =
        Codegen { symbol_table: HashMap::new(), data: Vec::new(), literals, next_label: 0, interrupt_stream: Vec::new() };

    let mut main_stream = Vec::new();
    codegen.visit(ast, &mut main_stream)?;
    main_stream.push(Item::Instr(Instruction::Plain { opcode: Opcode::Halt }));

    let main_instructions = stubs::resolve(&main_stream, 0)?;
    if main_instructions.len() as u32 > INTERRUPTS_HANDLER_ADDRESS {
        return Err(CodegenError::MainOverlapsInterrupts);
    }

    let interrupt_instructions = stubs::resolve(&codegen.interrupt_stream, INTERRUPTS_HANDLER_ADDRESS)?;
    if INTERRUPTS_HANDLER_ADDRESS as usize + interrupt_instructions.len() > INSTRUCTION_MEMORY_SIZE {
        return Err(CodegenError::InstructionMemoryOverflow);
    }

    let mut instructions = main_instructions;
    instructions.extend(interrupt_instructions);

    Ok(CodegenOutput { instructions, data: codegen.data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn generate_source(source: &str) -> CodegenOutput {
        let parsed = Parser::new(source).parse().unwrap();
        generate(&parsed.ast, &parsed.literals).unwrap()
    }

    #[test]
    fn add_two_numbers_ends_in_halt() {
        let out = generate_source("2 3 + print");
        let (_, last) = out.instructions.iter().filter(|(addr, _)| *addr < INTERRUPTS_HANDLER_ADDRESS).last().unwrap();
        assert_eq!(*last, Instruction::Plain { opcode: Opcode::Halt });
    }

    #[test]
    fn variable_declaration_reserves_one_data_cell() {
        let out = generate_source("var x 5 x store");
        assert_eq!(out.data.len(), 1);
    }

    #[test]
    fn if_else_emits_both_branches_and_a_join() {
        let out = generate_source("0 if 1 print else 2 print then");
        assert!(out.instructions.iter().any(|(_, i)| matches!(i, Instruction::B { opcode: Opcode::Beq, .. })));
        assert!(out.instructions.iter().any(|(_, i)| matches!(i, Instruction::J { .. })));
    }

    #[test]
    fn loop_emits_a_backward_branch() {
        let out = generate_source("5 begin dup print 1 - dup until drop");
        assert!(out
            .instructions
            .iter()
            .any(|(_, i)| matches!(i, Instruction::B { opcode: Opcode::Bne, imm, .. } if *imm < 0)));
    }

    #[test]
    fn string_declaration_lays_out_a_pascal_string() {
        let out = generate_source("str msg \" hi\"");
        // length cell + 2 characters
        assert!(out.data.len() >= 3);
        assert_eq!(out.data[0], 2);
    }

    #[test]
    fn interrupt_block_is_linked_after_the_fixed_handler_address() {
        let out = generate_source("begin_int read print end_int 1 print");
        let handler: Vec<_> = out.instructions.iter().filter(|(addr, _)| *addr >= INTERRUPTS_HANDLER_ADDRESS).collect();
        assert!(!handler.is_empty());
        assert!(matches!(handler.last(), Some((_, Instruction::Plain { opcode: Opcode::Rint }))));
    }

    #[test]
    fn main_overlapping_interrupts_is_fatal() {
        let mut source = String::new();
        for _ in 0..70000 {
            source.push_str("1 drop ");
        }
        let parsed = Parser::new(&source).parse().unwrap();
        let err = generate(&parsed.ast, &parsed.literals).unwrap_err();
        assert_eq!(err, CodegenError::MainOverlapsInterrupts);
    }
}
