//! Turns decoded `(address, value)` records from `stackvm_lang::binfmt`
//! into the flat, index-addressed vectors [`stackvm::Machine::new`]
//! expects. No teacher analogue (`vex/src/lib.rs`'s `Executable` is a
//! length-prefixed blob, not an address/value record stream) — grounded
//! on spec.md §5/§6's record format directly.

use stackvm::Instruction;
use stackvm_lang::binfmt::WordRecord;

fn nop() -> Instruction {
    Instruction::I {
        opcode: stackvm::Opcode::Addi,
        rd: stackvm::Register::Zero,
        rs1: stackvm::Register::Zero,
        imm: 0,
    }
}

/// Builds an instruction-memory image: every gap between records (most
/// notably the one between the end of main code and the interrupt
/// handler's fixed address) is filled with a no-op.
pub fn instructions_from_records(records: &[WordRecord]) -> Option<Vec<Instruction>> {
    let highest = records.iter().map(|r| r.address).max().unwrap_or(0);
    let mut image = vec![nop(); highest as usize + 1];
    for record in records {
        image[record.address as usize] = Instruction::decode(record.value)?;
    }
    Some(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_gaps_between_records_with_no_ops() {
        let halt = Instruction::Plain { opcode: stackvm::Opcode::Halt };
        let records = vec![
            WordRecord { address: 0, value: halt.encode().unwrap() },
            WordRecord { address: 3, value: halt.encode().unwrap() },
        ];
        let image = instructions_from_records(&records).unwrap();
        assert_eq!(image.len(), 4);
        assert_eq!(image[0], halt);
        assert_eq!(image[1], nop());
        assert_eq!(image[2], nop());
        assert_eq!(image[3], halt);
    }

    #[test]
    fn an_unrecognized_word_yields_none() {
        let records = vec![WordRecord { address: 0, value: 0xFFFF_FFFF }];
        assert_eq!(instructions_from_records(&records), None);
    }
}
