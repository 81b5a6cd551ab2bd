//! Front end for the stack language: preprocessing, lexing, parsing,
//! code generation, and the binary/hex/JSON encodings of a linked
//! program (§4, §5). [`translate`] chains every stage for the common
//! case of translating a single in-memory source string with no
//! includes; callers that need `#include` splicing run
//! [`preprocessor::preprocess`] first and pass its output in here.

pub mod ast;
pub mod binfmt;
mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod preprocessor;
pub mod token;

pub use codegen::{generate, CodegenOutput};
pub use error::TranslateError;
pub use parser::{ParseOutput, Parser};

/// Runs lexing, parsing, and code generation over already-preprocessed
/// source text.
pub fn translate(source: &str) -> Result<CodegenOutput, TranslateError> {
    let parsed = Parser::new(source).parse()?;
    let output = generate(&parsed.ast, &parsed.literals)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_a_trivial_program_end_to_end() {
        let output = translate("2 3 + print").unwrap();
        assert!(!output.instructions.is_empty());
    }

    #[test]
    fn undefined_symbol_surfaces_as_a_translate_error() {
        let err = translate("missing").unwrap_err();
        assert!(matches!(err, TranslateError::Parse(_)));
    }
}
