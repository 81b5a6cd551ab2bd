//! Translation error taxonomy (§7). Every stage returns its own
//! precise error; `TranslateError` composes them for the CLI boundary.

use crate::token::TokenKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessError {
    #[error("included file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not read included file {0}: {1}")]
    ReadError(PathBuf, String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("literal starting at byte {start} was never closed")]
    UnterminatedLiteral { start: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected token {actual:?}{}", expected.map(|e| format!(", expected {:?}", e)).unwrap_or_default())]
    UnexpectedToken {
        actual: TokenKind,
        expected: Option<TokenKind>,
    },
    #[error("symbol \"{0}\" is not defined")]
    UndefinedSymbol(String),
    #[error("name \"{0}\" is already in use")]
    NameIsAlreadyInUse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    #[error("immediate {value} does not fit in {width} bits")]
    ImmediateOutOfRange { value: i32, width: u32 },
    #[error("program does not fit in instruction memory")]
    InstructionMemoryOverflow,
    #[error("main code overlaps the interrupt handler block")]
    MainOverlapsInterrupts,
    #[error("data value {value} out of signed 32-bit range")]
    DataValueOutOfRange { value: i64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

impl From<stackvm::EncodeError> for CodegenError {
    fn from(err: stackvm::EncodeError) -> CodegenError {
        match err {
            stackvm::EncodeError::ImmediateOutOfRange { value, width } => {
                CodegenError::ImmediateOutOfRange { value, width }
            }
        }
    }
}
