use cfgx_lexer::{LexerError, LexerErrorKind};
use thiserror::Error;

pub mod ast;
pub mod parser;

pub use parser::{parse_document, parse_expression};

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    #[error("{0}")]
    Lexer(LexerErrorKind),

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("invalid literal {0}")]
    InvalidLiteral(String),
}

impl From<LexerError> for ParseError {
    fn from(err: LexerError) -> Self {
        ParseError {
            offset: err.offset,
            kind: ParseErrorKind::Lexer(err.kind),
        }
    }
}

pub type ParserResult<T> = Result<T, ParseError>;
