pub mod lexer;
pub mod token;

pub use lexer::{Lexer, tokenize};
pub use token::{LexerError, LexerErrorKind, Token, TokenKind};
