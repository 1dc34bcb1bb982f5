use thiserror::Error;

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Character offset of the first character of the token
    pub offset: usize,
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }

    pub fn is_end_of_input(&self) -> bool {
        self.kind == TokenKind::EndOfInput
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Error(LexerErrorKind),

    // Atoms
    Name,
    Int,
    Float,
    Str,

    // Keywords
    And,
    Else,
    False,
    If,
    In,
    None,
    Not,
    Or,
    True,

    // Punctuation
    CloseBrace,
    CloseBracket,
    CloseParen,
    Colon,
    Comma,
    Dot,
    DoubleSlash,
    DoubleStar,
    EqEq,
    Equals,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Minus,
    NotEq,
    OpenBrace,
    OpenBracket,
    OpenParen,
    Percent,
    Plus,
    Slash,
    Star,

    // Trivia and structure
    Comment,
    EndOfInput,
    Newline,
    Whitespace,
}

impl TokenKind {
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    /// Fixed spelling of punctuation and keyword tokens, used in parser diagnostics.
    pub fn get_fixed_str(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::And => "and",
            TokenKind::Else => "else",
            TokenKind::False => "False",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::None => "None",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::True => "True",
            TokenKind::CloseBrace => "}",
            TokenKind::CloseBracket => "]",
            TokenKind::CloseParen => ")",
            TokenKind::Colon => ":",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::DoubleSlash => "//",
            TokenKind::DoubleStar => "**",
            TokenKind::EqEq => "==",
            TokenKind::Equals => "=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Minus => "-",
            TokenKind::NotEq => "!=",
            TokenKind::OpenBrace => "{",
            TokenKind::OpenBracket => "[",
            TokenKind::OpenParen => "(",
            TokenKind::Percent => "%",
            TokenKind::Plus => "+",
            TokenKind::Slash => "/",
            TokenKind::Star => "*",
            _ => return None,
        })
    }
}

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[error("{kind} at offset {offset}")]
pub struct LexerError {
    pub kind: LexerErrorKind,
    pub offset: usize,
}

#[derive(Error, Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LexerErrorKind {
    #[error("unexpected character {0:?}")]
    UnexpectedCharacter(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unbalanced closing bracket")]
    UnbalancedBracket,
}
