use muncher::Muncher;
use phf::{self, phf_map};

use crate::token::{LexerError, LexerErrorKind, Token, TokenKind};

static KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "and" => TokenKind::And,
    "else" => TokenKind::Else,
    "False" => TokenKind::False,
    "if" => TokenKind::If,
    "in" => TokenKind::In,
    "None" => TokenKind::None,
    "not" => TokenKind::Not,
    "or" => TokenKind::Or,
    "True" => TokenKind::True,
};

/// Peek at the next unconsumed character without moving the peek cursor.
#[inline]
fn peek_char(m: &Muncher) -> Option<char> {
    m.reset_peek();
    let c = m.peek().copied();
    m.reset_peek();
    c
}

fn is_space_or_tab(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[inline]
fn scan_comment(m: &mut Muncher) {
    // A comment runs to the end of the line; the newline itself is a separate token
    m.eat_until_count(|c| *c == '\n');
}

#[inline]
fn scan_quoted_value(m: &mut Muncher, quote_char: char) -> TokenKind {
    while let Some(c) = m.eat() {
        match c {
            c if c == quote_char => return TokenKind::Str,
            '\\' => {
                // Whatever follows a backslash is part of the literal, including a newline
                if m.eat().is_none() {
                    break;
                }
            }
            '\n' => break,
            _ => {}
        }
    }

    TokenKind::Error(LexerErrorKind::UnterminatedString)
}

/// Scan the rest of a number whose first character has already been eaten. `chars` is the
/// full input, needed for the two-character lookahead that separates `1.5` from `1 .real`.
#[inline]
fn scan_number(first_char: char, m: &mut Muncher, chars: &[char]) -> TokenKind {
    let mut kind = TokenKind::Int;
    let digits = |c: &char| !(c.is_ascii_digit() || *c == '_');

    if first_char == '.' {
        kind = TokenKind::Float;
    }
    m.eat_until_count(digits);

    if kind == TokenKind::Int && peek_char(m) == Some('.') {
        let after_dot = chars.get(m.char_position() + 1).copied();
        if !after_dot.is_some_and(is_name_start) {
            m.eat();
            m.eat_until_count(digits);
            kind = TokenKind::Float;
        }
    }

    if matches!(peek_char(m), Some('e' | 'E')) {
        let pos = m.char_position();
        let exponent_digit = match chars.get(pos + 1) {
            Some('+' | '-') => chars.get(pos + 2),
            other => other,
        };
        if exponent_digit.is_some_and(|c| c.is_ascii_digit()) {
            m.eat();
            if matches!(peek_char(m), Some('+' | '-')) {
                m.eat();
            }
            m.eat_until_count(digits);
            kind = TokenKind::Float;
        }
    }

    kind
}

fn single_or_double(
    m: &mut Muncher,
    second: char,
    single: TokenKind,
    double: TokenKind,
) -> TokenKind {
    if peek_char(m) == Some(second) {
        m.eat();
        double
    } else {
        single
    }
}

/// Tokenizer for literal values, lazy expressions and source documents.
///
/// Newlines are only significant outside of brackets: inside `()`, `[]` or `{}` they are
/// reported as whitespace, which gives source documents implicit line joining.
pub struct Lexer<'input> {
    muncher: Muncher<'input>,
    chars: Vec<char>,
    depth: usize,
    skip_trivia: bool,
    token: Token,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str, skip_trivia: bool) -> Lexer<'input> {
        let mut ret = Lexer {
            muncher: Muncher::new(input),
            chars: input.chars().collect(),
            depth: 0,
            skip_trivia,
            token: Token {
                kind: TokenKind::EndOfInput,
                text: String::new(),
                offset: 0,
            },
        };
        ret.advance();
        ret
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn advance(&mut self) {
        self.advance_internal();

        while self.skip_trivia && self.token.is_trivia() {
            self.advance_internal();
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize) -> Token {
        let end = self.muncher.char_position().min(self.chars.len());
        Token {
            kind,
            text: self.chars[start..end].iter().collect(),
            offset: start,
        }
    }

    fn advance_internal(&mut self) {
        let mut depth = self.depth;
        let m = &mut self.muncher;
        let start = m.char_position();

        let Some(c) = m.eat() else {
            self.token = self.make_token(TokenKind::EndOfInput, start);
            return;
        };

        let kind = match c {
            c if is_space_or_tab(c) => {
                m.eat_until_count(|c| !is_space_or_tab(*c));
                TokenKind::Whitespace
            }
            '\n' if depth > 0 => TokenKind::Whitespace,
            '\n' => TokenKind::Newline,
            '\\' if peek_char(m) == Some('\n') => {
                // Explicit line continuation
                m.eat();
                TokenKind::Whitespace
            }
            '#' => {
                scan_comment(m);
                TokenKind::Comment
            }
            '\'' | '"' => scan_quoted_value(m, c),
            c if c.is_ascii_digit() => scan_number(c, m, &self.chars),
            '.' if peek_char(m).is_some_and(|c| c.is_ascii_digit()) => {
                scan_number(c, m, &self.chars)
            }
            c if is_name_start(c) => {
                m.eat_until_count(|c| !is_name_char(*c));
                let end = m.char_position();
                let word: String = self.chars[start..end].iter().collect();
                KEYWORDS.get(word.as_str()).copied().unwrap_or(TokenKind::Name)
            }
            '(' | '[' | '{' => {
                depth += 1;
                match c {
                    '(' => TokenKind::OpenParen,
                    '[' => TokenKind::OpenBracket,
                    _ => TokenKind::OpenBrace,
                }
            }
            ')' | ']' | '}' => match depth.checked_sub(1) {
                Some(outer) => {
                    depth = outer;
                    match c {
                        ')' => TokenKind::CloseParen,
                        ']' => TokenKind::CloseBracket,
                        _ => TokenKind::CloseBrace,
                    }
                }
                None => TokenKind::Error(LexerErrorKind::UnbalancedBracket),
            },
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '%' => TokenKind::Percent,
            '*' => single_or_double(m, '*', TokenKind::Star, TokenKind::DoubleStar),
            '/' => single_or_double(m, '/', TokenKind::Slash, TokenKind::DoubleSlash),
            '=' => single_or_double(m, '=', TokenKind::Equals, TokenKind::EqEq),
            '<' => single_or_double(m, '=', TokenKind::Less, TokenKind::LessEq),
            '>' => single_or_double(m, '=', TokenKind::Greater, TokenKind::GreaterEq),
            '!' if peek_char(m) == Some('=') => {
                m.eat();
                TokenKind::NotEq
            }
            c => TokenKind::Error(LexerErrorKind::UnexpectedCharacter(c)),
        };

        self.depth = depth;
        self.token = self.make_token(kind, start);
    }
}

/// Tokenize `data`, dropping whitespace and comments. The returned list always ends with an
/// [`TokenKind::EndOfInput`] token.
pub fn tokenize(data: &str) -> Result<Vec<Token>, LexerError> {
    let mut lexer = Lexer::new(data, true);
    let mut ret = vec![];

    loop {
        let token = lexer.token().clone();
        if let TokenKind::Error(kind) = token.kind {
            return Err(LexerError {
                kind,
                offset: token.offset,
            });
        }

        let done = token.is_end_of_input();
        ret.push(token);
        if done {
            return Ok(ret);
        }
        lexer.advance();
    }
}
