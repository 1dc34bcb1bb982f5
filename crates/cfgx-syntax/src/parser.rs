use cfgx_lexer::{Token, TokenKind, tokenize};
use cfgx_util::quote::unquote;
use itertools::Itertools;

use crate::ast::{
    BinaryOp, BoolOp, CompareOp, Constant, Document, Expr, Statement, Subscript, UnaryOp,
};
use crate::{ParseError, ParseErrorKind, ParserResult};

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> ParserResult<Parser> {
        Ok(Parser {
            tokens: tokenize(input)?,
            pos: 0,
        })
    }

    fn current(&self) -> &Token {
        // tokenize() guarantees a trailing EndOfInput, which is never bumped past
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_nth(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map_or(TokenKind::EndOfInput, |t| t.kind)
    }

    fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if !token.is_end_of_input() {
            self.pos += 1;
        }
        token
    }

    fn allow(&mut self, kind: TokenKind) -> bool {
        if self.peek() == kind {
            self.bump();
            return true;
        }
        false
    }

    fn expect(&mut self, kind: TokenKind) -> ParserResult<Token> {
        if self.peek() == kind {
            return Ok(self.bump());
        }
        Err(self.unexpected(describe(kind)))
    }

    fn unexpected<S: Into<String>>(&self, expected: S) -> ParseError {
        let token = self.current();
        let found = match token.kind {
            TokenKind::EndOfInput => "end of input".to_string(),
            TokenKind::Newline => "newline".to_string(),
            _ => format!("{:?}", token.text),
        };
        ParseError {
            offset: token.offset,
            kind: ParseErrorKind::UnexpectedToken {
                expected: expected.into(),
                found,
            },
        }
    }

    fn skip_newlines(&mut self) {
        while self.allow(TokenKind::Newline) {}
    }

    fn parse_document(&mut self) -> ParserResult<Document> {
        let mut statements = vec![];

        self.skip_newlines();
        while self.peek() != TokenKind::EndOfInput {
            let target = self.expect(TokenKind::Name)?;
            self.expect(TokenKind::Equals)?;
            let value = self.parse_expr()?;

            statements.push(Statement {
                target: target.text,
                value,
                offset: target.offset,
            });

            if self.peek() != TokenKind::EndOfInput {
                self.expect(TokenKind::Newline)?;
            }
            self.skip_newlines();
        }

        Ok(Document { statements })
    }

    // expr: or_test ["if" or_test "else" expr]
    fn parse_expr(&mut self) -> ParserResult<Expr> {
        let body = self.parse_or()?;
        if !self.allow(TokenKind::If) {
            return Ok(body);
        }

        let test = self.parse_or()?;
        self.expect(TokenKind::Else)?;
        let orelse = self.parse_expr()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    fn parse_or(&mut self) -> ParserResult<Expr> {
        let mut left = self.parse_and()?;
        while self.allow(TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Bool {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParserResult<Expr> {
        let mut left = self.parse_not()?;
        while self.allow(TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::Bool {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> ParserResult<Expr> {
        if self.allow(TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn compare_op(&mut self) -> Option<CompareOp> {
        let op = match self.peek() {
            TokenKind::EqEq => CompareOp::Eq,
            TokenKind::NotEq => CompareOp::NotEq,
            TokenKind::Less => CompareOp::Lt,
            TokenKind::LessEq => CompareOp::LtE,
            TokenKind::Greater => CompareOp::Gt,
            TokenKind::GreaterEq => CompareOp::GtE,
            TokenKind::In => CompareOp::In,
            TokenKind::Not if self.peek_nth(1) == TokenKind::In => {
                self.bump();
                CompareOp::NotIn
            }
            _ => return None,
        };
        self.bump();
        Some(op)
    }

    fn parse_comparison(&mut self) -> ParserResult<Expr> {
        let left = self.parse_arith()?;
        let mut comparisons = vec![];
        while let Some(op) = self.compare_op() {
            comparisons.push((op, self.parse_arith()?));
        }

        if comparisons.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            comparisons,
        })
    }

    fn parse_arith(&mut self) -> ParserResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.parse_term()?;
            left = binary(op, left, right);
        }
    }

    fn parse_term(&mut self) -> ParserResult<Expr> {
        let mut left = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::DoubleSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.bump();
            let right = self.parse_factor()?;
            left = binary(op, left, right);
        }
    }

    fn parse_factor(&mut self) -> ParserResult<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_power(),
        };
        self.bump();
        let operand = self.parse_factor()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    // power: primary ["**" factor]; right associative, and binds tighter than a unary minus
    // on its left: -2 ** 2 == -4
    fn parse_power(&mut self) -> ParserResult<Expr> {
        let base = self.parse_primary()?;
        if self.allow(TokenKind::DoubleStar) {
            let exponent = self.parse_factor()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ParserResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.bump();
                    let attr = self.expect(TokenKind::Name)?;
                    expr = Expr::Attribute {
                        value: Box::new(expr),
                        attr: attr.text,
                    };
                }
                TokenKind::OpenBracket => {
                    self.bump();
                    let index = self.parse_subscript()?;
                    self.expect(TokenKind::CloseBracket)?;
                    expr = Expr::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::OpenParen => {
                    self.bump();
                    let args = self.parse_comma_list(TokenKind::CloseParen)?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_optional_expr(&mut self) -> ParserResult<Option<Expr>> {
        match self.peek() {
            TokenKind::Colon | TokenKind::CloseBracket => Ok(None),
            _ => self.parse_expr().map(Some),
        }
    }

    fn parse_subscript(&mut self) -> ParserResult<Subscript> {
        let lower = self.parse_optional_expr()?;
        if !self.allow(TokenKind::Colon) {
            return match lower {
                Some(index) => Ok(Subscript::Index(index)),
                None => Err(self.unexpected("subscript")),
            };
        }

        let upper = self.parse_optional_expr()?;
        let step = match self.allow(TokenKind::Colon) {
            true => self.parse_optional_expr()?,
            false => None,
        };
        Ok(Subscript::Slice { lower, upper, step })
    }

    /// Parse `expr ("," expr)* [","]` up to and including `close`.
    fn parse_comma_list(&mut self, close: TokenKind) -> ParserResult<Vec<Expr>> {
        let mut items = vec![];
        while self.peek() != close {
            items.push(self.parse_expr()?);
            if !self.allow(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn parse_atom(&mut self) -> ParserResult<Expr> {
        let token = self.bump();
        let expr = match token.kind {
            TokenKind::Name => Expr::Name(token.text),
            TokenKind::None => Expr::Constant(Constant::None),
            TokenKind::True => Expr::Constant(Constant::Bool(true)),
            TokenKind::False => Expr::Constant(Constant::Bool(false)),
            TokenKind::Int => Expr::Constant(Constant::Int(parse_int(&token)?)),
            TokenKind::Float => Expr::Constant(Constant::Float(parse_float(&token)?)),
            TokenKind::Str => {
                // Adjacent string literals concatenate
                let mut value = parse_str(&token)?;
                while self.peek() == TokenKind::Str {
                    value.push_str(&parse_str(&self.bump())?);
                }
                Expr::Constant(Constant::Str(value))
            }
            TokenKind::OpenBracket => Expr::List(self.parse_comma_list(TokenKind::CloseBracket)?),
            TokenKind::OpenParen => {
                if self.allow(TokenKind::CloseParen) {
                    return Ok(Expr::Tuple(vec![]));
                }
                let first = self.parse_expr()?;
                if self.allow(TokenKind::CloseParen) {
                    return Ok(first);
                }
                self.expect(TokenKind::Comma)?;
                let mut items = vec![first];
                items.extend(self.parse_comma_list(TokenKind::CloseParen)?);
                Expr::Tuple(items)
            }
            TokenKind::OpenBrace => {
                let mut entries = vec![];
                while self.peek() != TokenKind::CloseBrace {
                    let key = self.parse_expr()?;
                    self.expect(TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    entries.push((key, value));
                    if !self.allow(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::CloseBrace)?;
                Expr::Dict(entries)
            }
            _ => {
                self.pos = self.pos.saturating_sub(usize::from(!token.is_end_of_input()));
                return Err(self.unexpected("expression"));
            }
        };
        Ok(expr)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn describe(kind: TokenKind) -> String {
    match kind.get_fixed_str() {
        Some(s) => format!("{s:?}"),
        None => format!("{kind:?}").to_lowercase(),
    }
}

fn invalid_literal(token: &Token) -> ParseError {
    ParseError {
        offset: token.offset,
        kind: ParseErrorKind::InvalidLiteral(token.text.clone()),
    }
}

fn parse_int(token: &Token) -> ParserResult<i64> {
    let digits: String = token.text.chars().filter(|c| *c != '_').collect();
    digits.parse().map_err(|_| invalid_literal(token))
}

fn parse_float(token: &Token) -> ParserResult<f64> {
    let digits: String = token.text.chars().filter(|c| *c != '_').collect();
    digits.parse().map_err(|_| invalid_literal(token))
}

fn parse_str(token: &Token) -> ParserResult<String> {
    unquote(&token.text).ok_or_else(|| invalid_literal(token))
}

/// Parse a single expression spanning the whole input.
pub fn parse_expression(input: &str) -> ParserResult<Expr> {
    let mut parser = Parser::new(input)?;
    parser.skip_newlines();
    let expr = parser.parse_expr()?;
    parser.skip_newlines();
    if parser.peek() != TokenKind::EndOfInput {
        return Err(parser.unexpected("end of input"));
    }
    Ok(expr)
}

/// Parse a source document: newline-separated `name = expression` statements.
pub fn parse_document(input: &str) -> ParserResult<Document> {
    Parser::new(input)?.parse_document()
}

/// Names bound by a document, in order of first assignment. Handy for diagnostics.
pub fn bound_names(document: &Document) -> Vec<&str> {
    document
        .statements
        .iter()
        .map(|stmt| stmt.target.as_str())
        .unique()
        .collect()
}

#[cfg(test)]
mod test {
    use super::{bound_names, parse_document, parse_expression};
    use crate::ParseErrorKind;
    use crate::ast::{BinaryOp, CompareOp, Constant, Expr, Subscript, UnaryOp};
    use pretty_assertions::assert_eq;

    fn int(i: i64) -> Expr {
        Expr::Constant(Constant::Int(i))
    }

    fn name(n: &str) -> Expr {
        Expr::Name(n.into())
    }

    #[test]
    fn precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(int(1)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(int(2)),
                    right: Box::new(int(3)),
                }),
            }
        );
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let expr = parse_expression("-2 ** 2").unwrap();
        assert_eq!(
            expr,
            Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(int(2)),
                    right: Box::new(int(2)),
                }),
            }
        );
    }

    #[test]
    fn attribute_and_subscript_chain() {
        let expr = parse_expression("c.trainer.stages[-1]").unwrap();
        assert_eq!(
            expr,
            Expr::Subscript {
                value: Box::new(Expr::Attribute {
                    value: Box::new(Expr::Attribute {
                        value: Box::new(name("c")),
                        attr: "trainer".into(),
                    }),
                    attr: "stages".into(),
                }),
                index: Box::new(Subscript::Index(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(int(1)),
                })),
            }
        );
    }

    #[test]
    fn slices() {
        let expr = parse_expression("x[1:]").unwrap();
        assert_eq!(
            expr,
            Expr::Subscript {
                value: Box::new(name("x")),
                index: Box::new(Subscript::Slice {
                    lower: Some(int(1)),
                    upper: None,
                    step: None,
                }),
            }
        );

        let expr = parse_expression("x[::2]").unwrap();
        assert!(matches!(
            expr,
            Expr::Subscript { index, .. } if *index == Subscript::Slice { lower: None, upper: None, step: Some(int(2)) }
        ));
    }

    #[test]
    fn comparison_chain_and_not_in() {
        let expr = parse_expression("0 < x <= 10").unwrap();
        let Expr::Compare { comparisons, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(comparisons.len(), 2);

        let expr = parse_expression("'a' not in x").unwrap();
        let Expr::Compare { comparisons, .. } = expr else {
            panic!("expected comparison");
        };
        assert_eq!(comparisons[0].0, CompareOp::NotIn);
    }

    #[test]
    fn displays() {
        assert_eq!(
            parse_expression("{'x': [1, (2,)], }").unwrap(),
            Expr::Dict(vec![(
                Expr::Constant(Constant::Str("x".into())),
                Expr::List(vec![int(1), Expr::Tuple(vec![int(2)])]),
            )])
        );
        assert_eq!(parse_expression("(1)").unwrap(), int(1));
        assert_eq!(parse_expression("()").unwrap(), Expr::Tuple(vec![]));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        let err = parse_expression("1 2").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedToken { .. }));
        assert!(parse_expression("").is_err());
        assert!(parse_expression("unquoted_string").is_ok());
        assert!(parse_expression("bar+=3").is_err());
    }

    #[test]
    fn integer_overflow_is_an_invalid_literal() {
        let err = parse_expression("99999999999999999999").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidLiteral(_)));
    }

    #[test]
    fn documents() {
        let doc = parse_document(
            r#"
# a comment
parents = ["base.cfg"]
config = {
    "lr": 0.1,  # trailing comment
    "steps": 1000,
}
config = {"lr": 0.2}
"#,
        )
        .unwrap();

        assert_eq!(bound_names(&doc), vec!["parents", "config"]);
        assert_eq!(
            doc.get("config"),
            Some(&Expr::Dict(vec![(
                Expr::Constant(Constant::Str("lr".into())),
                Expr::Constant(Constant::Float(0.2)),
            )]))
        );
        assert!(parse_document("a = 1 b = 2").is_err());
    }
}
