//! Expression and document trees produced by [`crate::parser`].
//!
//! The same [`Expr`] type backs three users: override values and `config` documents only ever
//! contain the literal subset (constants, displays and constructor calls), while lazy
//! expressions may use the whole language.

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Subscript {
    Index(Expr),
    Slice {
        lower: Option<Expr>,
        upper: Option<Expr>,
        step: Option<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Constant),
    Name(String),
    Attribute {
        value: Box<Expr>,
        attr: String,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Subscript>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// `a < b <= c` is a single comparison chain, evaluated pairwise
    Compare {
        left: Box<Expr>,
        comparisons: Vec<(CompareOp, Expr)>,
    },
    Bool {
        op: BoolOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    List(Vec<Expr>),
    /// Tuples exist only so that `(1, 2)` parses; they evaluate to sequences
    Tuple(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
}

/// A `name = value` statement in a source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub target: String,
    pub value: Expr,
    /// Character offset of the target name
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub statements: Vec<Statement>,
}

impl Document {
    /// The value of the last statement assigning `target`, mirroring how re-assignment in a
    /// module leaves the final binding visible.
    pub fn get(&self, target: &str) -> Option<&Expr> {
        self.statements
            .iter()
            .rev()
            .find(|stmt| stmt.target == target)
            .map(|stmt| &stmt.value)
    }
}
