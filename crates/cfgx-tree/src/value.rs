use std::fmt;
use std::rc::Rc;

use cfgx_syntax::ast::Expr;
use cfgx_syntax::parse_expression;
use cfgx_util::number::format_float;
use cfgx_util::quote::quote;
use derive_more::TryInto;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::errors::{ConfigError, ConfigResult};
use crate::eval;
use crate::path::{Path, Segment};
use crate::resolve::View;

pub type Mapping = IndexMap<String, Value>;

/// A configuration tree node.
///
/// `Delete` and `Replace` are only meaningful inside an override layer passed to
/// [`crate::merge::merge`]; merging settles them, so they never survive into a merged tree.
#[derive(Clone, Debug, Default, TryInto)]
#[try_into(owned, ref, ref_mut)]
pub enum Value {
    #[default]
    #[try_into(ignore)]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Mapping),
    Deferred(Lazy),
    #[try_into(ignore)]
    Delete,
    #[try_into(ignore)]
    Replace(Box<Value>),
}

pub type LazyFn = dyn for<'r> Fn(&View<'r>) -> ConfigResult<Value>;

#[derive(Clone)]
enum LazyKind {
    Function(Rc<LazyFn>),
    Expression { source: Rc<str>, expr: Rc<Expr> },
}

/// A value computed from the fully merged tree, on demand.
///
/// The computation receives a [`View`] of the whole root, so it may read any other path,
/// including ones that are themselves still deferred.
#[derive(Clone)]
pub struct Lazy(LazyKind);

impl Lazy {
    pub fn new<F>(func: F) -> Lazy
    where
        F: for<'r> Fn(&View<'r>) -> ConfigResult<Value> + 'static,
    {
        Lazy(LazyKind::Function(Rc::new(func)))
    }

    /// A deferred expression over the root, bound to the name `c`, e.g.
    /// `c.trainer.max_steps * 0.1`. Syntax errors are reported here, not at resolution.
    pub fn expr(source: &str) -> ConfigResult<Lazy> {
        let expr = parse_expression(source).map_err(|error| ConfigError::InvalidExpression {
            source_text: source.to_string(),
            error,
        })?;
        Ok(Lazy(LazyKind::Expression {
            source: source.into(),
            expr: Rc::new(expr),
        }))
    }

    /// Expression text, or `None` for a closure.
    pub fn source(&self) -> Option<&str> {
        match &self.0 {
            LazyKind::Function(_) => None,
            LazyKind::Expression { source, .. } => Some(source),
        }
    }

    pub fn evaluate(&self, root: &View<'_>) -> ConfigResult<Value> {
        match &self.0 {
            LazyKind::Function(func) => func(root),
            LazyKind::Expression { expr, .. } => eval::evaluate(expr, root),
        }
    }
}

impl PartialEq for Lazy {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (LazyKind::Function(a), LazyKind::Function(b)) => Rc::ptr_eq(a, b),
            (LazyKind::Expression { source: a, .. }, LazyKind::Expression { source: b, .. }) => {
                a == b
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Lazy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source() {
            Some(source) => write!(f, "Lazy({})", quote(source, '\'')),
            None => f.write_str("Lazy(<function>)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) | (Delete, Delete) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => (*a as f64) == *b,
            (Str(a), Str(b)) => a == b,
            (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Deferred(a), Deferred(b)) => a == b,
            (Replace(a), Replace(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn map() -> Value {
        Value::Map(Mapping::new())
    }

    pub fn list() -> Value {
        Value::List(vec![])
    }

    /// A container suited to being indexed by `next`: a sequence for an index, a mapping for
    /// a key.
    pub(crate) fn container_for(next: &Segment) -> Value {
        match next {
            Segment::Index(_) => Value::list(),
            Segment::Key(_) => Value::map(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "dict",
            Value::Deferred(_) => "Lazy",
            Value::Delete => "Delete",
            Value::Replace(_) => "Replace",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Delete | Value::Replace(_))
    }

    pub fn as_map(&self) -> Option<&Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an int or float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Python truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null | Value::Delete => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(list) => !list.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Deferred(_) | Value::Replace(_) => true,
        }
    }

    /// Python `==`, where `True == 1` and `False == 0.0` also hold. Tree equality keeps
    /// booleans apart from numbers.
    pub fn loosely_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Bool(b), Int(_) | Float(_)) => other.loosely_eq(&Int(i64::from(*b))),
            (Int(_) | Float(_), Bool(b)) => self.loosely_eq(&Int(i64::from(*b))),
            (List(a), List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            (Map(a), Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, x)| b.get(k).is_some_and(|y| x.loosely_eq(y)))
            }
            _ => self == other,
        }
    }

    /// Look up a direct child. Negative indices count from the end.
    pub fn child(&self, segment: &Segment) -> Option<&Value> {
        match (self, segment) {
            (Value::Map(map), Segment::Key(key)) => map.get(key),
            (Value::List(list), Segment::Index(index)) => {
                normalize_index(*index, list.len()).map(|i| &list[i])
            }
            _ => None,
        }
    }

    pub fn child_mut(&mut self, segment: &Segment) -> Option<&mut Value> {
        match (self, segment) {
            (Value::Map(map), Segment::Key(key)) => map.get_mut(key),
            (Value::List(list), Segment::Index(index)) => {
                normalize_index(*index, list.len()).map(|i| &mut list[i])
            }
            _ => None,
        }
    }

    /// The node at `path`, if every step exists.
    pub fn get_path(&self, path: &Path) -> Option<&Value> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn get_path_mut(&mut self, path: &Path) -> Option<&mut Value> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.child_mut(segment))
    }

    /// Convenience accessor taking a textual path, e.g. `value.get("trainer.stages[0]")`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let path = Path::parse(path).ok()?;
        self.get_path(&path)
    }

    /// Whether any node in this tree satisfies `pred`.
    pub fn any(&self, pred: &dyn Fn(&Value) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Value::List(list) => list.iter().any(|v| v.any(pred)),
            Value::Map(map) => map.values().any(|v| v.any(pred)),
            Value::Replace(inner) => inner.any(pred),
            _ => false,
        }
    }
}

/// Resolve a possibly negative index against `len`, returning `None` when out of range.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let index = if index < 0 { index + len } else { index };
    (0..len).contains(&index).then_some(index as usize)
}

/// Renders like Python's `repr()`.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::Str(s) => f.write_str(&quote(s, '\'')),
            Value::List(list) => write!(f, "[{}]", list.iter().join(", ")),
            Value::Map(map) => write!(
                f,
                "{{{}}}",
                map.iter()
                    .map(|(k, v)| format!("{}: {v}", quote(k, '\'')))
                    .join(", ")
            ),
            Value::Deferred(lazy) => write!(f, "{lazy:?}"),
            Value::Delete => f.write_str("Delete()"),
            Value::Replace(inner) => write!(f, "Replace({inner})"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Map(map)
    }
}

impl From<Lazy> for Value {
    fn from(lazy: Lazy) -> Self {
        Value::Deferred(lazy)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
