//! Evaluator for deferred expressions such as `c.trainer.max_steps * 0.1`.
//!
//! Only the root view `c`, the `math` module and a handful of builtins are in scope. Nothing
//! else from the host program is reachable.

use std::cmp::Ordering;

use cfgx_syntax::ast::{BinaryOp, BoolOp, CompareOp, Constant, Expr, Subscript, UnaryOp};
use indexmap::IndexMap;
use itertools::Itertools;

use crate::errors::{ConfigResult, eval_error};
use crate::resolve::{Resolved, View, slice_indices};
use crate::value::{Value, normalize_index};

/// Name the root view is bound to.
pub const ROOT_NAME: &str = "c";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Abs,
    Int,
    Float,
    Str,
    Bool,
    Len,
    Min,
    Max,
    Sum,
    Round,
    Sqrt,
    Floor,
    Ceil,
    Exp,
    Log,
    Log2,
    Log10,
    Pow,
    Sin,
    Cos,
    Tan,
}

impl Function {
    fn builtin(name: &str) -> Option<Function> {
        Some(match name {
            "abs" => Function::Abs,
            "int" => Function::Int,
            "float" => Function::Float,
            "str" => Function::Str,
            "bool" => Function::Bool,
            "len" => Function::Len,
            "min" => Function::Min,
            "max" => Function::Max,
            "sum" => Function::Sum,
            "round" => Function::Round,
            _ => return None,
        })
    }

    fn math(name: &str) -> Option<Function> {
        Some(match name {
            "sqrt" => Function::Sqrt,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "exp" => Function::Exp,
            "log" => Function::Log,
            "log2" => Function::Log2,
            "log10" => Function::Log10,
            "pow" => Function::Pow,
            "sin" => Function::Sin,
            "cos" => Function::Cos,
            "tan" => Function::Tan,
            _ => return None,
        })
    }
}

fn math_constant(name: &str) -> Option<f64> {
    match name {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        "tau" => Some(std::f64::consts::TAU),
        "inf" => Some(f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

/// Intermediate result of evaluating a sub-expression.
#[derive(Debug, Clone)]
enum Operand<'r> {
    Value(Value),
    View(View<'r>),
    Math,
    Function(Function),
}

impl<'r> From<Resolved<'r>> for Operand<'r> {
    fn from(resolved: Resolved<'r>) -> Self {
        match resolved {
            Resolved::Value(v) => Operand::Value(v),
            Resolved::Mapping(view) | Resolved::Sequence(view) => Operand::View(view),
        }
    }
}

impl Operand<'_> {
    /// Materialize into a plain tree, resolving everything underneath views.
    fn into_value(self) -> ConfigResult<Value> {
        match self {
            Operand::Value(v) => Ok(v),
            Operand::View(view) => view.to_value(),
            Operand::Math => Err(eval_error("the math module is not a value")),
            Operand::Function(f) => Err(eval_error(format!("{f:?} is a function, not a value"))),
        }
    }

    fn is_truthy(&self) -> ConfigResult<bool> {
        match self {
            Operand::Value(v) => Ok(v.is_truthy()),
            Operand::View(view) => Ok(!view.is_empty()?),
            Operand::Math | Operand::Function(_) => Ok(true),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(i64::from(*b))),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn overflow() -> anyhow::Error {
    eval_error("integer overflow")
}

fn zero_division() -> anyhow::Error {
    eval_error("division by zero")
}

fn floor_div_int(a: i64, b: i64) -> ConfigResult<i64> {
    if b == 0 {
        return Err(zero_division());
    }
    let q = a.checked_div(b).ok_or_else(overflow)?;
    Ok(if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q })
}

fn mod_int(a: i64, b: i64) -> ConfigResult<i64> {
    if b == 0 {
        return Err(zero_division());
    }
    let r = a.checked_rem(b).unwrap_or(0);
    Ok(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r })
}

fn mod_float(a: f64, b: f64) -> ConfigResult<f64> {
    if b == 0.0 {
        return Err(zero_division());
    }
    let r = a % b;
    Ok(if r != 0.0 && ((r < 0.0) != (b < 0.0)) { r + b } else { r })
}

/// Length of `unit` repeated `times` times. Negative counts repeat nothing.
fn repeated_len(unit: usize, times: i64) -> ConfigResult<usize> {
    let times = usize::try_from(times).unwrap_or(0);
    unit.checked_mul(times)
        .ok_or_else(|| eval_error("repeated sequence is too large"))
}

fn repeat_str(s: &str, times: i64) -> ConfigResult<Value> {
    let len = repeated_len(s.len(), times)?;
    let mut ret = String::new();
    if len == 0 {
        return Ok(Value::Str(ret));
    }
    ret.try_reserve_exact(len)
        .map_err(|_| eval_error("repeated string is too large"))?;
    while ret.len() < len {
        ret.push_str(s);
    }
    Ok(Value::Str(ret))
}

fn repeat(items: &[Value], times: i64) -> ConfigResult<Value> {
    let len = repeated_len(items.len(), times)?;
    let mut ret = Vec::new();
    if len == 0 {
        return Ok(Value::List(ret));
    }
    ret.try_reserve_exact(len)
        .map_err(|_| eval_error("repeated sequence is too large"))?;
    while ret.len() < len {
        ret.extend_from_slice(items);
    }
    Ok(Value::List(ret))
}

fn binary_op(op: BinaryOp, left: &Value, right: &Value) -> ConfigResult<Value> {
    use Value::*;

    match (op, left, right) {
        (BinaryOp::Add, Str(a), Str(b)) => return Ok(Str(format!("{a}{b}"))),
        (BinaryOp::Add, List(a), List(b)) => {
            return Ok(List(a.iter().chain(b).cloned().collect()));
        }
        (BinaryOp::Mul, Str(s), Int(n)) | (BinaryOp::Mul, Int(n), Str(s)) => {
            return repeat_str(s, *n);
        }
        (BinaryOp::Mul, List(items), Int(n)) | (BinaryOp::Mul, Int(n), List(items)) => {
            return repeat(items, *n);
        }
        _ => {}
    }

    let (Some(a), Some(b)) = (Num::of(left), Num::of(right)) else {
        return Err(eval_error(format!(
            "unsupported operand types for {op:?}: '{}' and '{}'",
            left.type_name(),
            right.type_name()
        )));
    };

    let value = match (op, a, b) {
        (BinaryOp::Add, Num::Int(a), Num::Int(b)) => Int(a.checked_add(b).ok_or_else(overflow)?),
        (BinaryOp::Sub, Num::Int(a), Num::Int(b)) => Int(a.checked_sub(b).ok_or_else(overflow)?),
        (BinaryOp::Mul, Num::Int(a), Num::Int(b)) => Int(a.checked_mul(b).ok_or_else(overflow)?),
        (BinaryOp::FloorDiv, Num::Int(a), Num::Int(b)) => Int(floor_div_int(a, b)?),
        (BinaryOp::Mod, Num::Int(a), Num::Int(b)) => Int(mod_int(a, b)?),
        (BinaryOp::Pow, Num::Int(a), Num::Int(b)) if b >= 0 => {
            let exp = u32::try_from(b).map_err(|_| overflow())?;
            Int(a.checked_pow(exp).ok_or_else(overflow)?)
        }
        (op, a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            match op {
                BinaryOp::Add => Float(a + b),
                BinaryOp::Sub => Float(a - b),
                BinaryOp::Mul => Float(a * b),
                BinaryOp::Div if b == 0.0 => return Err(zero_division()),
                BinaryOp::Div => Float(a / b),
                BinaryOp::FloorDiv if b == 0.0 => return Err(zero_division()),
                BinaryOp::FloorDiv => Float((a / b).floor()),
                BinaryOp::Mod => Float(mod_float(a, b)?),
                BinaryOp::Pow if a == 0.0 && b < 0.0 => return Err(zero_division()),
                BinaryOp::Pow => Float(a.powf(b)),
            }
        }
    };
    Ok(value)
}

/// Python ordering between two values, where one exists.
fn compare_values(left: &Value, right: &Value) -> ConfigResult<Ordering> {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b) {
                if !x.loosely_eq(y) {
                    return compare_values(x, y);
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => match (Num::of(left), Num::of(right)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => None,
        },
    };

    ordering.ok_or_else(|| {
        eval_error(format!(
            "cannot order '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn contains(container: &Value, item: &Value) -> ConfigResult<bool> {
    match (container, item) {
        (Value::List(items), item) => Ok(items.iter().any(|x| x.loosely_eq(item))),
        (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(key)),
        (Value::Map(_), _) => Ok(false),
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        _ => Err(eval_error(format!(
            "argument of type '{}' is not a container",
            container.type_name()
        ))),
    }
}

/// Membership test against a view. Keys of a mapping are listed without resolving any of
/// its values, and a sequence resolves its elements one at a time until one matches.
fn view_contains(view: &View<'_>, item: &Value) -> ConfigResult<bool> {
    if view.is_mapping() {
        return Ok(match item {
            Value::Str(key) => view.keys()?.contains(key),
            _ => false,
        });
    }
    for i in 0..view.len()? {
        let element = match view.index(i as i64)? {
            Resolved::Value(v) => v,
            nested if matches!(item, Value::List(_) | Value::Map(_)) => nested.to_value()?,
            _ => continue,
        };
        if element.loosely_eq(item) {
            return Ok(true);
        }
    }
    Ok(false)
}

fn compare_operands(
    op: CompareOp,
    left: Operand<'_>,
    right: &Operand<'_>,
) -> ConfigResult<bool> {
    if let (CompareOp::In | CompareOp::NotIn, Operand::View(view)) = (op, right) {
        let found = view_contains(view, &left.into_value()?)?;
        return Ok(found == (op == CompareOp::In));
    }
    compare(op, &left.into_value()?, &right.clone().into_value()?)
}

fn compare(op: CompareOp, left: &Value, right: &Value) -> ConfigResult<bool> {
    Ok(match op {
        CompareOp::Eq => left.loosely_eq(right),
        CompareOp::NotEq => !left.loosely_eq(right),
        CompareOp::Lt => compare_values(left, right)? == Ordering::Less,
        CompareOp::LtE => compare_values(left, right)? != Ordering::Greater,
        CompareOp::Gt => compare_values(left, right)? == Ordering::Greater,
        CompareOp::GtE => compare_values(left, right)? != Ordering::Less,
        CompareOp::In => contains(right, left)?,
        CompareOp::NotIn => !contains(right, left)?,
    })
}

fn expect_int(value: &Value, what: &str) -> ConfigResult<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(eval_error(format!(
            "{what} must be an integer, not '{}'",
            other.type_name()
        ))),
    }
}

fn expect_num(value: &Value, func: Function) -> ConfigResult<Num> {
    Num::of(value).ok_or_else(|| {
        eval_error(format!(
            "{func:?}() expects a number, not '{}'",
            value.type_name()
        ))
    })
}

fn float_to_int(f: f64) -> ConfigResult<i64> {
    if !f.is_finite() || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(eval_error(format!("cannot convert float {f} to integer")));
    }
    Ok(f as i64)
}

/// Elements iterated by `min`, `max` and `sum` when given a single container.
fn iterate(value: Value) -> ConfigResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        Value::Map(map) => Ok(map.into_keys().map(Value::Str).collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        other => Err(eval_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

/// A mapping view iterates over its keys, which are listed without resolving any values.
fn keys_if_mapping(operand: Operand<'_>) -> ConfigResult<Operand<'_>> {
    match operand {
        Operand::View(view) if view.is_mapping() => Ok(Operand::Value(Value::List(
            view.keys()?.into_iter().map(Value::Str).collect(),
        ))),
        other => Ok(other),
    }
}

fn call(func: Function, args: Vec<Operand<'_>>) -> ConfigResult<Value> {
    // len() inspects a view without materializing it
    if let (Function::Len, [Operand::View(view)]) = (func, args.as_slice()) {
        return Ok(Value::Int(view.len()? as i64));
    }

    let iterates_first = match func {
        Function::Min | Function::Max => args.len() == 1,
        Function::Sum => true,
        _ => false,
    };
    let args: Vec<Value> = args
        .into_iter()
        .enumerate()
        .map(|(i, arg)| {
            if iterates_first && i == 0 {
                keys_if_mapping(arg)?.into_value()
            } else {
                arg.into_value()
            }
        })
        .collect::<ConfigResult<_>>()?;

    let arity = |expected: std::ops::RangeInclusive<usize>| {
        if expected.contains(&args.len()) {
            Ok(())
        } else {
            Err(eval_error(format!(
                "{func:?}() takes {} to {} arguments ({} given)",
                expected.start(),
                expected.end(),
                args.len()
            )))
        }
    };

    let float_fn = |f: fn(f64) -> f64| -> ConfigResult<Value> {
        arity(1..=1)?;
        Ok(Value::Float(f(expect_num(&args[0], func)?.as_f64())))
    };

    let value = match func {
        Function::Abs => {
            arity(1..=1)?;
            match expect_num(&args[0], func)? {
                Num::Int(i) => Value::Int(i.checked_abs().ok_or_else(overflow)?),
                Num::Float(f) => Value::Float(f.abs()),
            }
        }
        Function::Int => {
            arity(1..=1)?;
            match &args[0] {
                Value::Str(s) => Value::Int(
                    s.trim()
                        .replace('_', "")
                        .parse()
                        .map_err(|_| eval_error(format!("invalid literal for int(): {s:?}")))?,
                ),
                other => match expect_num(other, func)? {
                    Num::Int(i) => Value::Int(i),
                    Num::Float(f) => Value::Int(float_to_int(f.trunc())?),
                },
            }
        }
        Function::Float => {
            arity(1..=1)?;
            match &args[0] {
                Value::Str(s) => Value::Float(
                    s.trim()
                        .parse()
                        .map_err(|_| eval_error(format!("could not convert {s:?} to float")))?,
                ),
                other => Value::Float(expect_num(other, func)?.as_f64()),
            }
        }
        Function::Str => {
            arity(1..=1)?;
            match &args[0] {
                Value::Str(s) => Value::Str(s.clone()),
                other => Value::Str(other.to_string()),
            }
        }
        Function::Bool => {
            arity(1..=1)?;
            Value::Bool(args[0].is_truthy())
        }
        Function::Len => {
            arity(1..=1)?;
            let len = match &args[0] {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => {
                    return Err(eval_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )));
                }
            };
            Value::Int(len as i64)
        }
        Function::Min | Function::Max => {
            arity(1..=usize::MAX)?;
            let items = match args.len() {
                1 => iterate(args[0].clone())?,
                _ => args.clone(),
            };
            let want = if func == Function::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };

            let mut items = items.into_iter();
            let mut best = items
                .next()
                .ok_or_else(|| eval_error(format!("{func:?}() arg is an empty sequence")))?;
            for item in items {
                if compare_values(&item, &best)? == want {
                    best = item;
                }
            }
            best
        }
        Function::Sum => {
            arity(1..=2)?;
            let start = args.get(1).cloned().unwrap_or(Value::Int(0));
            iterate(args[0].clone())?
                .iter()
                .try_fold(start, |acc, item| binary_op(BinaryOp::Add, &acc, item))?
        }
        Function::Round => {
            arity(1..=2)?;
            let x = expect_num(&args[0], func)?;
            match (x, args.get(1)) {
                (Num::Int(i), None) => Value::Int(i),
                (Num::Float(f), None) => Value::Int(float_to_int(f.round_ties_even())?),
                (Num::Int(i), Some(Value::Null)) => Value::Int(i),
                (Num::Float(f), Some(Value::Null)) => {
                    Value::Int(float_to_int(f.round_ties_even())?)
                }
                (Num::Int(i), Some(_)) => Value::Int(i),
                (Num::Float(f), Some(digits)) => {
                    let digits = expect_int(digits, "ndigits")?;
                    let digits = i32::try_from(digits).map_err(|_| overflow())?;
                    let scale = 10f64.powi(digits);
                    Value::Float((f * scale).round_ties_even() / scale)
                }
            }
        }
        Function::Sqrt => {
            arity(1..=1)?;
            let x = expect_num(&args[0], func)?.as_f64();
            if x < 0.0 {
                return Err(eval_error("math domain error"));
            }
            Value::Float(x.sqrt())
        }
        Function::Floor | Function::Ceil => {
            arity(1..=1)?;
            match expect_num(&args[0], func)? {
                Num::Int(i) => Value::Int(i),
                Num::Float(f) if func == Function::Floor => Value::Int(float_to_int(f.floor())?),
                Num::Float(f) => Value::Int(float_to_int(f.ceil())?),
            }
        }
        Function::Log => {
            arity(1..=2)?;
            let x = expect_num(&args[0], func)?.as_f64();
            if x <= 0.0 {
                return Err(eval_error("math domain error"));
            }
            match args.get(1) {
                None => Value::Float(x.ln()),
                Some(base) => Value::Float(x.ln() / expect_num(base, func)?.as_f64().ln()),
            }
        }
        Function::Log2 | Function::Log10 => {
            arity(1..=1)?;
            let x = expect_num(&args[0], func)?.as_f64();
            if x <= 0.0 {
                return Err(eval_error("math domain error"));
            }
            Value::Float(if func == Function::Log2 {
                x.log2()
            } else {
                x.log10()
            })
        }
        Function::Pow => {
            arity(2..=2)?;
            let x = expect_num(&args[0], func)?.as_f64();
            let y = expect_num(&args[1], func)?.as_f64();
            Value::Float(x.powf(y))
        }
        Function::Exp => float_fn(f64::exp)?,
        Function::Sin => float_fn(f64::sin)?,
        Function::Cos => float_fn(f64::cos)?,
        Function::Tan => float_fn(f64::tan)?,
    };
    Ok(value)
}

struct Evaluator<'a, 'r> {
    root: &'a View<'r>,
}

impl<'r> Evaluator<'_, 'r> {
    fn name(&self, name: &str) -> ConfigResult<Operand<'r>> {
        if name == ROOT_NAME {
            return Ok(Operand::View(self.root.clone()));
        }
        if name == "math" {
            return Ok(Operand::Math);
        }
        Function::builtin(name)
            .map(Operand::Function)
            .ok_or_else(|| eval_error(format!("name {name:?} is not defined")))
    }

    fn attribute(&self, value: Operand<'r>, attr: &str) -> ConfigResult<Operand<'r>> {
        match value {
            Operand::View(view) => Ok(view.attr(attr)?.into()),
            Operand::Math => {
                if let Some(constant) = math_constant(attr) {
                    return Ok(Operand::Value(Value::Float(constant)));
                }
                Function::math(attr)
                    .map(Operand::Function)
                    .ok_or_else(|| eval_error(format!("module 'math' has no attribute {attr:?}")))
            }
            Operand::Value(v) => Err(eval_error(format!(
                "'{}' object has no attribute {attr:?}",
                v.type_name()
            ))),
            Operand::Function(f) => Err(eval_error(format!("{f:?} has no attribute {attr:?}"))),
        }
    }

    fn optional_int(&self, expr: &Option<Expr>) -> ConfigResult<Option<i64>> {
        let Some(expr) = expr else {
            return Ok(None);
        };
        match self.eval(expr)?.into_value()? {
            Value::Null => Ok(None),
            other => expect_int(&other, "slice index").map(Some),
        }
    }

    fn subscript(&self, value: Operand<'r>, index: &Subscript) -> ConfigResult<Operand<'r>> {
        match index {
            Subscript::Index(key) => {
                let key = self.eval(key)?.into_value()?;
                self.index(value, key)
            }
            Subscript::Slice { lower, upper, step } => {
                let (start, stop, step) = (
                    self.optional_int(lower)?,
                    self.optional_int(upper)?,
                    self.optional_int(step)?,
                );
                let sliced = match value {
                    Operand::View(view) => Value::List(
                        view.slice(start, stop, step)?
                            .iter()
                            .map(Resolved::to_value)
                            .collect::<ConfigResult<_>>()?,
                    ),
                    Operand::Value(Value::List(items)) => Value::List(
                        slice_indices(items.len(), start, stop, step)?
                            .into_iter()
                            .map(|i| items[i].clone())
                            .collect(),
                    ),
                    Operand::Value(Value::Str(s)) => {
                        let chars = s.chars().collect_vec();
                        Value::Str(
                            slice_indices(chars.len(), start, stop, step)?
                                .into_iter()
                                .map(|i| chars[i])
                                .collect(),
                        )
                    }
                    other => {
                        return Err(eval_error(format!(
                            "{} cannot be sliced",
                            other.into_value()?.type_name()
                        )));
                    }
                };
                Ok(Operand::Value(sliced))
            }
        }
    }

    fn index(&self, value: Operand<'r>, key: Value) -> ConfigResult<Operand<'r>> {
        match (value, key) {
            (Operand::View(view), Value::Str(key)) => Ok(view.get(&key)?.into()),
            (Operand::View(view), key) => Ok(view.index(expect_int(&key, "index")?)?.into()),
            (Operand::Value(Value::Map(map)), Value::Str(key)) => map
                .get(&key)
                .cloned()
                .map(Operand::Value)
                .ok_or_else(|| eval_error(format!("key {key:?} not found"))),
            (Operand::Value(Value::List(items)), key) => {
                let index = expect_int(&key, "list index")?;
                normalize_index(index, items.len())
                    .map(|i| Operand::Value(items[i].clone()))
                    .ok_or_else(|| eval_error("list index out of range"))
            }
            (Operand::Value(Value::Str(s)), key) => {
                let index = expect_int(&key, "string index")?;
                let chars = s.chars().collect_vec();
                normalize_index(index, chars.len())
                    .map(|i| Operand::Value(Value::Str(chars[i].to_string())))
                    .ok_or_else(|| eval_error("string index out of range"))
            }
            (other, _) => Err(eval_error(format!(
                "'{}' object is not subscriptable",
                other.into_value()?.type_name()
            ))),
        }
    }

    fn eval(&self, expr: &Expr) -> ConfigResult<Operand<'r>> {
        let operand = match expr {
            Expr::Constant(constant) => Operand::Value(match constant {
                Constant::None => Value::Null,
                Constant::Bool(b) => Value::Bool(*b),
                Constant::Int(i) => Value::Int(*i),
                Constant::Float(f) => Value::Float(*f),
                Constant::Str(s) => Value::Str(s.clone()),
            }),
            Expr::Name(name) => self.name(name)?,
            Expr::Attribute { value, attr } => self.attribute(self.eval(value)?, attr)?,
            Expr::Subscript { value, index } => self.subscript(self.eval(value)?, index)?,
            Expr::Call { func, args } => {
                let Operand::Function(func) = self.eval(func)? else {
                    return Err(eval_error("object is not callable"));
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<ConfigResult<Vec<_>>>()?;
                Operand::Value(call(func, args)?)
            }
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                if *op == UnaryOp::Not {
                    return Ok(Operand::Value(Value::Bool(!operand.is_truthy()?)));
                }
                let value = operand.into_value()?;
                Operand::Value(match (op, Num::of(&value)) {
                    (UnaryOp::Neg, Some(Num::Int(i))) => {
                        Value::Int(i.checked_neg().ok_or_else(overflow)?)
                    }
                    (UnaryOp::Neg, Some(Num::Float(f))) => Value::Float(-f),
                    (UnaryOp::Pos, Some(Num::Int(i))) => Value::Int(i),
                    (UnaryOp::Pos, Some(Num::Float(f))) => Value::Float(f),
                    _ => {
                        return Err(eval_error(format!(
                            "bad operand type for unary {op:?}: '{}'",
                            value.type_name()
                        )));
                    }
                })
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?.into_value()?;
                let right = self.eval(right)?.into_value()?;
                Operand::Value(binary_op(*op, &left, &right)?)
            }
            Expr::Compare { left, comparisons } => {
                let mut left = self.eval(left)?;
                for (op, right) in comparisons {
                    let right = self.eval(right)?;
                    if !compare_operands(*op, left, &right)? {
                        return Ok(Operand::Value(Value::Bool(false)));
                    }
                    left = right;
                }
                Operand::Value(Value::Bool(true))
            }
            Expr::Bool { op, left, right } => {
                let left = self.eval(left)?;
                let short_circuit = match op {
                    BoolOp::And => !left.is_truthy()?,
                    BoolOp::Or => left.is_truthy()?,
                };
                if short_circuit {
                    left
                } else {
                    self.eval(right)?
                }
            }
            Expr::Conditional { test, body, orelse } => {
                if self.eval(test)?.is_truthy()? {
                    self.eval(body)?
                } else {
                    self.eval(orelse)?
                }
            }
            Expr::List(items) | Expr::Tuple(items) => Operand::Value(Value::List(
                items
                    .iter()
                    .map(|item| self.eval(item)?.into_value())
                    .collect::<ConfigResult<_>>()?,
            )),
            Expr::Dict(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries {
                    let Value::Str(key) = self.eval(key)?.into_value()? else {
                        return Err(eval_error("mapping keys must be strings"));
                    };
                    map.insert(key, self.eval(value)?.into_value()?);
                }
                Operand::Value(Value::Map(map))
            }
        };
        Ok(operand)
    }
}

/// Evaluate `expr` with `c` bound to `root`. A container result is returned fully resolved.
pub fn evaluate(expr: &Expr, root: &View<'_>) -> ConfigResult<Value> {
    Evaluator { root }.eval(expr)?.into_value()
}
