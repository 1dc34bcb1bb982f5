//! Conversion of parsed literals into trees.
//!
//! Only constants, displays and unary signs on numbers are accepted. Source documents may
//! additionally use the `Delete()`, `Replace(..)` and `Lazy("..")` constructors.

use cfgx_syntax::ast::{Constant, Expr, UnaryOp};
use cfgx_syntax::parse_expression;

use crate::errors::{ConfigError, ConfigResult};
use crate::value::{Lazy, Mapping, Value};

const LAZY_PREFIX: &str = "lazy:";

fn not_a_literal(what: &str) -> anyhow::Error {
    ConfigError::NotALiteral(what.to_string()).into()
}

fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::None => Value::Null,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(i) => Value::Int(*i),
        Constant::Float(f) => Value::Float(*f),
        Constant::Str(s) => Value::Str(s.clone()),
    }
}

fn constructor_value(func: &Expr, args: &[Expr]) -> ConfigResult<Value> {
    let Expr::Name(name) = func else {
        return Err(not_a_literal("call"));
    };

    match (name.as_str(), args) {
        ("Delete", []) => Ok(Value::Delete),
        ("Replace", [inner]) => Ok(Value::Replace(Box::new(literal_value(inner, true)?))),
        ("Lazy", [Expr::Constant(Constant::Str(source))]) => Ok(Lazy::expr(source)?.into()),
        _ => Err(not_a_literal(&format!("call to {name}"))),
    }
}

/// Convert a parsed literal into a tree.
pub fn literal_value(expr: &Expr, allow_constructors: bool) -> ConfigResult<Value> {
    let value = match expr {
        Expr::Constant(constant) => constant_value(constant),
        Expr::Unary {
            op: op @ (UnaryOp::Neg | UnaryOp::Pos),
            operand,
        } => match (op, literal_value(operand, false)?) {
            (UnaryOp::Neg, Value::Int(i)) => Value::Int(
                i.checked_neg()
                    .ok_or_else(|| not_a_literal("integer overflow"))?,
            ),
            (UnaryOp::Neg, Value::Float(f)) => Value::Float(-f),
            (UnaryOp::Pos, v @ (Value::Int(_) | Value::Float(_))) => v,
            _ => return Err(not_a_literal("sign on a non-number")),
        },
        Expr::List(items) | Expr::Tuple(items) => Value::List(
            items
                .iter()
                .map(|item| literal_value(item, allow_constructors))
                .collect::<ConfigResult<_>>()?,
        ),
        Expr::Dict(entries) => {
            let mut map = Mapping::with_capacity(entries.len());
            for (key, value) in entries {
                let Expr::Constant(Constant::Str(key)) = key else {
                    return Err(not_a_literal("mapping key that is not a string"));
                };
                map.insert(key.clone(), literal_value(value, allow_constructors)?);
            }
            Value::Map(map)
        }
        Expr::Call { func, args } if allow_constructors => constructor_value(func, args)?,
        Expr::Name(name) => return Err(not_a_literal(name)),
        _ => return Err(not_a_literal("expression")),
    };
    Ok(value)
}

/// Strictly parse `input` as a literal.
pub fn parse_literal(input: &str) -> ConfigResult<Value> {
    let expr = parse_expression(input).map_err(ConfigError::from)?;
    literal_value(&expr, false)
}

/// Infer the value of an override's right-hand side.
///
/// `lazy:<expr>` becomes a deferred expression; anything that parses as a literal becomes that
/// literal; everything else is kept as the raw string, so `name=resnet` assigns `"resnet"`.
pub fn infer_value(input: &str) -> ConfigResult<Value> {
    if let Some(source) = input.strip_prefix(LAZY_PREFIX) {
        return Ok(Lazy::expr(source)?.into());
    }

    Ok(parse_literal(input).unwrap_or_else(|_| Value::Str(input.to_string())))
}

#[cfg(test)]
mod test {
    use super::{infer_value, literal_value, parse_literal};
    use crate::errors::ConfigError;
    use crate::value::Value;
    use cfgx_syntax::parse_expression;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalars() {
        assert_eq!(infer_value("123").unwrap(), Value::Int(123));
        assert_eq!(infer_value("3.14").unwrap(), Value::Float(3.14));
        assert_eq!(infer_value("3e-4").unwrap(), Value::Float(3e-4));
        assert_eq!(infer_value("50_000").unwrap(), Value::Int(50_000));
        assert_eq!(infer_value("-2").unwrap(), Value::Int(-2));
        assert_eq!(infer_value("True").unwrap(), Value::Bool(true));
        assert_eq!(infer_value("None").unwrap(), Value::Null);
        assert_eq!(infer_value("'hello'").unwrap(), Value::from("hello"));
    }

    #[test]
    fn containers() {
        assert_eq!(
            infer_value("[1, 2]").unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
        assert_eq!(
            infer_value("(1, 'a')").unwrap(),
            Value::List(vec![Value::Int(1), Value::from("a")])
        );
        assert_eq!(
            infer_value("{'x': 5}").unwrap(),
            [("x", 5)].into_iter().collect::<Value>()
        );
        assert_eq!(
            infer_value("{'a': [1, {'b': None}]}").unwrap().get("a[1].b"),
            Some(&Value::Null)
        );
    }

    #[test]
    fn fallback_to_raw_string() {
        assert_eq!(infer_value("hello").unwrap(), Value::from("hello"));
        assert_eq!(infer_value("bar+=3").unwrap(), Value::from("bar+=3"));
        assert_eq!(infer_value("").unwrap(), Value::from(""));
        assert_eq!(infer_value("a b").unwrap(), Value::from("a b"));
        assert_eq!(infer_value("1 + 2").unwrap(), Value::from("1 + 2"));
        assert_eq!(infer_value("{1: 2}").unwrap(), Value::from("{1: 2}"));
    }

    #[test]
    fn lazy_prefix() {
        let value = infer_value("lazy:c.trainer.max_steps * 0.1").unwrap();
        let Value::Deferred(lazy) = value else {
            panic!("expected a deferred value");
        };
        assert_eq!(lazy.source(), Some("c.trainer.max_steps * 0.1"));

        let err = infer_value("lazy:c.(").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn constructors_only_when_allowed() {
        let expr = parse_expression("{'a': Delete(), 'b': Replace([1]), 'c': Lazy('c.a')}").unwrap();
        assert!(literal_value(&expr, false).is_err());

        let value = literal_value(&expr, true).unwrap();
        assert_eq!(value.get("a"), Some(&Value::Delete));
        assert_eq!(
            value.get("b"),
            Some(&Value::Replace(Box::new(Value::List(vec![Value::Int(1)]))))
        );
        assert!(value.get("c").is_some_and(Value::is_deferred));

        assert!(parse_literal("Delete()").is_err());
    }
}
