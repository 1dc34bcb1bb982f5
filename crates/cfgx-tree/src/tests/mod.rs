mod nested;
mod scenarios;

use crate::errors::ConfigError;
use crate::literal::parse_literal;
use crate::value::Value;

/// Build a tree from a literal, e.g. `lit("{'a': [1, 2]}")`.
pub(crate) fn lit(input: &str) -> Value {
    parse_literal(input).unwrap()
}

pub(crate) fn config_error(err: &anyhow::Error) -> &ConfigError {
    err.downcast_ref::<ConfigError>()
        .unwrap_or_else(|| panic!("not a ConfigError: {err:?}"))
}
