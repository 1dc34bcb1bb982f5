use pretty_assertions::assert_eq;

use super::{config_error, lit};
use crate::errors::ConfigError;
use crate::overrides::{append_to_nested, delete_nested, remove_value_from_list, set_nested};
use crate::path::Path;
use crate::value::Value;

fn path(input: &str) -> Path {
    Path::parse(input).unwrap()
}

#[test]
fn set_nested_dict() {
    let mut cfg = Value::map();
    set_nested(&mut cfg, &path("a.b.c"), Value::Int(42)).unwrap();
    assert_eq!(cfg, lit("{'a': {'b': {'c': 42}}}"));
}

#[test]
fn set_nested_list() {
    let mut cfg = Value::map();
    set_nested(&mut cfg, &path("a.b[0].x"), "hi".into()).unwrap();
    assert_eq!(cfg, lit("{'a': {'b': [{'x': 'hi'}]}}"));
}

#[test]
fn set_nested_expand_list() {
    let mut cfg = Value::list();
    set_nested(&mut cfg, &path("[2]"), "foo".into()).unwrap();
    assert_eq!(cfg, lit("[None, None, 'foo']"));
}

#[test]
fn set_nested_last_list_index() {
    let mut cfg = lit("['a', 'b']");
    set_nested(&mut cfg, &path("[-1]"), "c".into()).unwrap();
    assert_eq!(cfg, lit("['a', 'c']"));
}

#[test]
fn set_nested_replaces_null_intermediates() {
    let mut cfg = lit("{'a': None, 'b': [None]}");
    set_nested(&mut cfg, &path("a.x"), Value::Int(1)).unwrap();
    set_nested(&mut cfg, &path("b[0][1]"), Value::Int(2)).unwrap();
    assert_eq!(cfg, lit("{'a': {'x': 1}, 'b': [[None, 2]]}"));
}

#[test]
fn set_nested_type_mismatch() {
    let mut cfg = lit("{'a': 1, 'l': [1]}");

    let err = set_nested(&mut cfg, &path("a.b"), Value::Int(2)).unwrap_err();
    assert_eq!(config_error(&err), &ConfigError::NotAMapping(path("a")));

    let err = set_nested(&mut cfg, &path("l.x"), Value::Int(2)).unwrap_err();
    assert_eq!(config_error(&err), &ConfigError::NotAMapping(path("l")));

    let err = set_nested(&mut cfg, &path("a[0]"), Value::Int(2)).unwrap_err();
    assert_eq!(config_error(&err), &ConfigError::NotAList(path("a")));
}

#[test]
fn negative_intermediate_index_out_of_range() {
    let mut cfg = lit("{'layers': [{'units': 1}]}");
    set_nested(&mut cfg, &path("layers[-1].units"), Value::Int(2)).unwrap();
    assert_eq!(cfg, lit("{'layers': [{'units': 2}]}"));

    let err = set_nested(&mut cfg, &path("layers[-2].units"), Value::Int(3)).unwrap_err();
    assert!(matches!(
        config_error(&err),
        ConfigError::IndexOutOfRange { index: -2, len: 1, .. }
    ));
}

#[test]
fn empty_path_is_invalid() {
    let mut cfg = Value::map();
    let err = set_nested(&mut cfg, &Path::root(), Value::Int(1)).unwrap_err();
    assert!(matches!(config_error(&err), ConfigError::InvalidPath { .. }));
}

#[test]
fn append_creates_and_pads() {
    let mut cfg = Value::map();
    append_to_nested(&mut cfg, &path("a.b"), Value::Int(1)).unwrap();
    append_to_nested(&mut cfg, &path("runs[1]"), "x".into()).unwrap();
    assert_eq!(cfg, lit("{'a': {'b': [1]}, 'runs': [None, ['x']]}"));
}

#[test]
fn delete_returns_removed_value() {
    let mut cfg = lit("{'a': {'b': 1}, 'l': [1, 2]}");
    assert_eq!(
        delete_nested(&mut cfg, &path("a.b")).unwrap(),
        Some(Value::Int(1))
    );
    assert_eq!(
        delete_nested(&mut cfg, &path("l[-2]")).unwrap(),
        Some(Value::Int(1))
    );
    assert_eq!(delete_nested(&mut cfg, &path("l[5]")).unwrap(), None);
    assert_eq!(delete_nested(&mut cfg, &path("l.x")).unwrap(), None);
    assert_eq!(delete_nested(&mut cfg, &path("a[0]")).unwrap(), None);
    assert_eq!(cfg, lit("{'a': {}, 'l': [2]}"));
}

#[test]
fn remove_only_first_match() {
    let mut cfg = lit("{'l': [1, 2, 1]}");
    remove_value_from_list(&mut cfg, &path("l"), &Value::Int(1)).unwrap();
    assert_eq!(cfg, lit("{'l': [2, 1]}"));

    remove_value_from_list(&mut cfg, &path("l"), &Value::Int(7)).unwrap();
    assert_eq!(cfg, lit("{'l': [2, 1]}"));

    // Numeric equality across int and float
    remove_value_from_list(&mut cfg, &path("l"), &Value::Float(2.0)).unwrap();
    assert_eq!(cfg, lit("{'l': [1]}"));
}
