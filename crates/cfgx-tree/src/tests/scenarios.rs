//! End-to-end flows through merge, overrides and resolution.

use pretty_assertions::assert_eq;

use super::{config_error, lit};
use crate::errors::ConfigError;
use crate::merge::{merge, merge_all};
use crate::overrides::apply_overrides;
use crate::resolve::resolve_lazy;
use crate::value::{Lazy, Value};

#[test]
fn parent_chain_merge() {
    let chain = [
        lit("{'lr': 0.1, 'optim': 'sgd'}"),
        lit("{'lr': 0.01}"),
        lit("{'batch_size': 64}"),
    ];
    assert_eq!(
        merge_all(&chain),
        lit("{'lr': 0.01, 'optim': 'sgd', 'batch_size': 64}")
    );
}

#[test_log::test]
fn lazy_sees_overridden_value() {
    let mut cfg = lit("{'trainer': {'steps': 1000}, 'warmup_steps': None}");
    cfg.as_map_mut().unwrap()["warmup_steps"] =
        Lazy::expr("c.trainer.steps * 0.1").unwrap().into();

    apply_overrides(&mut cfg, ["trainer.steps=5000"]).unwrap();
    resolve_lazy(&mut cfg).unwrap();
    assert_eq!(cfg.get("warmup_steps"), Some(&Value::Int(500)));
}

#[test]
fn replace_does_not_merge() {
    let base = lit("{'opt': {'lr': 0.1, 'momentum': 0.9}}");
    let mut overlay = Value::map();
    overlay.as_map_mut().unwrap().insert(
        "opt".into(),
        Value::Replace(Box::new(lit("{'lr': 0.5}"))),
    );
    assert_eq!(merge(&base, &overlay), lit("{'opt': {'lr': 0.5}}"));
}

#[test]
fn merged_lazies_resolve_against_final_tree() {
    // A lazy defined in a parent sees the child's values
    let mut parent = lit("{'model': {'dim': 128}}");
    parent.as_map_mut().unwrap()["model"]
        .as_map_mut()
        .unwrap()
        .insert("heads".into(), Lazy::expr("c.model.dim // 64").unwrap().into());
    let child = lit("{'model': {'dim': 512}}");

    let mut cfg = merge(&parent, &child);
    resolve_lazy(&mut cfg).unwrap();
    assert_eq!(cfg, lit("{'model': {'dim': 512, 'heads': 8}}"));
}

#[test]
fn round_trip_through_getter() {
    let mut cfg = Value::map();
    let overrides = [
        "a.b=1",
        "a.list=[1, 2, 3]",
        "a.list[0]='x'",
        "a.b=2.5",
        "deep.x[2].y=None",
    ];
    apply_overrides(&mut cfg, overrides).unwrap();
    assert_eq!(cfg.get("a.b"), Some(&Value::Float(2.5)));
    assert_eq!(cfg.get("a.list[0]"), Some(&Value::from("x")));
    assert_eq!(cfg.get("deep.x[2].y"), Some(&Value::Null));
    assert_eq!(cfg.get("deep.x[0]"), Some(&Value::Null));
}

#[test]
fn mutual_reference_is_a_cycle() {
    let mut cfg = Value::map();
    apply_overrides(&mut cfg, ["a=lazy:c.b + 1", "b=lazy:c.a + 1"]).unwrap();
    let err = resolve_lazy(&mut cfg).unwrap_err();
    let ConfigError::CycleDetected(path) = config_error(&err) else {
        panic!("expected a cycle error, got {err}");
    };
    assert!(["a", "b"].contains(&path.to_string().as_str()));
}

#[test]
fn nested_auto_creation() {
    let mut cfg = Value::map();
    apply_overrides(
        &mut cfg,
        ["x.y[0].name=conv", "x.y[1].attrs.out_channels=64"],
    )
    .unwrap();
    assert_eq!(
        cfg,
        lit("{'x': {'y': [{'name': 'conv'}, {'attrs': {'out_channels': 64}}]}}")
    );
}

#[test]
fn negative_index_past_start() {
    let mut cfg = lit("{'layers': ['conv1', 'conv2']}");
    let err = apply_overrides(&mut cfg, ["layers[-3]=conv3"]).unwrap_err();
    assert!(matches!(
        config_error(&err),
        ConfigError::IndexOutOfRange { index: -3, len: 2, .. }
    ));
    assert_eq!(cfg, lit("{'layers': ['conv1', 'conv2']}"));
}

#[test]
fn deletes_of_missing_paths_are_noops() {
    let mut cfg = lit("{'a': {'b': 1}}");
    apply_overrides(&mut cfg, ["a.c!=", "missing!=", "a.b.c!="]).unwrap();
    assert_eq!(cfg, lit("{'a': {'b': 1}}"));
}
