use std::fs;
use std::path::{Path, PathBuf};

use cfgx::{ConfigError, LoadOptions, Value, load};
use cfgx_tree::parse_literal;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

fn lit(s: &str) -> Value {
    parse_literal(s).unwrap()
}

fn load_one(path: &Path) -> anyhow::Result<Value> {
    load(&[path], &LoadOptions::default())
}

#[test]
fn parent_precedence() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "parent1.cfg", r#"config = {"lr": 0.1, "optim": "sgd"}"#);
    write(
        dir.path(),
        "parent2.cfg",
        "parents = [\"parent1.cfg\"]\nconfig = {\"lr\": 0.01}\n",
    );
    let child = write(
        dir.path(),
        "child.cfg",
        "parents = [\"parent2.cfg\"]\nconfig = {\"batch_size\": 64}\n",
    );

    assert_eq!(
        load_one(&child).unwrap(),
        lit("{'lr': 0.01, 'optim': 'sgd', 'batch_size': 64}")
    );
}

#[test]
fn key_deletion() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "parent.cfg",
        r#"config = {"model": {"name": "resnet", "dropout": 0.5}}"#,
    );
    let child = write(
        dir.path(),
        "child.cfg",
        "parents = [\"parent.cfg\"]\nconfig  = {\"model\": {\"dropout\": Delete()}}\n",
    );

    assert_eq!(load_one(&child).unwrap(), lit("{'model': {'name': 'resnet'}}"));
}

#[test]
fn key_replacement() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "parent.cfg",
        r#"config = {"model": {"name": "resnet", "dropout": 0.5}}"#,
    );
    let child = write(
        dir.path(),
        "child.cfg",
        "parents = [\"parent.cfg\"]\n\
         config = {\"model\": Replace({\"name\": \"vit\", \"activation\": \"relu\"})}\n",
    );

    assert_eq!(
        load_one(&child).unwrap(),
        lit("{'model': {'name': 'vit', 'activation': 'relu'}}")
    );
}

#[test]
fn parents_in_other_directories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("base")).unwrap();
    fs::create_dir(dir.path().join("runs")).unwrap();
    write(dir.path(), "base/model.cfg", "config = {'depth': 18, 'width': 64}");
    let run = write(
        dir.path(),
        "runs/deep.cfg",
        "parents = '../base/model.cfg'\nconfig = {'depth': 50}",
    );

    assert_eq!(load_one(&run).unwrap(), lit("{'depth': 50, 'width': 64}"));
}

#[test]
fn multiple_configs_order() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.cfg", "config = {'a': 1, 'b': 2}");
    let b = write(dir.path(), "b.cfg", "config = {'b': 3, 'c': 4}");

    let merged = load(&[a, b], &LoadOptions::default()).unwrap();
    assert_eq!(merged, lit("{'a': 1, 'b': 3, 'c': 4}"));
}

#[test_log::test]
fn lazy_resolution_with_overrides() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "cfg.cfg",
        r#"
config = {
    "trainer": {"steps": 1000},
    "warmup_steps": Lazy("int(c['trainer']['steps'] * 0.1)"),
}
"#,
    );

    let options = LoadOptions {
        overrides: vec!["trainer.steps=5000".into()],
        ..Default::default()
    };
    let cfg = load(&[&path], &options).unwrap();
    assert_eq!(cfg.get("trainer.steps"), Some(&Value::Int(5000)));
    assert_eq!(cfg.get("warmup_steps"), Some(&Value::Int(500)));
}

#[test]
fn lazy_nested_access() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "cfg.cfg",
        r#"
config = {
    "trainer": {"steps": 1000},
    "scheduler": {
        "warmup_steps": Lazy("int(c['trainer']['steps'] * 0.1)")
    },
}
"#,
    );

    let cfg = load_one(&path).unwrap();
    assert_eq!(cfg.get("scheduler.warmup_steps"), Some(&Value::Int(100)));
}

#[test]
fn lazy_attribute_access() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "cfg.cfg",
        r#"
config = {
    "trainer": {"stages": [{"max_steps": 1000}]},
    "warmup_steps": Lazy("int(c.trainer.stages[0].max_steps * 0.1)"),
}
"#,
    );

    let cfg = load_one(&path).unwrap();
    assert_eq!(cfg.get("warmup_steps"), Some(&Value::Int(100)));
}

#[test]
fn load_without_resolve_lazy() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "cfg.cfg",
        "config = {'steps': 1000, 'warmup_steps': Lazy('int(c.steps * 0.1)')}",
    );

    let options = LoadOptions {
        resolve_lazy: false,
        ..Default::default()
    };
    let cfg = load(&[&path], &options).unwrap();
    assert!(matches!(cfg.get("warmup_steps"), Some(Value::Deferred(_))));
}

#[test]
fn lazy_cycle_raises() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        "cfg.cfg",
        "config = {'a': Lazy('c.b'), 'b': Lazy('c.a')}",
    );

    let err = load_one(&path).unwrap_err();
    assert!(err.to_string().starts_with("Lazy cycle detected at"));
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::CycleDetected(_))
    ));
}

#[test]
fn parent_cycle_raises() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a.cfg", "parents = 'b.cfg'");
    let b = write(dir.path(), "b.cfg", "parents = 'a.cfg'");

    let err = load_one(&b).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::ParentCycle(_))
    ));
}

#[test]
fn missing_file_names_the_path() {
    let dir = TempDir::new().unwrap();
    let err = load_one(&dir.path().join("absent.cfg")).unwrap_err();
    assert!(format!("{err:#}").contains("absent.cfg"));
}
