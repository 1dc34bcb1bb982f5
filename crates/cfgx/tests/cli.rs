use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use cfgx::cli::{Cli, run};
use cfgx::{FormatOptions, LoadOptions, dumps, format, load};
use clap::Parser;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_config(dir: &Path, text: &str) -> PathBuf {
    let path = dir.join("cfg.cfg");
    fs::write(&path, text).unwrap();
    path
}

fn main_output(args: &[&str]) -> String {
    let cli = Cli::try_parse_from(std::iter::once("cfgx").chain(args.iter().copied())).unwrap();
    let mut out = vec![];
    run(&cli, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn render_basic() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "config = {'a': 1}\n");
    let path_str = path.to_str().unwrap();

    let expected = format(
        &load(&[&path], &LoadOptions::default()).unwrap(),
        &FormatOptions::default(),
    );
    assert_eq!(main_output(&["render", path_str]), format!("{expected}\n"));
    assert_eq!(expected, "{'a': 1}");
}

#[test]
fn render_overrides_list() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "config = {'a': {'b': 1}}\n");
    let path_str = path.to_str().unwrap();

    let out = main_output(&["render", path_str, "-o", "a.b=2", "c=3"]);
    let options = LoadOptions {
        overrides: vec!["a.b=2".into(), "c=3".into()],
        ..Default::default()
    };
    let expected = format(&load(&[&path], &options).unwrap(), &FormatOptions::default());
    assert_eq!(out, format!("{expected}\n"));
    assert_eq!(out, "{'a': {'b': 2}, 'c': 3}\n");
}

#[test]
fn dump_basic() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "config = {'a': 1}\n");
    let path_str = path.to_str().unwrap();

    let expected = dumps(
        &load(&[&path], &LoadOptions::default()).unwrap(),
        &FormatOptions::default(),
    );
    assert_eq!(main_output(&["dump", path_str]), expected);
    assert_eq!(expected, "config = {'a': 1}\n");
}

#[test]
fn dump_sorted_pretty_without_resolving() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        dir.path(),
        "config = {'z': 1, 'a': {'y': Lazy('c.z * 2'), 'x': 0}}\n",
    );
    let path_str = path.to_str().unwrap();

    assert_eq!(
        main_output(&["dump", path_str, "--format", "pretty", "--sort-keys", "--no-resolve"]),
        "config = {\"a\": {\"x\": 0, \"y\": Lazy(\"c.z * 2\")}, \"z\": 1}\n"
    );
    assert_eq!(
        main_output(&["render", path_str, "--sort-keys"]),
        "{'a': {'x': 0, 'y': 2}, 'z': 1}\n"
    );
}

#[test]
fn binary_reports_errors() {
    let dir = TempDir::new().unwrap();
    let path = write_config(dir.path(), "config = {'a': [1]}\n");

    let ok = Command::new(env!("CARGO_BIN_EXE_cfgx"))
        .arg("render")
        .arg(&path)
        .args(["-o", "a+=2"])
        .output()
        .unwrap();
    assert!(ok.status.success());
    assert_eq!(String::from_utf8_lossy(&ok.stdout), "{'a': [1, 2]}\n");

    let failed = Command::new(env!("CARGO_BIN_EXE_cfgx"))
        .arg("render")
        .arg(&path)
        .args(["-o", "a[-5]=0"])
        .output()
        .unwrap();
    assert!(!failed.status.success());
    assert!(String::from_utf8_lossy(&failed.stderr).contains("out of range"));
}
