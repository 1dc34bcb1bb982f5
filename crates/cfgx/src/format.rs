//! Rendering trees as text, and writing snapshots that load back as documents.

use std::borrow::Cow;
use std::io;
use std::str::FromStr;

use anyhow::Context;
use cfgx_tree::{ConfigError, ConfigResult, Lazy, Mapping, Value};
use cfgx_util::number::format_float;
use cfgx_util::quote::quote;
use itertools::Itertools;

const LINE_WIDTH: usize = 88;
const INDENT: usize = 4;
const SNAPSHOT_PREFIX: &str = "config = ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatStyle {
    /// The one-line repr, `{'a': 1, 'b': [True, None]}`
    #[default]
    Compact,
    /// Double-quoted and broken over lines wherever a container does not fit
    Pretty,
}

impl FromStr for FormatStyle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compact" => Ok(FormatStyle::Compact),
            "pretty" => Ok(FormatStyle::Pretty),
            _ => Err(ConfigError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatOptions {
    pub style: FormatStyle,
    /// Order mapping keys throughout the tree
    pub sort_keys: bool,
}

/// A copy of `value` with the keys of every mapping in sorted order.
pub fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(
            map.iter()
                .sorted_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(k, v)| (k.clone(), sort_keys(v)))
                .collect::<Mapping>(),
        ),
        Value::List(items) => Value::List(items.iter().map(sort_keys).collect()),
        Value::Replace(inner) => Value::Replace(Box::new(sort_keys(inner))),
        other => other.clone(),
    }
}

fn prepared<'v>(config: &'v Value, options: &FormatOptions) -> Cow<'v, Value> {
    if options.sort_keys {
        Cow::Owned(sort_keys(config))
    } else {
        Cow::Borrowed(config)
    }
}

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pretty_lazy(lazy: &Lazy) -> String {
    match lazy.source() {
        Some(source) => format!("Lazy({})", quote(source, '"')),
        None => "Lazy(<function>)".to_string(),
    }
}

fn flat(value: &Value) -> String {
    match value {
        Value::Float(f) => format_float(*f),
        Value::Str(s) => quote(s, '"'),
        Value::List(items) => format!("[{}]", items.iter().map(flat).join(", ")),
        Value::Map(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", quote(k, '"'), flat(v)))
                .join(", ")
        ),
        Value::Deferred(lazy) => pretty_lazy(lazy),
        Value::Replace(inner) => format!("Replace({})", flat(inner)),
        // no quoting involved
        other => other.to_string(),
    }
}

/// Pretty-print `value`, which starts at column `column` and is followed by `trailing` more
/// characters on its last line. Nested lines are indented relative to `indent`.
fn write_pretty(out: &mut String, value: &Value, indent: usize, column: usize, trailing: usize) {
    let one_line = flat(value);
    if column + width(&one_line) + trailing <= LINE_WIDTH {
        out.push_str(&one_line);
        return;
    }

    let inner = indent + INDENT;
    match value {
        Value::List(items) if !items.is_empty() => {
            out.push_str("[\n");
            for item in items {
                out.push_str(&" ".repeat(inner));
                write_pretty(out, item, inner, inner, 1);
                out.push_str(",\n");
            }
            out.push_str(&" ".repeat(indent));
            out.push(']');
        }
        Value::Map(map) if !map.is_empty() => {
            out.push_str("{\n");
            for (key, item) in map {
                let key = format!("{}: ", quote(key, '"'));
                out.push_str(&" ".repeat(inner));
                out.push_str(&key);
                write_pretty(out, item, inner, inner + width(&key), 1);
                out.push_str(",\n");
            }
            out.push_str(&" ".repeat(indent));
            out.push('}');
        }
        Value::Replace(boxed) => {
            out.push_str("Replace(");
            write_pretty(out, boxed, indent, column + "Replace(".len(), trailing + 1);
            out.push(')');
        }
        _ => out.push_str(&one_line),
    }
}

fn render(value: &Value, style: FormatStyle, column: usize) -> String {
    match style {
        FormatStyle::Compact => value.to_string(),
        FormatStyle::Pretty => {
            let mut ret = String::new();
            write_pretty(&mut ret, value, 0, column, 0);
            ret
        }
    }
}

/// Render `config` as text.
pub fn format(config: &Value, options: &FormatOptions) -> String {
    render(&prepared(config, options), options.style, 0)
}

/// Render `config` as a snapshot document, `config = <rendered>` plus a newline.
///
/// A snapshot of a tree holding only plain values loads back to an equal tree.
pub fn dumps(config: &Value, options: &FormatOptions) -> String {
    let rendered = render(
        &prepared(config, options),
        options.style,
        SNAPSHOT_PREFIX.len(),
    );
    format!("{SNAPSHOT_PREFIX}{rendered}\n")
}

/// Write the snapshot of `config` to `writer`.
pub fn dump<W: io::Write>(
    config: &Value,
    writer: &mut W,
    options: &FormatOptions,
) -> ConfigResult<()> {
    writer
        .write_all(dumps(config, options).as_bytes())
        .context("failed to write snapshot")?;
    Ok(())
}
