//! Reading configuration documents and following their `parents` chains.
//!
//! A document is a list of `name = <literal>` statements. Only two names mean anything:
//!
//! ```text
//! parents = ["base.cfg", "../shared/optim.cfg"]
//! config = {
//!     "optimizer": {"lr": 3e-4, "schedule": Delete()},
//!     "trainer": {"warmup": Lazy("c.trainer.max_steps // 10")},
//! }
//! ```

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, anyhow};
use cfgx_syntax::ast::Statement;
use cfgx_syntax::parse_document;
use cfgx_tree::{ConfigError, ConfigResult, Value, apply_overrides, literal_value, merge_all};
use indexmap::IndexMap;
use tracing::{debug, info};

const CONFIG_NAME: &str = "config";
const PARENTS_NAME: &str = "parents";

/// The bindings of one document that the loader cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub config: Value,
    /// Parent documents, relative to the directory of this one
    pub parents: Vec<String>,
}

fn line_of(text: &str, offset: usize) -> usize {
    text.chars().take(offset).filter(|c| *c == '\n').count() + 1
}

fn invalid_document(location: &str, line: usize, reason: String) -> anyhow::Error {
    ConfigError::InvalidDocument {
        location: format!("{location}:{line}"),
        reason,
    }
    .into()
}

fn last_binding<'d>(statements: &'d [Statement], name: &str) -> Option<&'d Statement> {
    statements.iter().rev().find(|stmt| stmt.target == name)
}

fn parents_value(value: Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(vec![]),
        Value::Str(parent) => Ok(vec![parent]),
        Value::List(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Str(parent) => Ok(parent),
                other => Err(format!(
                    "`parents` entries must be strings, not {}",
                    other.type_name()
                )),
            })
            .collect(),
        other => Err(format!(
            "`parents` must be a string or a list of strings, not {}",
            other.type_name()
        )),
    }
}

impl SourceDocument {
    /// Parse the text of a document. `location` only shows up in error messages.
    pub fn parse(text: &str, location: &str) -> ConfigResult<SourceDocument> {
        let document = parse_document(text).map_err(|err| {
            invalid_document(location, line_of(text, err.offset), err.to_string())
        })?;

        for stmt in &document.statements {
            if stmt.target != CONFIG_NAME && stmt.target != PARENTS_NAME {
                debug!(location, name = %stmt.target, "ignoring binding");
            }
        }

        let config = match last_binding(&document.statements, CONFIG_NAME) {
            None => Value::map(),
            Some(stmt) => {
                let line = line_of(text, stmt.offset);
                let value = literal_value(&stmt.value, true)
                    .with_context(|| format!("in `config` at {location}:{line}"))?;
                if !matches!(value, Value::Map(_)) {
                    return Err(invalid_document(
                        location,
                        line,
                        format!("`config` must be a dict, not {}", value.type_name()),
                    ));
                }
                value
            }
        };

        let parents = match last_binding(&document.statements, PARENTS_NAME) {
            None => vec![],
            Some(stmt) => {
                let line = line_of(text, stmt.offset);
                let value = literal_value(&stmt.value, false)
                    .with_context(|| format!("in `parents` at {location}:{line}"))?;
                parents_value(value).map_err(|reason| invalid_document(location, line, reason))?
            }
        };

        Ok(SourceDocument { config, parents })
    }
}

/// Lexically clean up `path`: drop `.` components and fold `..` into the preceding one.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut ret = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(ret.components().next_back(), Some(Component::Normal(_)))
                    && ret.pop();
                if !popped {
                    ret.push(component);
                }
            }
            other => ret.push(other),
        }
    }
    ret
}

/// Somewhere documents can be read from.
pub trait ConfigSource {
    fn read(&self, path: &Path) -> ConfigResult<SourceDocument>;

    /// A stable name for `path`. Two paths naming the same document must locate to the same
    /// value, since parent cycles are detected by comparing them.
    fn locate(&self, path: &Path) -> ConfigResult<PathBuf> {
        Ok(normalize_path(path))
    }
}

/// Documents on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSource;

impl ConfigSource for FileSource {
    fn read(&self, path: &Path) -> ConfigResult<SourceDocument> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        SourceDocument::parse(&text, &path.display().to_string())
    }

    fn locate(&self, path: &Path) -> ConfigResult<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))
    }
}

/// Documents held in memory, keyed by their normalized path.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    documents: IndexMap<PathBuf, String>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    pub fn insert<P: AsRef<Path>, S: Into<String>>(&mut self, path: P, text: S) -> &mut Self {
        self.documents
            .insert(normalize_path(path.as_ref()), text.into());
        self
    }
}

impl ConfigSource for MemorySource {
    fn read(&self, path: &Path) -> ConfigResult<SourceDocument> {
        let text = self
            .documents
            .get(&normalize_path(path))
            .ok_or_else(|| anyhow!("no such document: {}", path.display()))?;
        SourceDocument::parse(text, &path.display().to_string())
    }
}

/// One link of an inheritance chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSpec {
    pub path: PathBuf,
    pub config: Value,
}

fn collect_into<S: ConfigSource + ?Sized>(
    source: &S,
    path: &Path,
    stack: &mut Vec<PathBuf>,
    out: &mut Vec<ConfigSpec>,
) -> ConfigResult<()> {
    let path = source.locate(path)?;
    if stack.contains(&path) {
        return Err(ConfigError::ParentCycle(path.display().to_string()).into());
    }

    let document = source.read(&path)?;
    debug!(path = %path.display(), parents = ?document.parents, "read config document");

    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    stack.push(path.clone());
    for parent in &document.parents {
        collect_into(source, &dir.join(parent), stack, out)?;
    }
    stack.pop();

    out.push(ConfigSpec {
        path,
        config: document.config,
    });
    Ok(())
}

/// The flattened inheritance chain of the document at `path`, farthest parent first and the
/// document itself last. A parent listed by several documents appears once per listing.
pub fn collect_config_specs<S: ConfigSource + ?Sized>(
    source: &S,
    path: &Path,
) -> ConfigResult<Vec<ConfigSpec>> {
    let mut ret = vec![];
    collect_into(source, path, &mut vec![], &mut ret)?;
    Ok(ret)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Applied in order after merging, e.g. `trainer.max_steps=5000`
    pub overrides: Vec<String>,
    pub resolve_lazy: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            overrides: vec![],
            resolve_lazy: true,
        }
    }
}

/// Load and merge the documents at `paths` from the filesystem. See [`load_from`].
pub fn load<P: AsRef<Path>>(paths: &[P], options: &LoadOptions) -> ConfigResult<Value> {
    load_from(&FileSource, paths, options)
}

/// Load every path's inheritance chain, merge all of them in order (later paths win), apply
/// the overrides and finally compute lazy values unless `options.resolve_lazy` is off.
pub fn load_from<S, P>(source: &S, paths: &[P], options: &LoadOptions) -> ConfigResult<Value>
where
    S: ConfigSource + ?Sized,
    P: AsRef<Path>,
{
    let mut specs = vec![];
    for path in paths {
        specs.extend(collect_config_specs(source, path.as_ref())?);
    }

    let mut cfg = merge_all(specs.iter().map(|spec| &spec.config));
    apply_overrides(&mut cfg, &options.overrides)?;
    if options.resolve_lazy {
        cfgx_tree::resolve_lazy(&mut cfg)?;
    }

    info!(
        documents = specs.len(),
        overrides = options.overrides.len(),
        resolved = options.resolve_lazy,
        "loaded config"
    );
    Ok(cfg)
}
