//! On-demand evaluation of [`Lazy`] values.
//!
//! The tree itself is the memo: once the deferred value at a path has been computed, it is
//! written back over the [`Value::Deferred`] node, and later reads see the plain value.
//! Computations read the tree through a [`View`], and every read resolves the node it lands
//! on first. A stack of paths currently being evaluated catches cycles.

use std::cell::RefCell;
use std::fmt;

use indexmap::IndexMap;
use scopeguard::defer;
use tracing::{debug, trace};

use crate::errors::{ConfigError, ConfigResult, eval_error};
use crate::path::{Path, Segment};
use crate::value::{Lazy, Value, normalize_index};

/// Owns a tree for the duration of a resolution pass.
pub struct Resolver {
    root: RefCell<Value>,
    /// Paths whose deferred value is being evaluated, innermost last
    resolving: RefCell<Vec<Path>>,
}

impl Resolver {
    pub fn new(root: Value) -> Resolver {
        Resolver {
            root: RefCell::new(root),
            resolving: RefCell::new(vec![]),
        }
    }

    pub fn into_inner(self) -> Value {
        self.root.into_inner()
    }

    /// A view of the whole tree, as handed to deferred computations.
    pub fn root_view(&self) -> View<'_> {
        View {
            resolver: self,
            path: Path::root(),
        }
    }

    /// Resolve every deferred value in the tree, including ones produced by other deferred
    /// values.
    pub fn resolve_all(&self) -> ConfigResult<()> {
        self.resolve_node(&Path::root(), true)
    }

    /// Resolve the node at `path` only, leaving its children alone, and return it.
    pub fn resolve_at(&self, path: &Path) -> ConfigResult<Resolved<'_>> {
        self.resolve_node(path, false)?;
        self.resolved(path.clone())
    }

    fn deferred_at(&self, path: &Path) -> ConfigResult<Option<Lazy>> {
        match self.root.borrow().get_path(path) {
            None => Err(ConfigError::MissingKey(path.clone()).into()),
            Some(Value::Deferred(lazy)) => Ok(Some(lazy.clone())),
            Some(_) => Ok(None),
        }
    }

    fn resolve_node(&self, path: &Path, resolve_children: bool) -> ConfigResult<()> {
        // A computation may itself return a deferred value, which is evaluated in turn
        while let Some(lazy) = self.deferred_at(path)? {
            if self.resolving.borrow().contains(path) {
                return Err(ConfigError::CycleDetected(path.clone()).into());
            }

            self.resolving.borrow_mut().push(path.clone());
            let value = {
                defer! {
                    self.resolving.borrow_mut().pop();
                }
                trace!(%path, ?lazy, "evaluating");
                lazy.evaluate(&self.root_view())?
            };
            debug!(%path, %value, "resolved lazy value");

            let mut root = self.root.borrow_mut();
            let slot = root
                .get_path_mut(path)
                .ok_or_else(|| ConfigError::MissingKey(path.clone()))?;
            *slot = value;
        }

        if !resolve_children {
            return Ok(());
        }

        let children: Vec<Segment> = match self.root.borrow().get_path(path) {
            Some(Value::Map(map)) => map.keys().cloned().map(Segment::Key).collect(),
            Some(Value::List(list)) => (0..list.len() as i64).map(Segment::Index).collect(),
            _ => vec![],
        };
        for child in children {
            self.resolve_node(&path.child(child), true)?;
        }
        Ok(())
    }

    fn resolved(&self, path: Path) -> ConfigResult<Resolved<'_>> {
        let root = self.root.borrow();
        let node = root
            .get_path(&path)
            .ok_or_else(|| ConfigError::MissingKey(path.clone()))?;

        Ok(match node {
            Value::Map(_) => Resolved::Mapping(View {
                resolver: self,
                path,
            }),
            Value::List(_) => Resolved::Sequence(View {
                resolver: self,
                path,
            }),
            other => Resolved::Value(other.clone()),
        })
    }

    /// Run `f` on the (possibly still unresolved) node at `path`.
    fn with_node<T>(&self, path: &Path, f: impl FnOnce(&Value) -> T) -> ConfigResult<T> {
        let root = self.root.borrow();
        let node = root
            .get_path(path)
            .ok_or_else(|| ConfigError::MissingKey(path.clone()))?;
        Ok(f(node))
    }
}

/// Resolve every deferred value in `tree` in place.
///
/// On error the tree is left as far as resolution got: values computed before the failure
/// stay written back.
pub fn resolve_lazy(tree: &mut Value) -> ConfigResult<()> {
    let resolver = Resolver::new(std::mem::take(tree));
    let result = resolver.resolve_all();
    *tree = resolver.into_inner();
    result
}

/// A read-only window onto a container inside the tree being resolved.
///
/// Reading through a view resolves what it reads, so `c.get("a")?.get("b")` works even when
/// `a` is a deferred value producing a mapping.
#[derive(Clone)]
pub struct View<'r> {
    resolver: &'r Resolver,
    path: Path,
}

/// The result of reading through a [`View`]: a scalar, or a view of a nested container.
#[derive(Clone, Debug)]
pub enum Resolved<'r> {
    Value(Value),
    Mapping(View<'r>),
    Sequence(View<'r>),
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "View({})", self.path)
    }
}

impl<'r> View<'r> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_mapping(&self) -> bool {
        matches!(
            self.resolver.with_node(&self.path, |v| matches!(v, Value::Map(_))),
            Ok(true)
        )
    }

    pub fn is_sequence(&self) -> bool {
        matches!(
            self.resolver.with_node(&self.path, |v| matches!(v, Value::List(_))),
            Ok(true)
        )
    }

    /// Look up `key` in a mapping.
    pub fn get(&self, key: &str) -> ConfigResult<Resolved<'r>> {
        if !self.is_mapping() {
            return Err(ConfigError::NotAMapping(self.path.clone()).into());
        }
        self.resolver.resolve_at(&self.path.child(key))
    }

    /// Attribute-style access, `c.trainer` for `c["trainer"]`. Names starting with `_` are
    /// never looked up.
    pub fn attr(&self, name: &str) -> ConfigResult<Resolved<'r>> {
        if name.starts_with('_') {
            return Err(eval_error(format!(
                "attribute {name:?} of {} is not accessible",
                self.path
            )));
        }
        self.get(name)
    }

    /// Element `index` of a sequence; negative indices count from the end.
    pub fn index(&self, index: i64) -> ConfigResult<Resolved<'r>> {
        if !self.is_sequence() {
            return Err(ConfigError::NotAList(self.path.clone()).into());
        }
        let len = self.len()?;
        let normalized = normalize_index(index, len).ok_or_else(|| ConfigError::IndexOutOfRange {
            path: self.path.clone(),
            index,
            len,
        })?;
        self.resolver
            .resolve_at(&self.path.child(normalized as i64))
    }

    /// Elements selected by a slice, with Python's clamping rules.
    pub fn slice(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    ) -> ConfigResult<Vec<Resolved<'r>>> {
        if !self.is_sequence() {
            return Err(ConfigError::NotAList(self.path.clone()).into());
        }
        slice_indices(self.len()?, start, stop, step)?
            .into_iter()
            .map(|i| self.index(i as i64))
            .collect()
    }

    pub fn len(&self) -> ConfigResult<usize> {
        self.resolver
            .with_node(&self.path, |node| match node {
                Value::Map(map) => Ok(map.len()),
                Value::List(list) => Ok(list.len()),
                other => Err(eval_error(format!(
                    "object of type '{}' has no len()",
                    other.type_name()
                ))),
            })?
    }

    pub fn is_empty(&self) -> ConfigResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Keys of a mapping, in insertion order.
    pub fn keys(&self) -> ConfigResult<Vec<String>> {
        self.resolver
            .with_node(&self.path, |node| match node {
                Value::Map(map) => Ok(map.keys().cloned().collect()),
                _ => Err(ConfigError::NotAMapping(self.path.clone()).into()),
            })?
    }

    /// What iterating the container yields: keys for a mapping, elements for a sequence.
    pub fn iter(&self) -> ConfigResult<Vec<Resolved<'r>>> {
        if self.is_mapping() {
            return Ok(self
                .keys()?
                .into_iter()
                .map(|k| Resolved::Value(Value::Str(k)))
                .collect());
        }
        (0..self.len()? as i64).map(|i| self.index(i)).collect()
    }

    /// Deep copy of the container with every deferred value underneath resolved.
    pub fn to_value(&self) -> ConfigResult<Value> {
        if self.is_mapping() {
            let mut map = IndexMap::new();
            for key in self.keys()? {
                let value = self.get(&key)?.to_value()?;
                map.insert(key, value);
            }
            return Ok(Value::Map(map));
        }

        let items = self
            .iter()?
            .into_iter()
            .map(|item| item.to_value())
            .collect::<ConfigResult<_>>()?;
        Ok(Value::List(items))
    }
}

impl<'r> Resolved<'r> {
    fn not_subscriptable(&self) -> anyhow::Error {
        let type_name = match self {
            Resolved::Value(v) => v.type_name(),
            Resolved::Mapping(_) => "dict",
            Resolved::Sequence(_) => "list",
        };
        eval_error(format!("'{type_name}' object is not subscriptable"))
    }

    pub fn get(&self, key: &str) -> ConfigResult<Resolved<'r>> {
        match self {
            Resolved::Mapping(view) | Resolved::Sequence(view) => view.get(key),
            Resolved::Value(_) => Err(self.not_subscriptable()),
        }
    }

    pub fn attr(&self, name: &str) -> ConfigResult<Resolved<'r>> {
        match self {
            Resolved::Mapping(view) | Resolved::Sequence(view) => view.attr(name),
            Resolved::Value(v) => Err(eval_error(format!(
                "'{}' object has no attribute {name:?}",
                v.type_name()
            ))),
        }
    }

    pub fn index(&self, index: i64) -> ConfigResult<Resolved<'r>> {
        match self {
            Resolved::Mapping(view) | Resolved::Sequence(view) => view.index(index),
            Resolved::Value(_) => Err(self.not_subscriptable()),
        }
    }

    pub fn view(&self) -> Option<&View<'r>> {
        match self {
            Resolved::Mapping(view) | Resolved::Sequence(view) => Some(view),
            Resolved::Value(_) => None,
        }
    }

    /// The scalar, or a fully resolved copy of the container.
    pub fn to_value(&self) -> ConfigResult<Value> {
        match self {
            Resolved::Value(v) => Ok(v.clone()),
            Resolved::Mapping(view) | Resolved::Sequence(view) => view.to_value(),
        }
    }

    fn scalar(&self) -> Option<&Value> {
        match self {
            Resolved::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.scalar().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.scalar().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.scalar().and_then(Value::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.scalar().and_then(Value::as_str)
    }
}

/// The indices a Python slice `[start:stop:step]` selects from a sequence of length `len`.
pub fn slice_indices(
    len: usize,
    start: Option<i64>,
    stop: Option<i64>,
    step: Option<i64>,
) -> ConfigResult<Vec<usize>> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(eval_error("slice step cannot be zero"));
    }

    let len = len as i64;
    let clamp = |bound: i64, lower: i64, upper: i64| {
        let bound = if bound < 0 { bound + len } else { bound };
        bound.clamp(lower, upper)
    };

    let mut ret = vec![];
    if step > 0 {
        let start = start.map_or(0, |s| clamp(s, 0, len));
        let stop = stop.map_or(len, |s| clamp(s, 0, len));
        let mut i = start;
        while i < stop {
            ret.push(i as usize);
            i += step;
        }
    } else {
        let start = start.map_or(len - 1, |s| clamp(s, -1, len - 1));
        let stop = stop.map_or(-1, |s| clamp(s, -1, len - 1));
        let mut i = start;
        while i > stop {
            ret.push(i as usize);
            i += step;
        }
    }
    Ok(ret)
}
