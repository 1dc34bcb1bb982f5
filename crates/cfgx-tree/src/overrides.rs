//! Command-line style point mutations: `path=value`, `path+=value`, `path!=` and
//! `path-=value`.
//!
//! Assignment and append create whatever is missing along the way and fail loudly on bad
//! indices. Delete and remove-value never create anything and quietly do nothing when the
//! target is absent.

use derive_more::Display;
use tracing::debug;

use crate::errors::{ConfigError, ConfigResult};
use crate::literal::infer_value;
use crate::path::{Path, Segment};
use crate::value::{Value, normalize_index};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum OverrideOp {
    #[display("=")]
    Assign,
    #[display("+=")]
    Append,
    #[display("!=")]
    Delete,
    #[display("-=")]
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path: Path,
    pub op: OverrideOp,
    /// Inferred right-hand side; always `Null` for [`OverrideOp::Delete`]
    pub value: Value,
}

/// Split an override into path text, operator and value text.
///
/// The operator is found at the first `=`. If the character before it is one of `+`, `-` or
/// `!`, the two together form the operator. Everything after the `=` is the value, which is
/// why `foo=bar+=3` assigns the string `bar+=3`.
pub fn split_override(text: &str) -> ConfigResult<(&str, OverrideOp, &str)> {
    let Some(eq) = text.find('=') else {
        return Err(ConfigError::MalformedOverride(text.to_string()).into());
    };

    let (op, key_end) = match text[..eq].chars().next_back() {
        Some('+') => (OverrideOp::Append, eq - 1),
        Some('-') => (OverrideOp::Remove, eq - 1),
        Some('!') => (OverrideOp::Delete, eq - 1),
        _ => (OverrideOp::Assign, eq),
    };

    Ok((&text[..key_end], op, &text[eq + 1..]))
}

pub fn parse_override(text: &str) -> ConfigResult<Override> {
    let (key, op, value) = split_override(text)?;
    let path = Path::parse(key)?;

    let value = match op {
        OverrideOp::Delete if !value.is_empty() => {
            return Err(ConfigError::DeleteWithValue(text.to_string()).into());
        }
        OverrideOp::Delete => Value::Null,
        _ => infer_value(value)?,
    };

    Ok(Override { path, op, value })
}

impl Override {
    pub fn apply(self, tree: &mut Value) -> ConfigResult<()> {
        match self.op {
            OverrideOp::Assign => set_nested(tree, &self.path, self.value),
            OverrideOp::Append => append_to_nested(tree, &self.path, self.value),
            OverrideOp::Delete => {
                delete_nested(tree, &self.path)?;
                Ok(())
            }
            OverrideOp::Remove => remove_value_from_list(tree, &self.path, &self.value),
        }
    }
}

/// Apply `overrides` to `tree` in order. There is no rollback: when one fails, the ones before
/// it stay applied.
pub fn apply_overrides<I, S>(tree: &mut Value, overrides: I) -> ConfigResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for text in overrides {
        let text = text.as_ref();
        let parsed = parse_override(text)?;
        debug!(text, op = %parsed.op, path = %parsed.path, "applying override");
        parsed.apply(tree)?;
    }
    Ok(())
}

fn split_path(path: &Path) -> ConfigResult<(&[Segment], &Segment)> {
    path.segments()
        .split_last()
        .map(|(last, init)| (init, last))
        .ok_or_else(|| {
            ConfigError::InvalidPath {
                path: String::new(),
                reason: "empty path".to_string(),
            }
            .into()
        })
}

fn path_prefix(segments: &[Segment]) -> Path {
    Path::from(segments.to_vec())
}

/// Index into `list` for writing. Non-negative indices past the end pad the list with
/// `Null`, as long as the padding can be allocated; negative ones must land inside it.
fn slot_index(list: &mut Vec<Value>, index: i64, at: &Path) -> ConfigResult<usize> {
    let out_of_range = |len: usize| ConfigError::IndexOutOfRange {
        path: at.clone(),
        index,
        len,
    };

    if index >= 0 {
        let slot = usize::try_from(index).map_err(|_| out_of_range(list.len()))?;
        if list.len() <= slot {
            let padding = slot + 1 - list.len();
            list.try_reserve_exact(padding)
                .map_err(|_| out_of_range(list.len()))?;
            list.resize(slot + 1, Value::Null);
        }
        return Ok(slot);
    }

    normalize_index(index, list.len()).ok_or_else(|| out_of_range(list.len()).into())
}

/// Walk to the container holding the last segment, creating missing or `Null` intermediates
/// as a sequence or mapping depending on the segment that indexes them next.
fn walk_to_parent<'t>(tree: &'t mut Value, path: &Path) -> ConfigResult<&'t mut Value> {
    let (init, last) = split_path(path)?;
    let mut node = tree;

    for (i, segment) in init.iter().enumerate() {
        let next = init.get(i + 1).unwrap_or(last);
        let here = path_prefix(&init[..i]);

        let slot = match segment {
            Segment::Key(key) => node
                .as_map_mut()
                .ok_or(ConfigError::NotAMapping(here))?
                .entry(key.clone())
                .or_insert(Value::Null),
            Segment::Index(index) => {
                let list = node.as_list_mut().ok_or(ConfigError::NotAList(here.clone()))?;
                let index = slot_index(list, *index, &here)?;
                &mut list[index]
            }
        };

        if slot.is_null() {
            *slot = Value::container_for(next);
        }
        node = slot;
    }

    Ok(node)
}

/// Walk to the container holding the last segment without creating anything.
fn walk_to_parent_if_exists<'t>(tree: &'t mut Value, path: &Path) -> Option<&'t mut Value> {
    let (init, _) = split_path(path).ok()?;
    init.iter()
        .try_fold(tree, |node, segment| node.child_mut(segment))
}

/// Assign `value` at `path` (the `=` operator).
pub fn set_nested(tree: &mut Value, path: &Path, value: Value) -> ConfigResult<()> {
    let (init, last) = split_path(path)?;
    let parent = walk_to_parent(tree, path)?;
    let at = path_prefix(init);

    match last {
        Segment::Key(key) => {
            parent
                .as_map_mut()
                .ok_or(ConfigError::NotAMapping(at))?
                .insert(key.clone(), value);
        }
        Segment::Index(index) => {
            let list = parent.as_list_mut().ok_or(ConfigError::NotAList(at.clone()))?;
            let index = slot_index(list, *index, &at)?;
            list[index] = value;
        }
    }
    Ok(())
}

/// Append `value` to the sequence at `path` (the `+=` operator). A missing key, or a list
/// slot that is still padding, starts out as an empty sequence. Anything else already there,
/// `None` included, must be a sequence.
pub fn append_to_nested(tree: &mut Value, path: &Path, value: Value) -> ConfigResult<()> {
    let (init, last) = split_path(path)?;
    let parent = walk_to_parent(tree, path)?;
    let at = path_prefix(init);

    let target = match last {
        Segment::Key(key) => parent
            .as_map_mut()
            .ok_or(ConfigError::NotAMapping(at))?
            .entry(key.clone())
            .or_insert_with(Value::list),
        Segment::Index(index) => {
            let list = parent.as_list_mut().ok_or(ConfigError::NotAList(at.clone()))?;
            let index = slot_index(list, *index, &at)?;
            let slot = &mut list[index];
            if slot.is_null() {
                *slot = Value::list();
            }
            slot
        }
    };

    target
        .as_list_mut()
        .ok_or_else(|| ConfigError::NotAList(path.clone()))?
        .push(value);
    Ok(())
}

/// Delete the key or index at `path` (the `!=` operator). Returns the removed value; a
/// missing target is not an error.
pub fn delete_nested(tree: &mut Value, path: &Path) -> ConfigResult<Option<Value>> {
    let (_, last) = split_path(path)?;
    let Some(parent) = walk_to_parent_if_exists(tree, path) else {
        return Ok(None);
    };

    let removed = match (parent, last) {
        (Value::Map(map), Segment::Key(key)) => map.shift_remove(key),
        (Value::List(list), Segment::Index(index)) => {
            normalize_index(*index, list.len()).map(|i| list.remove(i))
        }
        _ => None,
    };
    Ok(removed)
}

/// Remove the first element equal to `value` from the sequence at `path` (the `-=`
/// operator), compared the way Python's `==` does, so `1` removes `True`. A missing target or value is not an error, but a target that exists and is not
/// a sequence is.
pub fn remove_value_from_list(tree: &mut Value, path: &Path, value: &Value) -> ConfigResult<()> {
    let (_, last) = split_path(path)?;
    let Some(target) = walk_to_parent_if_exists(tree, path).and_then(|p| p.child_mut(last))
    else {
        return Ok(());
    };

    let list = target
        .as_list_mut()
        .ok_or_else(|| ConfigError::NotAList(path.clone()))?;
    if let Some(position) = list.iter().position(|v| v.loosely_eq(value)) {
        list.remove(position);
    }
    Ok(())
}
