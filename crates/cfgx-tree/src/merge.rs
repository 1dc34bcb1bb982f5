use tracing::trace;

use crate::value::{Mapping, Value};

/// Merge `overlay` on top of `base`, returning a new tree. Neither input is modified.
///
/// Mappings merge key by key, recursively. Any other overlay value replaces the base value
/// outright, so sequences are atomic. Within a mapping, [`Value::Delete`] removes the key and
/// [`Value::Replace`] sets it without merging into what was there.
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Map(base_map), Value::Map(overlay_map)) => {
            Value::Map(merge_maps(base_map, overlay_map))
        }
        (_, overlay) => settle(overlay),
    }
}

fn merge_maps(base: &Mapping, overlay: &Mapping) -> Mapping {
    let mut ret = base.clone();

    for (key, overlay_value) in overlay {
        match overlay_value {
            Value::Delete => {
                trace!(%key, "merge: delete");
                ret.shift_remove(key);
            }
            Value::Replace(inner) => {
                trace!(%key, "merge: replace");
                ret.insert(key.clone(), settle(inner));
            }
            Value::Map(overlay_map) => {
                let merged = match ret.get(key) {
                    Some(Value::Map(base_map)) => merge_maps(base_map, overlay_map),
                    _ => settle_map(overlay_map),
                };
                ret.insert(key.clone(), Value::Map(merged));
            }
            _ => {
                ret.insert(key.clone(), settle(overlay_value));
            }
        }
    }

    ret
}

fn settle_map(map: &Mapping) -> Mapping {
    map.iter()
        .filter(|(_, v)| !matches!(v, Value::Delete))
        .map(|(k, v)| (k.clone(), settle(v)))
        .collect()
}

/// Copy `value`, dropping `Delete` entries and unwrapping `Replace` wherever they occur.
fn settle(value: &Value) -> Value {
    match value {
        Value::Map(map) => Value::Map(settle_map(map)),
        Value::List(list) => Value::List(
            list.iter()
                .filter(|v| !matches!(v, Value::Delete))
                .map(settle)
                .collect(),
        ),
        Value::Replace(inner) => settle(inner),
        Value::Delete => Value::Null,
        other => other.clone(),
    }
}

/// Merge trees left to right, so later entries take precedence. An empty input yields an
/// empty mapping.
pub fn merge_all<'a, I>(values: I) -> Value
where
    I: IntoIterator<Item = &'a Value>,
{
    values.into_iter().fold(Value::map(), |acc, v| merge(&acc, v))
}

#[cfg(test)]
mod test {
    use super::{merge, merge_all};
    use crate::literal::parse_literal;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn lit(s: &str) -> Value {
        parse_literal(s).unwrap()
    }

    #[test]
    fn simple() {
        let base = lit("{'a': 1, 'b': 2}");
        let overlay = lit("{'b': 3, 'c': 4}");
        assert_eq!(merge(&base, &overlay), lit("{'a': 1, 'b': 3, 'c': 4}"));
    }

    #[test]
    fn nested_and_inputs_untouched() {
        let base = lit("{'server': {'host': 'localhost', 'port': 8080}, 'debug': True}");
        let overlay = lit("{'server': {'port': 9000}}");
        let base_before = base.clone();
        let overlay_before = overlay.clone();

        assert_eq!(
            merge(&base, &overlay),
            lit("{'server': {'host': 'localhost', 'port': 9000}, 'debug': True}")
        );
        assert_eq!(base, base_before);
        assert_eq!(overlay, overlay_before);
    }

    #[test]
    fn lists_are_atomic() {
        let base = lit("{'items': [1, 2, 3]}");
        let overlay = lit("{'items': [4, 5]}");
        assert_eq!(merge(&base, &overlay), lit("{'items': [4, 5]}"));
    }

    #[test]
    fn empty_overlay_is_identity() {
        let base = lit("{'a': {'b': [1, {'c': None}]}}");
        assert_eq!(merge(&base, &Value::map()), base);
    }

    #[test]
    fn delete_and_replace() {
        let base = lit("{'model': {'layers': 2, 'act': 'relu'}, 'opt': {'lr': 0.1, 'wd': 0.0}}");

        let mut overlay = lit("{'model': {}, 'opt': {}}");
        overlay.as_map_mut().unwrap()["model"]
            .as_map_mut()
            .unwrap()
            .insert("act".into(), Value::Delete);
        overlay.as_map_mut().unwrap()["model"]
            .as_map_mut()
            .unwrap()
            .insert("missing".into(), Value::Delete);
        overlay.as_map_mut().unwrap()["opt"] =
            Value::Replace(Box::new(lit("{'name': 'sgd'}")));

        assert_eq!(
            merge(&base, &overlay),
            lit("{'model': {'layers': 2}, 'opt': {'name': 'sgd'}}")
        );
    }

    #[test]
    fn sentinels_under_new_keys_are_settled() {
        let mut inner = lit("{'keep': 1}");
        inner.as_map_mut().unwrap().insert("gone".into(), Value::Delete);
        inner
            .as_map_mut()
            .unwrap()
            .insert("wrapped".into(), Value::Replace(Box::new(Value::Int(2))));
        let overlay: Value = [("fresh", inner)].into_iter().collect();

        let merged = merge(&Value::map(), &overlay);
        assert_eq!(merged, lit("{'fresh': {'keep': 1, 'wrapped': 2}}"));
        assert!(!merged.any(&Value::is_sentinel));
    }

    #[test]
    fn merge_all_order() {
        let layers = [
            lit("{'a': 1, 'b': {'x': 1}}"),
            lit("{'b': {'y': 2}}"),
            lit("{'a': 3}"),
        ];
        assert_eq!(merge_all(&layers), lit("{'a': 3, 'b': {'x': 1, 'y': 2}}"));
        assert_eq!(merge_all(&[]), Value::map());
    }
}
