//! Dotted field paths (`profile.tags`, `docArr.name`).

use serde_json::{Map, Value};

/// Creates a field path from prefix and field name.
pub fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

/// Resolves a dotted path through nested objects.
pub fn lookup<'a>(root: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Resolves a dotted path against any JSON value.
pub fn lookup_value<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    lookup(value.as_object()?, path)
}

/// Mutable variant of [`lookup`].
pub fn lookup_mut<'a>(root: &'a mut Map<String, Value>, path: &str) -> Option<&'a mut Value> {
    let mut segments = path.split('.');
    let mut current = root.get_mut(segments.next()?)?;
    for segment in segments {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

/// Writes `value` at a dotted path, creating intermediate objects.
///
/// Returns false if an intermediate segment holds a non-object.
pub fn assign(root: &mut Map<String, Value>, path: &str, value: Value) -> bool {
    let (parent, leaf) = match path.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    };

    let mut target = root;
    if let Some(parent) = parent {
        for segment in parent.split('.') {
            let current = target;
            let next = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            target = match next.as_object_mut() {
                Some(obj) => obj,
                None => return false,
            };
        }
    }
    target.insert(leaf.to_string(), value);
    true
}
