//! Dot-path addressing over JSON values.
//!
//! Paths like `"sections.3.content"` or `"title"` address one location in a
//! tree so isolated parts can be read or replaced without touching the
//! rest. The engine is uniform over any root value: the same operations
//! work whether the root is a whole document or a single detached section.
//!
//! All operations are pure. Writers return a new value and never mutate
//! their input; readers return `None` on a miss and never panic on missing
//! intermediates.

use serde_json::{Map, Value};

/// One path segment. A run of ASCII digits addresses an array index,
/// anything else an object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Split a dot-separated path into segments. The empty path addresses the
/// root itself.
pub fn parse_path(path: &str) -> Vec<Segment> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split('.')
        .map(|part| match part.parse::<usize>() {
            Ok(index) if part.bytes().all(|b| b.is_ascii_digit()) => Segment::Index(index),
            _ => Segment::Key(part.to_string()),
        })
        .collect()
}

/// Resolve a path to a reference, or `None` if any step is missing.
pub fn read<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in parse_path(path) {
        current = match (&segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(ix), Value::Array(arr)) => arr.get(*ix)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Return a new value with the leaf at `path` set to `value`.
///
/// Missing intermediate containers are created on demand: an array when the
/// next segment is numeric, an object otherwise. Writing past the end of an
/// array pads it with nulls. An empty path replaces the root.
pub fn write(root: &Value, path: &str, value: Value) -> Value {
    let segments = parse_path(path);
    let mut out = root.clone();
    write_into(&mut out, &segments, value);
    out
}

fn write_into(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    match segment {
        Segment::Key(key) => {
            if !matches!(target, Value::Object(_)) {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                write_into(slot, rest, value);
            }
        }
        Segment::Index(ix) => {
            if !matches!(target, Value::Array(_)) {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(arr) = target {
                while arr.len() <= *ix {
                    arr.push(Value::Null);
                }
                write_into(&mut arr[*ix], rest, value);
            }
        }
    }
}

/// Return a new value with `value` inserted into the array at
/// `collection_path`. A `position` outside `[0, len]` appends. A missing
/// collection is created on demand; an existing non-array at the path is
/// left untouched.
pub fn insert(root: &Value, collection_path: &str, value: Value, position: i64) -> Value {
    let segments = parse_path(collection_path);
    let mut out = root.clone();
    let slot = ensure_slot(&mut out, &segments);
    if matches!(slot, Value::Null) {
        *slot = Value::Array(Vec::new());
    }
    if let Value::Array(arr) = slot {
        let len = arr.len() as i64;
        let ix = if (0..=len).contains(&position) {
            position as usize
        } else {
            arr.len()
        };
        arr.insert(ix, value);
    }
    out
}

/// Return a new value with the element or key at `path` removed. A miss is
/// a structural no-op.
pub fn delete(root: &Value, path: &str) -> Value {
    let segments = parse_path(path);
    let mut out = root.clone();
    let Some((last, parents)) = segments.split_last() else {
        return out;
    };
    let Some(parent) = resolve_mut(&mut out, parents) else {
        return out;
    };
    match (last, parent) {
        (Segment::Key(key), Value::Object(map)) => {
            map.remove(key);
        }
        (Segment::Index(ix), Value::Array(arr)) => {
            if *ix < arr.len() {
                arr.remove(*ix);
            }
        }
        _ => {}
    }
    out
}

/// Walk to a slot, creating intermediate containers like [`write`] does.
fn ensure_slot<'a>(target: &'a mut Value, segments: &[Segment]) -> &'a mut Value {
    let Some((segment, rest)) = segments.split_first() else {
        return target;
    };
    match segment {
        Segment::Key(key) => {
            if !matches!(target, Value::Object(_)) {
                *target = Value::Object(Map::new());
            }
            let Value::Object(map) = target else {
                unreachable!("target was just made an object");
            };
            let slot = map.entry(key.clone()).or_insert(Value::Null);
            ensure_slot(slot, rest)
        }
        Segment::Index(ix) => {
            if !matches!(target, Value::Array(_)) {
                *target = Value::Array(Vec::new());
            }
            let Value::Array(arr) = target else {
                unreachable!("target was just made an array");
            };
            while arr.len() <= *ix {
                arr.push(Value::Null);
            }
            ensure_slot(&mut arr[*ix], rest)
        }
    }
}

/// Walk to an existing location without creating anything.
fn resolve_mut<'a>(target: &'a mut Value, segments: &[Segment]) -> Option<&'a mut Value> {
    let mut current = target;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (Segment::Index(ix), Value::Array(arr)) => arr.get_mut(*ix)?,
            _ => return None,
        };
    }
    Some(current)
}
