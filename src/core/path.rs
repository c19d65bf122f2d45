//! Purpose: Resolve dotted key paths against decoded JSON documents.
//! Exports: `Resolved`, `resolve`.
//! Role: Pure traversal core shared by the lookup adapter, the CLI, and tests.
//! Invariants: Object keys win over array-index interpretation for numeric-looking segments.
//! Invariants: Traversal never mutates the document and borrows on the hit path.

use serde_json::Value;

/// Outcome of a path walk. `Absent` stays distinguishable here; lookup
/// surfaces collapse it to JSON null.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolved<'a> {
    Value(&'a Value),
    Absent,
}

impl<'a> Resolved<'a> {
    pub fn is_absent(self) -> bool {
        matches!(self, Resolved::Absent)
    }

    pub fn value(self) -> Option<&'a Value> {
        match self {
            Resolved::Value(value) => Some(value),
            Resolved::Absent => None,
        }
    }

    /// Collapse to an owned value, with absent paths becoming `Value::Null`.
    /// Callers that need the distinction match on `Resolved` instead.
    pub fn into_owned(self) -> Value {
        match self {
            Resolved::Value(value) => value.clone(),
            Resolved::Absent => Value::Null,
        }
    }
}

/// Walk `path` (dot-delimited segments) downward from `root`. The empty
/// path addresses the root itself.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Resolved<'a> {
    if path.is_empty() {
        return Resolved::Value(root);
    }

    let mut current = root;
    for segment in path.split('.') {
        match step(current, segment) {
            Some(next) => current = next,
            None => return Resolved::Absent,
        }
    }
    Resolved::Value(current)
}

// One segment against one value. An object is authoritative for its keys:
// a missing key is absent even when the segment would parse as an index,
// so `{"100": ...}` stays reachable through segment `100`.
fn step<'a>(current: &'a Value, segment: &str) -> Option<&'a Value> {
    match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => None,
    }
}
