//! Purpose: Compose ordered variable sources and expand `{key}` placeholders.
//! Exports: `VarSource`, `Replacer`, `value_to_string`.
//! Role: Request-scoped registry; the first source that recognizes a key wins.
//! Invariants: `None` from a source means "not mine", never "error".
//! Invariants: Unresolvable placeholders pass through verbatim.

use std::sync::Arc;

use serde_json::Value;

/// A lookup capability scoped to one key namespace.
///
/// Returning `None` reports the key as outside this source's namespace so
/// a chained registry can consult the next source. A key the source owns
/// but cannot resolve yields `Some(Value::Null)`.
pub trait VarSource: Send + Sync {
    fn lookup(&self, key: &str) -> Option<Value>;
}

#[derive(Clone, Default)]
pub struct Replacer {
    sources: Vec<Arc<dyn VarSource>>,
}

impl Replacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source; earlier sources take precedence.
    pub fn push(&mut self, source: Arc<dyn VarSource>) {
        self.sources.push(source);
    }

    /// First applicable source wins; later sources are not consulted.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        self.sources.iter().find_map(|source| source.lookup(key))
    }

    /// Replace `{key}` placeholders in `template`. Keys no source claims
    /// and unterminated braces stay as written, so broken templates
    /// degrade visibly instead of silently.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };
            let key = &after[..close];
            let resolved = if key.is_empty() {
                None
            } else {
                self.lookup(key)
            };
            match resolved {
                Some(value) => out.push_str(&value_to_string(&value)),
                None => out.push_str(&rest[open..open + close + 2]),
            }
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        out
    }
}

/// Render a value for substitution into text: strings bare, null empty,
/// composites as compact JSON.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Replacer, VarSource, value_to_string};
    use serde_json::{Value, json};
    use std::sync::Arc;

    struct Fixed(&'static str, Value);

    impl VarSource for Fixed {
        fn lookup(&self, key: &str) -> Option<Value> {
            (key == self.0).then(|| self.1.clone())
        }
    }

    #[test]
    fn earlier_sources_shadow_later_ones() {
        let mut replacer = Replacer::new();
        replacer.push(Arc::new(Fixed("k", json!("first"))));
        replacer.push(Arc::new(Fixed("k", json!("second"))));
        replacer.push(Arc::new(Fixed("other", json!("fallback"))));

        assert_eq!(replacer.lookup("k"), Some(json!("first")));
        assert_eq!(replacer.lookup("other"), Some(json!("fallback")));
        assert_eq!(replacer.lookup("none"), None);
    }

    #[test]
    fn expand_leaves_unknown_and_unterminated_text_alone() {
        let mut replacer = Replacer::new();
        replacer.push(Arc::new(Fixed("k", json!("v"))));

        assert_eq!(replacer.expand("a {k} b"), "a v b");
        assert_eq!(replacer.expand("{missing} {}"), "{missing} {}");
        assert_eq!(replacer.expand("tail {unclosed"), "tail {unclosed");
    }

    #[test]
    fn scalars_render_bare() {
        assert_eq!(value_to_string(&json!(null)), "");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(7)), "7");
        assert_eq!(value_to_string(&json!("text")), "text");
        assert_eq!(value_to_string(&json!([1, 2])), "[1,2]");
    }
}
