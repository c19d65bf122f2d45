//! Purpose: Provide the internal runtime JSON decode entrypoints.
//! Exports: `from_slice`, `from_str`, parse-failure categorization helpers.
//! Role: Parser boundary that centralizes simd-json usage details.
//! Invariants: Decoding uses simd-json for runtime paths.
//! Invariants: Input buffers are copied once to satisfy simd-json mutable-slice API.
//! Invariants: Hints carry only a category label and caller context, never payload bytes.

use serde::de::DeserializeOwned;

pub(crate) fn from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T, simd_json::Error> {
    let mut bytes = input.to_vec();
    simd_json::serde::from_slice(&mut bytes)
}

pub(crate) fn from_str<T: DeserializeOwned>(input: &str) -> Result<T, simd_json::Error> {
    from_slice(input.as_bytes())
}

/// Stable buckets for parse failures. Labels feed diagnostics and must not drift.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum ParseFailureCategory {
    Syntax,
    NumericRange,
    Utf8,
    DepthLimit,
    Unknown,
}

impl ParseFailureCategory {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ParseFailureCategory::Syntax => "syntax",
            ParseFailureCategory::NumericRange => "numeric-range",
            ParseFailureCategory::Utf8 => "utf8",
            ParseFailureCategory::DepthLimit => "depth-limit",
            ParseFailureCategory::Unknown => "unknown",
        }
    }
}

pub(crate) fn categorize_error(err: &simd_json::Error) -> ParseFailureCategory {
    categorize_message(&err.to_string())
}

// Categorization is message-based: simd-json does not expose a stable
// machine-readable error kind across versions. Order matters; utf8 and
// range markers can appear inside otherwise syntax-shaped messages.
pub(crate) fn categorize_message(message: &str) -> ParseFailureCategory {
    let message = message.to_ascii_lowercase();
    if message.contains("utf-8") || message.contains("utf8") {
        ParseFailureCategory::Utf8
    } else if message.contains("out of range")
        || message.contains("overflow")
        || message.contains("too large")
        || message.contains("exponent")
    {
        ParseFailureCategory::NumericRange
    } else if message.contains("recursion") || message.contains("depth") {
        ParseFailureCategory::DepthLimit
    } else if message.contains("syntax")
        || message.contains("expected")
        || message.contains("unexpected")
        || message.contains("eof")
        || message.contains("trailing")
        || message.contains("invalid")
    {
        ParseFailureCategory::Syntax
    } else {
        ParseFailureCategory::Unknown
    }
}

pub(crate) fn hint_for_error(err: &simd_json::Error, context: &str) -> String {
    format!(
        "parse category: {}; context: {}",
        categorize_error(err).label(),
        context
    )
}
