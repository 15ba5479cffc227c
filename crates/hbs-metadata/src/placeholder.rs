//! `{{ name }}` placeholder interpolation.
//!
//! A document may refer to the `items` of an entry defined earlier, either in
//! the same file or in a lower-precedence layer:
//!
//! ```yaml
//! food:
//!   items: {bread: 11111, rice: 11112}
//! staples:
//!   items: {{ food }}
//! bread_only:
//!   code: {{ food.bread }}
//! ```
//!
//! Placeholders are substituted textually before the document is parsed.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::{MetadataError, Result};
use crate::layers::{merge_top_level, parse_yaml};

const ITEMS_KEY: &str = "items";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)?)\s*\}\}")
        .unwrap_or_else(|e| panic!("placeholder pattern is invalid: {e}"))
});

/// Returns true if `text` contains at least one placeholder.
pub fn has_placeholders(text: &str) -> bool {
    PLACEHOLDER.is_match(text)
}

/// Substitutes placeholders in `text`.
///
/// `context` holds entries from lower-precedence layers; entries defined in
/// `text` itself take precedence over it.
/// `path` names the file in errors.
pub fn interpolate(text: &str, context: &Mapping, path: &Path) -> Result<String> {
    if !has_placeholders(text) {
        return Ok(text.to_string());
    }

    let stripped = PLACEHOLDER.replace_all(text, "null");
    let mut scope = context.clone();
    if let Value::Mapping(own) = parse_yaml(&stripped, path)? {
        merge_top_level(&mut scope, own);
    }

    let mut output = String::with_capacity(text.len());
    let mut last = 0;
    for captures in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = lookup(&scope, name.as_str())?;
        output.push_str(&text[last..whole.start()]);
        output.push_str(&to_flow(value));
        last = whole.end();
    }
    output.push_str(&text[last..]);
    Ok(output)
}

fn lookup<'a>(scope: &'a Mapping, placeholder: &str) -> Result<&'a Value> {
    let missing = || MetadataError::Placeholder {
        placeholder: placeholder.to_string(),
    };
    let (entry, item) = match placeholder.split_once('.') {
        Some((entry, item)) => (entry, Some(item)),
        None => (placeholder, None),
    };
    let items = scope
        .get(entry)
        .and_then(|value| value.get(ITEMS_KEY))
        .ok_or_else(missing)?;
    match item {
        None => Ok(items),
        Some(item) => items.get(item).ok_or_else(missing),
    }
}

/// Renders a value in YAML flow style, keeping integer keys as integers.
fn to_flow(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => serde_json::to_string(text).unwrap_or_else(|_| text.clone()),
        Value::Sequence(items) => {
            let parts: Vec<String> = items.iter().map(to_flow).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Mapping(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(key, value)| format!("{}: {}", to_flow(key), to_flow(value)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        Value::Tagged(tagged) => to_flow(&tagged.value),
    }
}
