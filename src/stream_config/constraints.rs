//! Parsing of `key=value` constraint strings into a constraint mapping.

use serde_json::Value;
use stream_config_errors::{usage, ErrorCode, StreamConfigResult};

use crate::stream_config::model::Settings;

const PATH_SEPARATOR: char = '.';

/// Build constraints from `key=value` pairs.
///
/// Dotted or bracketed keys address nested settings (`sample.rate=0.5`,
/// `sample[rate]=0.5`). Values stay
/// strings, which the loose comparison of constraint matching accepts. Only
/// the first `=` separates key from value; later pairs overwrite earlier ones.
pub fn parse_constraint_pairs<S: AsRef<str>>(pairs: &[S]) -> StreamConfigResult<Settings> {
    let mut constraints = Settings::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            usage!(
                ErrorCode::MalformedConstraints,
                "constraint '{}' is not of the form key=value",
                pair
            )
        })?;
        let path = key_path(key).ok_or_else(|| {
            usage!(
                ErrorCode::MalformedConstraints,
                "constraint '{}' has an empty or malformed key",
                pair
            )
        })?;
        insert_path(&mut constraints, &path, Value::String(value.to_string()));
    }
    Ok(constraints)
}

/// Split `a.b[c][d]` into `[a, b, c, d]`; `None` on empty or unbalanced segments.
fn key_path(key: &str) -> Option<Vec<&str>> {
    let (head, mut brackets) = match key.find('[') {
        Some(idx) => (&key[..idx], &key[idx..]),
        None => (key, ""),
    };
    let mut path: Vec<&str> = head.split(PATH_SEPARATOR).collect();
    while !brackets.is_empty() {
        let rest = brackets.strip_prefix('[')?;
        let end = rest.find(']')?;
        path.push(&rest[..end]);
        brackets = &rest[end + 1..];
    }
    if path.iter().any(|segment| segment.is_empty()) {
        return None;
    }
    Some(path)
}

fn insert_path(target: &mut Settings, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            target.insert((*last).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = target
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Settings::new()));
            if !child.is_object() {
                *child = Value::Object(Settings::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}
