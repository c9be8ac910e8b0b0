//! Recursive partial matching of settings against constraint mappings.

use serde_json::Value;

use crate::stream_config::model::Settings;
use crate::stream_config::settings::loosely_equal;

/// Nesting depth explored before a constraint subtree is accepted unchecked.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// True when `actual` contains everything in `expected`.
///
/// Every expected key must exist in `actual`. Two lists match when each
/// expected element appears in the actual list; two mappings recurse; any
/// other pair compares loosely by string form. Once `max_depth` reaches zero
/// the remaining subtree is treated as a match.
pub fn is_partial_match(actual: &Settings, expected: &Settings, max_depth: usize) -> bool {
    if max_depth == 0 {
        return true;
    }

    expected.iter().all(|(key, expected_value)| {
        let Some(actual_value) = actual.get(key) else {
            return false;
        };
        match (actual_value, expected_value) {
            (Value::Array(actual_items), Value::Array(expected_items)) => {
                expected_items.iter().all(|expected_item| {
                    actual_items
                        .iter()
                        .any(|actual_item| loosely_equal(actual_item, expected_item))
                })
            }
            (Value::Object(actual_map), Value::Object(expected_map)) => {
                is_partial_match(actual_map, expected_map, max_depth - 1)
            }
            _ => loosely_equal(actual_value, expected_value),
        }
    })
}
