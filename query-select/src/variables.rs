//! Query variable assembly.

use serde_json::Value;

use crate::client::JsonObject;

/// Deep-merge `source` into `target`.
///
/// Objects present on both sides merge key by key; anything else in
/// `source` replaces what `target` had.
pub fn merge_into(target: &mut JsonObject, source: &JsonObject) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Wrap `input` as `{ "input": input }`.
pub fn input(input: JsonObject) -> JsonObject {
    let mut vars = JsonObject::new();
    vars.insert("input".to_string(), Value::Object(input));
    vars
}
