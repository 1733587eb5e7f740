// SPDX-License-Identifier: MIT OR Apache-2.0
//! Compatibility post-passes applied to a freshly built document tree.

use serde_json::Value;

/// Recursively strip a `title` sibling of any `$ref` — most consumers
/// reject a schema object that mixes `$ref` with other keywords.
pub fn strip_redundant_titles(value: &mut Value) {
    walk_mut(value, &|obj| {
        if obj.contains_key("$ref") {
            obj.remove("title");
        }
    });
}

/// Recursively collapse a two-arm `anyOf` where one arm is `{"type": "null"}`
/// into `nullable: true` set on the surviving arm, merged into the parent.
pub fn collapse_nullable_any_of(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::Array(arms)) = obj.get("anyOf") {
                if arms.len() == 2 {
                    let null_arm = arms.iter().position(is_null_schema);
                    if let Some(null_idx) = null_arm {
                        let keep_idx = 1 - null_idx;
                        let mut survivor = arms[keep_idx].clone();
                        obj.remove("anyOf");
                        if let Value::Object(survivor_obj) = &mut survivor {
                            survivor_obj.insert("nullable".to_string(), Value::Bool(true));
                            for (k, v) in obj.iter() {
                                survivor_obj.entry(k.clone()).or_insert_with(|| v.clone());
                            }
                        }
                        *value = survivor;
                    }
                }
            }
        }
        _ => {}
    }
    // Recurse after the top-level rewrite so nested anyOfs collapse too.
    match value {
        Value::Object(obj) => {
            for v in obj.values_mut() {
                collapse_nullable_any_of(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                collapse_nullable_any_of(v);
            }
        }
        _ => {}
    }
}

fn is_null_schema(v: &Value) -> bool {
    v.get("type").and_then(Value::as_str) == Some("null")
}

fn walk_mut(value: &mut Value, f: &impl Fn(&mut serde_json::Map<String, Value>)) {
    match value {
        Value::Object(obj) => {
            f(obj);
            for v in obj.values_mut() {
                walk_mut(v, f);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                walk_mut(v, f);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_title_next_to_ref() {
        let mut v = serde_json::json!({"$ref": "#/x", "title": "X"});
        strip_redundant_titles(&mut v);
        assert!(v.get("title").is_none());
    }

    #[test]
    fn leaves_title_without_ref() {
        let mut v = serde_json::json!({"title": "X", "type": "string"});
        strip_redundant_titles(&mut v);
        assert_eq!(v["title"], serde_json::json!("X"));
    }

    #[test]
    fn collapses_null_any_of() {
        let mut v = serde_json::json!({
            "anyOf": [{"type": "string"}, {"type": "null"}]
        });
        collapse_nullable_any_of(&mut v);
        assert_eq!(v["type"], serde_json::json!("string"));
        assert_eq!(v["nullable"], serde_json::json!(true));
        assert!(v.get("anyOf").is_none());
    }

    #[test]
    fn leaves_multi_arm_any_of_alone() {
        let mut v = serde_json::json!({
            "anyOf": [{"type": "string"}, {"type": "integer"}, {"type": "null"}]
        });
        collapse_nullable_any_of(&mut v);
        assert!(v.get("anyOf").is_some());
    }

    #[test]
    fn recurses_into_nested_schemas() {
        let mut v = serde_json::json!({
            "properties": {
                "a": {"anyOf": [{"type": "string"}, {"type": "null"}]}
            }
        });
        collapse_nullable_any_of(&mut v);
        assert_eq!(v["properties"]["a"]["nullable"], serde_json::json!(true));
    }
}
