// ─── Inheritance ───
// Merges a child manifest (`inheritsFrom`) onto its parent at the JSON level
// so unknown fields survive the merge.

use std::collections::HashSet;

use serde_json::{Map, Value};

fn name_without_version(lib: &Value) -> Option<&str> {
    let name = lib.get("name")?.as_str()?;
    Some(match name.rfind(':') {
        Some(idx) => &name[..idx],
        None => name,
    })
}

/// Merge `child` onto `parent`.
///
/// - `libraries`: child entries first, then parent entries whose coordinate
///   (minus version) the child does not already declare.
/// - other lists: child items prepended to the parent's.
/// - objects: list-valued sub-keys become parent + child; other sub-keys are
///   overridden by the child.
/// - anything else: the child wins.
///
/// The result carries no `inheritsFrom`.
pub fn merge_with_parent(child: &Value, parent: &Value) -> Value {
    let mut merged: Map<String, Value> = parent.as_object().cloned().unwrap_or_default();
    let Some(child_obj) = child.as_object() else {
        return Value::Object(merged);
    };

    let child_libs = child_obj
        .get("libraries")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let declared: HashSet<&str> = child_libs.iter().filter_map(name_without_version).collect();
    let mut libraries = child_libs.clone();
    if let Some(parent_libs) = parent.get("libraries").and_then(Value::as_array) {
        libraries.extend(
            parent_libs
                .iter()
                .filter(|lib| {
                    name_without_version(lib).map_or(true, |name| !declared.contains(name))
                })
                .cloned(),
        );
    }
    merged.insert("libraries".into(), Value::Array(libraries));

    for (key, value) in child_obj {
        if key == "libraries" {
            continue;
        }
        let merged_value = match (value, merged.get(key)) {
            (Value::Array(child_items), Some(Value::Array(parent_items))) => {
                let mut items = child_items.clone();
                items.extend(parent_items.iter().cloned());
                Value::Array(items)
            }
            (Value::Object(child_map), Some(Value::Object(parent_map))) => {
                let mut map = parent_map.clone();
                for (sub_key, sub_value) in child_map {
                    let combined = match (sub_value, map.get(sub_key)) {
                        (Value::Array(child_items), Some(Value::Array(parent_items))) => {
                            let mut items = parent_items.clone();
                            items.extend(child_items.iter().cloned());
                            Value::Array(items)
                        }
                        _ => sub_value.clone(),
                    };
                    map.insert(sub_key.clone(), combined);
                }
                Value::Object(map)
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), merged_value);
    }

    merged.remove("inheritsFrom");
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_library_wins_over_parent_version() {
        let parent = json!({
            "id": "1.20.1",
            "mainClass": "net.minecraft.client.main.Main",
            "libraries": [
                {"name": "org.ow2.asm:asm:9.3"},
                {"name": "com.mojang:brigadier:1.1.8"}
            ]
        });
        let child = json!({
            "id": "fabric-loader-0.15.0-1.20.1",
            "inheritsFrom": "1.20.1",
            "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
            "libraries": [{"name": "org.ow2.asm:asm:9.6"}]
        });

        let merged = merge_with_parent(&child, &parent);
        let names: Vec<&str> = merged["libraries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["name"].as_str().unwrap())
            .collect();

        assert_eq!(names, vec!["org.ow2.asm:asm:9.6", "com.mojang:brigadier:1.1.8"]);
        assert_eq!(merged["mainClass"], "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(merged["id"], "fabric-loader-0.15.0-1.20.1");
        assert!(merged.get("inheritsFrom").is_none());
    }

    #[test]
    fn argument_lists_are_concatenated_parent_first() {
        let parent = json!({"arguments": {"game": ["--username", "x"], "jvm": ["-Xss1M"]}});
        let child = json!({"arguments": {"game": ["--fml.forgeVersion", "47.2.0"]}});

        let merged = merge_with_parent(&child, &parent);
        assert_eq!(
            merged["arguments"]["game"],
            json!(["--username", "x", "--fml.forgeVersion", "47.2.0"])
        );
        assert_eq!(merged["arguments"]["jvm"], json!(["-Xss1M"]));
    }

    #[test]
    fn top_level_lists_put_child_first() {
        let parent = json!({"tweakers": ["b"]});
        let child = json!({"tweakers": ["a"]});
        assert_eq!(merge_with_parent(&child, &parent)["tweakers"], json!(["a", "b"]));
    }

    #[test]
    fn scalar_sub_keys_are_overridden_by_child() {
        let parent = json!({"javaVersion": {"component": "java-runtime-gamma", "majorVersion": 17}});
        let child = json!({"javaVersion": {"component": "java-runtime-delta", "majorVersion": 21}});
        let merged = merge_with_parent(&child, &parent);
        assert_eq!(merged["javaVersion"]["majorVersion"], 21);
    }
}
