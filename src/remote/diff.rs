//! Structural diff between two encoded states.
//!
//! States are encoded to `serde_json::Value` and compared recursively.
//! Objects are compared key by key and scalars by value. Arrays whose
//! elements all carry a unique `id` field are matched by that identity, so
//! removing one element reports just that removal; other arrays are compared
//! index by index. Each difference is reported at the deepest path where it
//! occurs.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use serde_json::Value;

/// The result of comparing two states.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub changes: Vec<StateChange>,
}

/// A single change, addressed by a dotted/indexed path such as
/// `counters[0].count`. The root itself is addressed by the empty path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateChange {
    Added { path: String, value: Value },
    Removed { path: String, value: Value },
    Modified { path: String, old: Value, new: Value },
}

impl StateDiff {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Human-readable report, one change per line.
    pub fn render(&self) -> String {
        if self.changes.is_empty() {
            return "  (no changes)\n".to_string();
        }
        let mut out = String::new();
        for change in &self.changes {
            let _ = match change {
                StateChange::Added { path, value } => {
                    writeln!(out, "  + {}: {}", display_path(path), value)
                }
                StateChange::Removed { path, value } => {
                    writeln!(out, "  - {}: {}", display_path(path), value)
                }
                StateChange::Modified { path, old, new } => {
                    writeln!(out, "  ~ {}: {} -> {}", display_path(path), old, new)
                }
            };
        }
        out
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// Compute the structural diff from `old` to `new`.
pub fn diff_values(old: &Value, new: &Value) -> StateDiff {
    let mut changes = Vec::new();
    diff_into(String::new(), old, new, &mut changes);
    StateDiff { changes }
}

fn diff_into(path: String, old: &Value, new: &Value, changes: &mut Vec<StateChange>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_val) in old_map {
                let child = field_path(&path, key);
                match new_map.get(key) {
                    Some(new_val) => diff_into(child, old_val, new_val, changes),
                    None => changes.push(StateChange::Removed {
                        path: child,
                        value: old_val.clone(),
                    }),
                }
            }
            for (key, new_val) in new_map {
                if !old_map.contains_key(key) {
                    changes.push(StateChange::Added {
                        path: field_path(&path, key),
                        value: new_val.clone(),
                    });
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            match (identities(old_items), identities(new_items)) {
                (Some(old_ids), Some(new_ids)) if retained_in_order(&old_ids, &new_ids) => {
                    diff_by_identity(&path, old_items, &old_ids, new_items, &new_ids, changes)
                }
                _ => diff_by_position(&path, old_items, new_items, changes),
            }
        }
        _ => {
            if old != new {
                changes.push(StateChange::Modified {
                    path,
                    old: old.clone(),
                    new: new.clone(),
                });
            }
        }
    }
}

fn diff_by_position(
    path: &str,
    old_items: &[Value],
    new_items: &[Value],
    changes: &mut Vec<StateChange>,
) {
    let shared = old_items.len().min(new_items.len());
    for i in 0..shared {
        diff_into(index_path(path, i), &old_items[i], &new_items[i], changes);
    }
    for (i, value) in old_items.iter().enumerate().skip(shared) {
        changes.push(StateChange::Removed {
            path: index_path(path, i),
            value: value.clone(),
        });
    }
    for (i, value) in new_items.iter().enumerate().skip(shared) {
        changes.push(StateChange::Added {
            path: index_path(path, i),
            value: value.clone(),
        });
    }
}

/// Match elements by their `id` field. Removed elements are addressed by
/// their old position, everything else by its new one.
fn diff_by_identity(
    path: &str,
    old_items: &[Value],
    old_ids: &[String],
    new_items: &[Value],
    new_ids: &[String],
    changes: &mut Vec<StateChange>,
) {
    let old_index: HashMap<&str, usize> = old_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    let new_index: HashSet<&str> = new_ids.iter().map(String::as_str).collect();

    for (i, id) in old_ids.iter().enumerate() {
        if !new_index.contains(id.as_str()) {
            changes.push(StateChange::Removed {
                path: index_path(path, i),
                value: old_items[i].clone(),
            });
        }
    }
    for (i, id) in new_ids.iter().enumerate() {
        match old_index.get(id.as_str()) {
            Some(&before) => {
                diff_into(index_path(path, i), &old_items[before], &new_items[i], changes)
            }
            None => changes.push(StateChange::Added {
                path: index_path(path, i),
                value: new_items[i].clone(),
            }),
        }
    }
}

/// The `id` of every element, if all elements are objects carrying a unique
/// one.
fn identities(items: &[Value]) -> Option<Vec<String>> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .map(|item| {
            let id = item.as_object()?.get("id")?.to_string();
            seen.insert(id.clone()).then_some(id)
        })
        .collect()
}

/// Whether the identities present in both lists keep their relative order.
/// A reordering is reported positionally so it never reads as "no changes".
fn retained_in_order(old_ids: &[String], new_ids: &[String]) -> bool {
    let in_new: HashSet<&str> = new_ids.iter().map(String::as_str).collect();
    let in_old: HashSet<&str> = old_ids.iter().map(String::as_str).collect();
    old_ids
        .iter()
        .filter(|id| in_new.contains(id.as_str()))
        .eq(new_ids.iter().filter(|id| in_old.contains(id.as_str())))
}

fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_values_have_no_diff() {
        let value = json!({"a": 1, "b": [1, 2]});
        assert!(diff_values(&value, &value).is_empty());
        assert_eq!(diff_values(&value, &value).render(), "  (no changes)\n");
    }

    #[test]
    fn nested_modification_is_addressed_by_path() {
        let old = json!({"counters": [{"count": 0}]});
        let new = json!({"counters": [{"count": 1}]});
        let diff = diff_values(&old, &new);
        assert_eq!(
            diff.changes,
            vec![StateChange::Modified {
                path: "counters[0].count".to_string(),
                old: json!(0),
                new: json!(1),
            }]
        );
        assert_eq!(diff.render(), "  ~ counters[0].count: 0 -> 1\n");
    }

    #[test]
    fn array_growth_and_shrink() {
        let diff = diff_values(&json!([1]), &json!([1, 2]));
        assert_eq!(
            diff.changes,
            vec![StateChange::Added {
                path: "[1]".to_string(),
                value: json!(2)
            }]
        );
        let diff = diff_values(&json!([1, 2]), &json!([]));
        assert_eq!(diff.len(), 2);
    }

    #[test]
    fn identified_elements_are_matched_by_id() {
        let old = json!({"counters": [
            {"id": "a", "count": 1},
            {"id": "b", "count": 2},
            {"id": "c", "count": 3},
        ]});
        let new = json!({"counters": [
            {"id": "b", "count": 2},
            {"id": "c", "count": 4},
            {"id": "d", "count": 0},
        ]});
        let diff = diff_values(&old, &new);
        assert_eq!(
            diff.changes,
            vec![
                StateChange::Removed {
                    path: "counters[0]".to_string(),
                    value: json!({"id": "a", "count": 1}),
                },
                StateChange::Modified {
                    path: "counters[1].count".to_string(),
                    old: json!(3),
                    new: json!(4),
                },
                StateChange::Added {
                    path: "counters[2]".to_string(),
                    value: json!({"id": "d", "count": 0}),
                },
            ]
        );
    }

    #[test]
    fn reordered_identities_fall_back_to_positions() {
        let old = json!([{"id": 1}, {"id": 2}]);
        let new = json!([{"id": 2}, {"id": 1}]);
        assert_eq!(diff_values(&old, &new).len(), 2);

        let repeated = json!([{"id": 1}, {"id": 1, "x": 0}]);
        let fixed = json!([{"id": 1}, {"id": 1, "x": 1}]);
        assert_eq!(diff_values(&repeated, &fixed).len(), 1);
    }

    #[test]
    fn keys_added_and_removed() {
        let diff = diff_values(&json!({"a": 1}), &json!({"b": 2}));
        assert_eq!(
            diff.changes,
            vec![
                StateChange::Removed {
                    path: "a".to_string(),
                    value: json!(1)
                },
                StateChange::Added {
                    path: "b".to_string(),
                    value: json!(2)
                },
            ]
        );
    }

    #[test]
    fn scalar_root_change_renders_root_label() {
        let diff = diff_values(&json!(1), &json!(2));
        assert_eq!(diff.render(), "  ~ <root>: 1 -> 2\n");
    }
}
